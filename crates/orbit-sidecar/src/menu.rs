use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use orbit_core::actions::{ActionCommand, ActionKind};
use orbit_core::context::ViewHandle;
use orbit_core::errors::ExtractionError;
use orbit_core::events::BridgeEvent;
use orbit_core::provider::PageContextProvider;

use crate::bus::EventBus;
use crate::error::DispatchError;

pub const SUBMENU_TITLE: &str = "Orbit AI";
pub const ASK_ITEM_TITLE: &str = "Ask Orbit AI";
pub const BRAND_SYMBOL: &str = "brain.head.profile";

/// Host menu items the AI submenu is placed after.
const ANCHOR_TITLES: [&str; 2] = ["Look Up", "Search with"];

/// Submenu layout: these actions, a separator, then Ask.
const SUBMENU_ACTIONS: [ActionKind; 3] =
    [ActionKind::Explain, ActionKind::Define, ActionKind::Translate];

pub type MenuCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct MenuItem {
    pub title: String,
    pub symbol: Option<&'static str>,
    pub action: Option<ActionKind>,
    callback: Option<MenuCallback>,
}

impl MenuItem {
    /// An item owned by the host menu, with no Orbit action attached.
    pub fn plain(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            symbol: None,
            action: None,
            callback: None,
        }
    }

    /// Run the item's callback. Returns false for items without one.
    pub fn activate(&self) -> bool {
        match &self.callback {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }
}

impl std::fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuItem")
            .field("title", &self.title)
            .field("symbol", &self.symbol)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub enum MenuEntry {
    Item(MenuItem),
    Separator,
    Submenu {
        title: String,
        symbol: &'static str,
        entries: Vec<MenuEntry>,
    },
}

impl MenuEntry {
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Item(item) => Some(&item.title),
            Self::Submenu { title, .. } => Some(title),
            Self::Separator => None,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, Self::Separator)
    }
}

/// Builds AI menu entries for a view and turns their activation into `userInvokedAIAction` events.
#[derive(Clone)]
pub struct MenuActionDispatcher {
    bus: Arc<EventBus>,
    provider: Arc<dyn PageContextProvider>,
    runtime: Handle,
}

impl MenuActionDispatcher {
    /// Must be called from within a Tokio runtime; menu callbacks spawn onto it.
    pub fn new(bus: Arc<EventBus>, provider: Arc<dyn PageContextProvider>) -> Self {
        Self::with_runtime(bus, provider, Handle::current())
    }

    pub fn with_runtime(
        bus: Arc<EventBus>,
        provider: Arc<dyn PageContextProvider>,
        runtime: Handle,
    ) -> Self {
        Self {
            bus,
            provider,
            runtime,
        }
    }

    /// Capture the selection now and publish one action event for it.
    pub async fn invoke(
        &self,
        view: &ViewHandle,
        kind: ActionKind,
    ) -> Result<ActionCommand, DispatchError> {
        let result = self.capture(view).await;
        let selected_text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!(view_id = %view.id(), action = %kind, error = %e, "menu action dropped");
                return Err(e);
            }
        };

        let command = ActionCommand {
            target_view_id: view.id().clone(),
            selected_text,
            action_kind: kind,
        };
        let delivered = self.bus.publish(&BridgeEvent::ai_action(command.clone()));
        debug!(view_id = %view.id(), action = %kind, delivered, "menu action published");
        Ok(command)
    }

    async fn capture(&self, view: &ViewHandle) -> Result<String, DispatchError> {
        let live = view.upgrade().ok_or(ExtractionError::ViewGone)?;
        let text = self.provider.extract_selected_text(&*live).await?;
        match text {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(DispatchError::NoSelection),
        }
    }

    /// A callback that spawns [`Self::invoke`] for `view` and `kind`.
    pub fn callback(&self, view: &ViewHandle, kind: ActionKind) -> MenuCallback {
        let dispatcher = self.clone();
        let view = view.clone();
        Arc::new(move || {
            let dispatcher = dispatcher.clone();
            let view = view.clone();
            let runtime = dispatcher.runtime.clone();
            runtime.spawn(async move {
                // Failures are logged inside invoke.
                let _ = dispatcher.invoke(&view, kind).await;
            });
        })
    }

    fn action_item(&self, view: &ViewHandle, kind: ActionKind) -> MenuItem {
        MenuItem {
            title: kind.menu_title().to_string(),
            symbol: Some(kind.symbol()),
            action: Some(kind),
            callback: Some(self.callback(view, kind)),
        }
    }

    /// Standalone "Ask Orbit AI" item.
    pub fn ask_item(&self, view: &ViewHandle) -> MenuEntry {
        MenuEntry::Item(MenuItem {
            title: ASK_ITEM_TITLE.to_string(),
            symbol: Some(BRAND_SYMBOL),
            action: Some(ActionKind::Ask),
            callback: Some(self.callback(view, ActionKind::Ask)),
        })
    }

    /// The "Orbit AI" submenu.
    pub fn submenu(&self, view: &ViewHandle) -> MenuEntry {
        let mut entries: Vec<MenuEntry> = SUBMENU_ACTIONS
            .iter()
            .map(|kind| MenuEntry::Item(self.action_item(view, *kind)))
            .collect();
        entries.push(MenuEntry::Separator);
        entries.push(MenuEntry::Item(self.action_item(view, ActionKind::Ask)));

        MenuEntry::Submenu {
            title: SUBMENU_TITLE.to_string(),
            symbol: BRAND_SYMBOL,
            entries,
        }
    }

    /// Splice the submenu into a host context menu. Returns the submenu's index.
    ///
    /// Placement is right after the first "Look Up"/"Search with" item, else at the top.
    /// Separators go before it when it lands mid-menu and after it when items follow.
    pub fn install_into(&self, menu: &mut Vec<MenuEntry>, view: &ViewHandle) -> usize {
        let mut index = menu
            .iter()
            .position(|entry| {
                entry
                    .title()
                    .is_some_and(|t| ANCHOR_TITLES.iter().any(|a| t.contains(a)))
            })
            .map_or(0, |i| i + 1);

        if index > 0 && index < menu.len() {
            menu.insert(index, MenuEntry::Separator);
            index += 1;
        }
        menu.insert(index, self.submenu(view));
        if index + 1 < menu.len() {
            menu.insert(index + 1, MenuEntry::Separator);
        }
        index
    }
}
