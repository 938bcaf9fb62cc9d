use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ids::ViewId;

/// Point-in-time snapshot of a page. Replaced wholesale on refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_content: Option<String>,
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_selected_text(mut self, text: impl Into<String>) -> Self {
        self.selected_text = Some(text.into());
        self
    }

    pub fn with_page_content(mut self, content: impl Into<String>) -> Self {
        self.page_content = Some(content.into());
        self
    }

    /// URL and title alone are not usable content.
    pub fn has_content(&self) -> bool {
        non_empty(&self.selected_text) || non_empty(&self.page_content)
    }

    /// Short label for a context indicator: title, else URL host, else the full URL.
    pub fn display_label(&self) -> Option<String> {
        if let Some(title) = self.title.as_deref().filter(|t| !t.is_empty()) {
            return Some(title.to_string());
        }
        self.url
            .as_ref()
            .map(|url| url.host_str().map_or_else(|| url.to_string(), str::to_string))
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

/// The externally-owned page-rendering surface.
///
/// Only identity and the cheap synchronous properties live here; anything that needs
/// script evaluation goes through [`crate::provider::PageContextProvider`].
pub trait WebView: Send + Sync {
    fn id(&self) -> &ViewId;
    fn url(&self) -> Option<Url>;
    fn title(&self) -> Option<String>;
}

/// Non-owning reference to a [`WebView`]. Never extends the view's lifetime.
#[derive(Clone)]
pub struct ViewHandle {
    id: ViewId,
    view: Weak<dyn WebView>,
}

impl ViewHandle {
    pub fn new<V: WebView + 'static>(view: &Arc<V>) -> Self {
        let weak = Arc::downgrade(view);
        let weak: Weak<dyn WebView> = weak;
        Self {
            id: view.id().clone(),
            view: weak,
        }
    }

    pub fn id(&self) -> &ViewId {
        &self.id
    }

    /// `None` once the host has destroyed the view.
    pub fn upgrade(&self) -> Option<Arc<dyn WebView>> {
        self.view.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.view.strong_count() > 0
    }
}

impl std::fmt::Debug for ViewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}
