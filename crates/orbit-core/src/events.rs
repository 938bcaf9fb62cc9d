use serde::{Deserialize, Serialize};
use url::Url;

use crate::actions::ActionCommand;
use crate::ids::ViewId;

/// Named event kinds carried by the in-process event bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ViewDidStartNavigation,
    ViewDidFinishNavigation,
    ViewSelectionChanged,
    UserInvokedAiAction,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        Self::ViewDidStartNavigation,
        Self::ViewDidFinishNavigation,
        Self::ViewSelectionChanged,
        Self::UserInvokedAiAction,
    ];

    /// Notification name used by the host shell for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ViewDidStartNavigation => "com.orbit.webViewDidStartNavigation",
            Self::ViewDidFinishNavigation => "com.orbit.webViewDidFinishNavigation",
            Self::ViewSelectionChanged => "com.orbit.webViewSelectionDidChange",
            Self::UserInvokedAiAction => "com.orbit.askOrbitAI",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind-specific event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    StartNavigation {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<Url>,
    },
    FinishNavigation {
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<Url>,
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    SelectionChanged {
        selected_text: String,
    },
    AiAction(ActionCommand),
}

/// An event as delivered to subscribers, scoped by the view that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEvent {
    pub view_id: ViewId,
    pub payload: EventPayload,
}

impl BridgeEvent {
    pub fn new(view_id: ViewId, payload: EventPayload) -> Self {
        Self { view_id, payload }
    }

    pub fn kind(&self) -> EventKind {
        match self.payload {
            EventPayload::StartNavigation { .. } => EventKind::ViewDidStartNavigation,
            EventPayload::FinishNavigation { .. } => EventKind::ViewDidFinishNavigation,
            EventPayload::SelectionChanged { .. } => EventKind::ViewSelectionChanged,
            EventPayload::AiAction(_) => EventKind::UserInvokedAiAction,
        }
    }

    pub fn started_navigation(view_id: ViewId, url: Option<Url>) -> Self {
        Self::new(view_id, EventPayload::StartNavigation { url })
    }

    pub fn finished_navigation(view_id: ViewId, url: Option<Url>, title: Option<String>) -> Self {
        Self::new(view_id, EventPayload::FinishNavigation { url, title })
    }

    pub fn selection_changed(view_id: ViewId, selected_text: impl Into<String>) -> Self {
        Self::new(
            view_id,
            EventPayload::SelectionChanged {
                selected_text: selected_text.into(),
            },
        )
    }

    /// The action's target view is the originating view.
    pub fn ai_action(command: ActionCommand) -> Self {
        Self::new(command.target_view_id.clone(), EventPayload::AiAction(command))
    }
}
