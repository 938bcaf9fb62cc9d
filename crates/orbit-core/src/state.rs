use serde::{Deserialize, Serialize};

use crate::context::PageContext;
use crate::messages::ChatMessage;

/// Model selected before the backend has reported what it has installed.
pub const DEFAULT_MODEL: &str = "llama3.2";

const SELECTION_PREVIEW_CHARS: usize = 50;

/// Everything the sidecar knows about one conversation and the page it is attached to.
///
/// Observers only ever see clones of this value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub is_loading: bool,
    pub is_refreshing_context: bool,
    pub is_connected: bool,
    pub available_models: Vec<String>,
    pub selected_model: String,
    pub last_error: Option<String>,
    pub current_context: Option<PageContext>,
    /// Set when `current_context` came from the basic fallback rather than a full extraction.
    pub context_is_fallback: bool,
    pub last_known_selected_text: Option<String>,
}

impl SessionState {
    pub fn new(selected_model: impl Into<String>) -> Self {
        Self {
            messages: Vec::new(),
            input: String::new(),
            is_loading: false,
            is_refreshing_context: false,
            is_connected: false,
            available_models: Vec::new(),
            selected_model: selected_model.into(),
            last_error: None,
            current_context: None,
            context_is_fallback: false,
            last_known_selected_text: None,
        }
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Selection shortened for display, e.g. `Selected: "..."` indicators.
    pub fn selection_preview(&self) -> Option<String> {
        let text = self.last_known_selected_text.as_deref()?;
        if text.is_empty() {
            return None;
        }
        if text.chars().count() > SELECTION_PREVIEW_CHARS {
            let head: String = text.chars().take(SELECTION_PREVIEW_CHARS).collect();
            Some(format!("{head}..."))
        } else {
            Some(text.to_string())
        }
    }

    /// Whether a send would do anything right now.
    pub fn can_send(&self) -> bool {
        !self.is_loading && !self.input.trim().is_empty()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}
