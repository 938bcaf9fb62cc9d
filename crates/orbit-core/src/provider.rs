use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::{PageContext, WebView};
use crate::errors::{BackendError, ExtractionError};
use crate::messages::ChatTurn;

/// A validated backend model identifier such as `llama3.2` or `codellama:7b`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId(String);

impl ModelId {
    pub fn parse(raw: &str) -> Result<Self, BackendError> {
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '/'))
            && raw.starts_with(|c: char| c.is_ascii_alphanumeric());
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(BackendError::InvalidModelId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModelId {
    type Error = BackendError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModelId> for String {
    fn from(id: ModelId) -> Self {
        id.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads page state out of a live view.
#[async_trait]
pub trait PageContextProvider: Send + Sync {
    /// Full snapshot including page text. Fails when the page cannot be scripted.
    async fn extract_context(&self, view: &dyn WebView) -> Result<PageContext, ExtractionError>;

    /// Best-effort snapshot from the view's cheap properties. Never fails.
    fn basic_context(&self, view: &dyn WebView) -> PageContext {
        PageContext {
            url: view.url(),
            title: view.title(),
            ..PageContext::default()
        }
    }

    /// Current selection, `None` when nothing is selected.
    async fn extract_selected_text(
        &self,
        view: &dyn WebView,
    ) -> Result<Option<String>, ExtractionError>;

    /// Arrange for future selection-changed events from this view. Idempotent.
    async fn install_selection_monitoring(&self, view: &dyn WebView);
}

/// Remote inference service used for chat completions.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Liveness probe. Never errors: an unreachable backend is simply `false`.
    async fn check_connection(&self) -> bool;

    /// Installed models in the backend's own order.
    async fn list_models(&self) -> Result<Vec<String>, BackendError>;

    async fn chat(
        &self,
        history: &[ChatTurn],
        model: &ModelId,
        context: Option<&PageContext>,
    ) -> Result<String, BackendError>;
}
