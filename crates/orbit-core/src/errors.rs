/// Failures reported by a chat backend.
///
/// Display strings are user-facing: the controller stores them verbatim as `last_error`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    // Connectivity
    #[error("Ollama is not running. Please start Ollama and try again.")]
    NotRunning,
    #[error("Network error: {0}")]
    Network(String),

    // Resource
    #[error("Model '{0}' not found. Please pull the model first: ollama pull {0}")]
    ModelNotFound(String),

    // Protocol
    #[error("Stream error: {0}")]
    StreamError(String),
    #[error("Received invalid response from Ollama")]
    InvalidResponse,
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    // Validation
    #[error("Invalid model ID: '{0}'")]
    InvalidModelId(String),
}

impl BackendError {
    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotRunning => "not_running",
            Self::Network(_) => "network",
            Self::ModelNotFound(_) => "model_not_found",
            Self::StreamError(_) => "stream_error",
            Self::InvalidResponse => "invalid_response",
            Self::Server { .. } => "server_error",
            Self::InvalidModelId(_) => "invalid_model_id",
        }
    }
}

/// Failures reading content out of a page.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("the page is no longer available")]
    ViewGone,
    #[error("page script failed: {0}")]
    Script(String),
    #[error("page did not respond in time")]
    Timeout,
}
