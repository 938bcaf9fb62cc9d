use orbit_core::errors::{BackendError, ExtractionError};

/// Conditions the session controller surfaces through `last_error`.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SidecarError {
    #[error("No page attached")]
    NoPage,
    #[error("No text selected")]
    NoSelection,
    #[error("No page content available to summarize")]
    NoPageContent,
    #[error("Failed to get selected text: {0}")]
    SelectionUnavailable(ExtractionError),
    #[error("Failed to load models: {0}")]
    ModelListing(BackendError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("The page changed before the reply arrived. Please ask again.")]
    PageChanged,
}

impl SidecarError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NoPage => "no_page",
            Self::NoSelection => "no_selection",
            Self::NoPageContent => "no_page_content",
            Self::SelectionUnavailable(_) => "selection_unavailable",
            Self::ModelListing(_) => "model_listing",
            Self::Backend(e) => e.error_kind(),
            Self::PageChanged => "page_changed",
        }
    }
}

/// Why a menu action published nothing.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no text selected")]
    NoSelection,
    #[error("failed to capture selection: {0}")]
    Capture(#[from] ExtractionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_errors_pass_through_verbatim() {
        let err = SidecarError::from(BackendError::NotRunning);
        assert_eq!(
            err.to_string(),
            "Ollama is not running. Please start Ollama and try again."
        );
        assert_eq!(err.error_kind(), "not_running");
    }

    #[test]
    fn user_facing_messages() {
        assert_eq!(SidecarError::NoSelection.to_string(), "No text selected");
        assert_eq!(
            SidecarError::NoPageContent.to_string(),
            "No page content available to summarize"
        );
        assert_eq!(
            SidecarError::ModelListing(BackendError::InvalidResponse).to_string(),
            "Failed to load models: Received invalid response from Ollama"
        );
        assert!(SidecarError::SelectionUnavailable(ExtractionError::Timeout)
            .to_string()
            .starts_with("Failed to get selected text"));
    }
}
