//! Data model, error taxonomy and collaborator interfaces for the Orbit AI sidecar.

pub mod actions;
pub mod context;
pub mod errors;
pub mod events;
pub mod ids;
pub mod messages;
pub mod provider;
pub mod state;

pub use actions::{ActionCommand, ActionKind, SUMMARIZE_PAGE_PROMPT};
pub use context::{PageContext, ViewHandle, WebView};
pub use errors::{BackendError, ExtractionError};
pub use events::{BridgeEvent, EventKind, EventPayload};
pub use ids::{MessageId, ViewId};
pub use messages::{ChatMessage, ChatTurn, Role};
pub use provider::{ChatBackend, ModelId, PageContextProvider};
pub use state::{SessionState, DEFAULT_MODEL};
