//! Chat backends for the Orbit AI sidecar.

pub mod converter;
pub mod mock;
pub mod ndjson;
pub mod ollama;

pub use mock::{MockBackend, MockResponse};
pub use ollama::{OllamaClient, OllamaConfig, DEFAULT_BASE_URL};
