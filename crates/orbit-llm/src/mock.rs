use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use orbit_core::context::PageContext;
use orbit_core::errors::BackendError;
use orbit_core::messages::ChatTurn;
use orbit_core::provider::{ChatBackend, ModelId};

/// Pre-programmed chat replies for deterministic testing without a running backend.
#[derive(Clone, Debug)]
pub enum MockResponse {
    Text(String),
    Error(BackendError),
    /// Wait a duration, then resolve the inner response.
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// A chat call as the backend saw it.
#[derive(Clone, Debug)]
pub struct RecordedChat {
    pub history: Vec<ChatTurn>,
    pub model: String,
    pub context: Option<PageContext>,
}

/// Mock backend that answers chat calls from a queue of scripted responses.
pub struct MockBackend {
    responses: Mutex<VecDeque<MockResponse>>,
    connected: AtomicBool,
    models: Mutex<Result<Vec<String>, BackendError>>,
    call_count: AtomicUsize,
    recorded: Mutex<Vec<RecordedChat>>,
}

impl MockBackend {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            connected: AtomicBool::new(true),
            models: Mutex::new(Ok(Vec::new())),
            call_count: AtomicUsize::new(0),
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn with_models(self, models: &[&str]) -> Self {
        *self.models.lock() = Ok(models.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_model_error(self, error: BackendError) -> Self {
        *self.models.lock() = Err(error);
        self
    }

    pub fn disconnected(self) -> Self {
        self.set_connected(false);
        self
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedChat> {
        self.recorded.lock().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_connection(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        self.models.lock().clone()
    }

    async fn chat(
        &self,
        history: &[ChatTurn],
        model: &ModelId,
        context: Option<&PageContext>,
    ) -> Result<String, BackendError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.recorded.lock().push(RecordedChat {
            history: history.to_vec(),
            model: model.to_string(),
            context: context.cloned(),
        });

        let next = self.responses.lock().pop_front();
        let Some(response) = next else {
            return Err(BackendError::StreamError(
                "MockBackend: no response configured".into(),
            ));
        };
        resolve_response(response).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: MockResponse) -> Result<String, BackendError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Text(text) => return Ok(text),
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
        }
    }
}
