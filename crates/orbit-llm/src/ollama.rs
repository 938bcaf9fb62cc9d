use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use orbit_core::context::PageContext;
use orbit_core::errors::BackendError;
use orbit_core::messages::ChatTurn;
use orbit_core::provider::{ChatBackend, ModelId};

use crate::converter::{self, DEFAULT_MAX_PAGE_CHARS};
use crate::ndjson::NdjsonParser;

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct OllamaConfig {
    pub base_url: Url,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    /// Page text beyond this many characters is cut before it reaches the model.
    pub max_page_chars: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url is valid"),
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
        }
    }
}

/// Chat backend speaking the Ollama HTTP API.
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{base}/{path}")
        }
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_connect() {
        BackendError::NotRunning
    } else if err.is_timeout() {
        BackendError::Network("request timed out".into())
    } else {
        BackendError::Network(err.to_string())
    }
}

fn status_error(status: StatusCode, body: String, model: &ModelId) -> BackendError {
    match status {
        StatusCode::NOT_FOUND => BackendError::ModelNotFound(model.to_string()),
        StatusCode::BAD_REQUEST if body.to_lowercase().contains("invalid model name") => {
            BackendError::InvalidModelId(model.to_string())
        }
        _ => BackendError::Server {
            status: status.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self), fields(base_url = %self.config.base_url))]
    async fn check_connection(&self) -> bool {
        match self.client.get(self.endpoint("")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                debug!(error = %e, "backend unreachable");
                false
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_models(&self) -> Result<Vec<String>, BackendError> {
        let resp = self
            .client
            .get(self.endpoint("api/tags"))
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Server { status, body });
        }

        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|_| BackendError::InvalidResponse)?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    #[instrument(skip(self, history, context), fields(model = %model, turns = history.len()))]
    async fn chat(
        &self,
        history: &[ChatTurn],
        model: &ModelId,
        context: Option<&PageContext>,
    ) -> Result<String, BackendError> {
        let body =
            converter::build_request_body(history, model, context, self.config.max_page_chars);

        let resp = self
            .client
            .post(self.endpoint("api/chat"))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let err = status_error(status, body, model);
            warn!(error_kind = err.error_kind(), "chat request rejected");
            return Err(err);
        }

        let mut parser = NdjsonParser::new();
        let mut bytes = resp.bytes_stream();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| BackendError::StreamError(e.to_string()))?;
            parser.push(&chunk)?;
            if parser.is_done() {
                break;
            }
        }
        let reply = parser.finish()?;
        debug!(chars = reply.chars().count(), "chat reply complete");
        Ok(reply)
    }
}
