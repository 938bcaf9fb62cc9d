use bytes::BytesMut;
use serde::Deserialize;

use orbit_core::errors::BackendError;

/// One line of an Ollama `/api/chat` streaming response.
#[derive(Debug, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub content: String,
}

/// Accumulates newline-delimited JSON chunks into the full assistant reply.
///
/// Bytes are buffered until a `\n` arrives, so a chunk boundary can fall
/// anywhere, including inside a multi-byte character.
#[derive(Debug, Default)]
pub struct NdjsonParser {
    buffer: BytesMut,
    content: String,
    done: bool,
}

impl NdjsonParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the terminal `done: true` chunk has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed raw bytes from the response body.
    pub fn push(&mut self, bytes: &[u8]) -> Result<(), BackendError> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            self.parse_line(&line)?;
        }
        Ok(())
    }

    /// Flush any unterminated trailing line and return the accumulated text.
    pub fn finish(mut self) -> Result<String, BackendError> {
        if !self.buffer.is_empty() {
            let rest = self.buffer.split();
            self.parse_line(&rest)?;
        }
        if !self.done {
            return Err(BackendError::StreamError(
                "stream ended before completion".into(),
            ));
        }
        if self.content.is_empty() {
            return Err(BackendError::InvalidResponse);
        }
        Ok(self.content)
    }

    fn parse_line(&mut self, line: &[u8]) -> Result<(), BackendError> {
        let line = line.trim_ascii();
        if line.is_empty() || self.done {
            return Ok(());
        }
        let chunk: ChatChunk =
            serde_json::from_slice(line).map_err(|_| BackendError::InvalidResponse)?;
        if let Some(error) = chunk.error {
            return Err(BackendError::StreamError(error));
        }
        if let Some(message) = chunk.message {
            self.content.push_str(&message.content);
        }
        if chunk.done {
            self.done = true;
        }
        Ok(())
    }
}
