//! Server-sent events for streamed chat completions
//!
//! Byte chunks from the wire are split into `data:` payloads; payloads are
//! folded into one text by [`StreamAccumulator`].

use crate::LlmError;
use serde::Deserialize;
use tracing::{debug, info};

pub const DONE_MARKER: &str = "[DONE]";

/// Line splitter that tolerates events cut across network chunks
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes, returning the `data:` payloads of every completed line
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Trailing line left without a newline when the stream closed
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_payload(&line)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    line.strip_prefix("data:").map(|rest| rest.trim_start().to_string())
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Concatenates `choices[0].delta.content` across chunks
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    chunks: usize,
    done: bool,
    in_thinking: bool,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once the terminator has been seen
    pub fn feed(&mut self, payload: &str) -> Result<bool, LlmError> {
        if self.done {
            return Ok(true);
        }
        if payload.trim() == DONE_MARKER {
            self.done = true;
            return Ok(true);
        }
        if payload.trim().is_empty() {
            return Ok(false);
        }

        let chunk: ChatCompletionChunk = serde_json::from_str(payload)
            .map_err(|e| LlmError::Decode(format!("stream chunk: {}", e)))?;

        if let Some(content) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
        {
            if content.is_empty() {
                return Ok(false);
            }
            if !self.in_thinking && content.contains("<think>") {
                self.in_thinking = true;
                info!(chunk = self.chunks, "model started thinking");
            }
            if self.in_thinking && content.contains("</think>") {
                self.in_thinking = false;
                info!(chunk = self.chunks, "model finished thinking");
            }
            self.chunks += 1;
            self.text.push_str(&content);
        }
        Ok(false)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn into_text(self) -> (String, usize) {
        debug!(chunks = self.chunks, length = self.text.len(), "stream accumulated");
        (self.text, self.chunks)
    }
}
