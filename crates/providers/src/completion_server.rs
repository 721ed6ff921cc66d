//! llama.cpp-compatible completion server engine.
//!
//! Posts the encoded prompt to `{base_url}/completion` with streaming
//! enabled and forwards each SSE `data:` payload's `content` as raw bytes
//! until the server reports `stop: true`.

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use toolweave_core::error::InferenceError;
use toolweave_core::inference::{ChannelTokenStream, InferenceEngine, TokenStream};
use tracing::{debug, trace, warn};

/// Streams completions from a llama.cpp-style `/completion` endpoint.
pub struct CompletionServerEngine {
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    stop: Vec<String>,
    client: reqwest::Client,
}

impl CompletionServerEngine {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            stop: Vec::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Upper bound on generated tokens per turn (`n_predict`).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Extra stop strings forwarded to the server.
    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "prompt": prompt,
            "stream": true,
            "n_predict": self.max_tokens,
            "temperature": self.temperature,
        });
        if !self.stop.is_empty() {
            body["stop"] = serde_json::json!(self.stop);
        }
        body
    }
}

#[async_trait]
impl InferenceEngine for CompletionServerEngine {
    fn name(&self) -> &str {
        "completion-server"
    }

    async fn compute(&self, prompt: &[u8]) -> Result<Box<dyn TokenStream>, InferenceError> {
        let url = format!("{}/completion", self.base_url);
        let body = self.request_body(&String::from_utf8_lossy(prompt));

        debug!(url = %url, prompt_bytes = prompt.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Completion server error");
            return Err(InferenceError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let (tx, rx) = mpsc::channel(64);

        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(InferenceError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };
                buffer.extend_from_slice(&bytes);

                // Split on raw bytes: a UTF-8 sequence may straddle chunks.
                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);
                    match forward_line(&tx, &line).await {
                        LineOutcome::Continue => {}
                        LineOutcome::Done => return,
                    }
                }
            }

            if !buffer.is_empty() {
                let line = String::from_utf8_lossy(&buffer).into_owned();
                forward_line(&tx, &line).await;
            }
        });

        Ok(Box::new(ChannelTokenStream::new(rx)))
    }
}

enum LineOutcome {
    Continue,
    Done,
}

async fn forward_line(
    tx: &mpsc::Sender<Result<Vec<u8>, InferenceError>>,
    line: &str,
) -> LineOutcome {
    match parse_sse_line(line) {
        SseLine::Chunk(chunk) => {
            if !chunk.content.is_empty() && tx.send(Ok(chunk.content.into_bytes())).await.is_err() {
                // receiver dropped
                return LineOutcome::Done;
            }
            if chunk.stop {
                LineOutcome::Done
            } else {
                LineOutcome::Continue
            }
        }
        SseLine::Ignored => LineOutcome::Continue,
    }
}

/// A single SSE `data: {...}` payload from the completion endpoint.
#[derive(Debug, Default, Deserialize, PartialEq)]
struct CompletionChunk {
    #[serde(default)]
    content: String,
    #[serde(default)]
    stop: bool,
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Chunk(CompletionChunk),
    Ignored,
}

fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.is_empty() || line.starts_with(':') {
        return SseLine::Ignored;
    }

    let Some(data) = line.strip_prefix("data:") else {
        trace!(line, "Ignoring non-data SSE line");
        return SseLine::Ignored;
    };
    let data = data.trim();
    if data == "[DONE]" {
        return SseLine::Chunk(CompletionChunk {
            content: String::new(),
            stop: true,
        });
    }

    match serde_json::from_str::<CompletionChunk>(data) {
        Ok(chunk) => SseLine::Chunk(chunk),
        Err(e) => {
            trace!(error = %e, data, "Ignoring unparseable SSE payload");
            SseLine::Ignored
        }
    }
}
