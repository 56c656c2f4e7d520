//! Ollama generation client
//!
//! Implements [`GenerationBackend`] against the Ollama HTTP API:
//! - `ensure_model` probes `/api/tags` and pulls a missing model
//! - `generate` is a one-shot `/api/generate` call under a hard timeout
//! - `stream` reads the NDJSON token stream line by line
//!
//! Timeouts never surface as errors. A one-shot timeout becomes
//! [`GenerationOutcome::TimedOut`]; a streaming timeout yields the
//! overload sentinel as the final stream item.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use ragd_core::config::LlmConfig;
use ragd_core::{
    GenerationBackend, GenerationOutcome, GenerationRequest, RagdError, Result, OVERLOAD_SENTINEL,
};

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// One line of the streaming response. Malformed lines are skipped, so
/// every field is defaulted.
#[derive(Debug, Deserialize)]
struct OllamaStreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Serialize)]
struct OllamaPullRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

// ============================================================================
// Client
// ============================================================================

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
    num_ctx: u32,
    tags_timeout: Duration,
    pull_timeout: Duration,
}

impl OllamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let config = LlmConfig {
            ollama_url: base_url.into(),
            ..LlmConfig::default()
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.ollama_url.trim_end_matches('/').to_string(),
            num_ctx: config.num_ctx,
            tags_timeout: Duration::from_secs(config.tags_timeout_secs),
            pull_timeout: Duration::from_secs(config.pull_timeout_secs),
        }
    }

    /// Names of the models currently installed on the server.
    pub async fn installed_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.tags_timeout)
            .send()
            .await
            .map_err(|e| RagdError::LlmError(format!("Model list request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RagdError::LlmError(format!(
                "Model list failed with status {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| RagdError::LlmError(format!("Failed to parse model list: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Pull a model, draining the progress stream to completion. The
    /// progress payload is discarded; only success matters here.
    async fn pull_model(&self, model: &str) -> Result<()> {
        tracing::info!("pulling model {model}, this may take several minutes");

        let pull = async {
            let request = OllamaPullRequest { name: model };
            let response = self
                .client
                .post(format!("{}/api/pull", self.base_url))
                .json(&request)
                .send()
                .await
                .map_err(|e| RagdError::LlmError(format!("Model pull request failed: {e}")))?;

            if !response.status().is_success() {
                return Err(RagdError::LlmError(format!(
                    "Model pull failed with status {}",
                    response.status()
                )));
            }

            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                chunk.map_err(|e| RagdError::LlmError(format!("Model pull interrupted: {e}")))?;
            }
            Ok(())
        };

        match tokio::time::timeout(self.pull_timeout, pull).await {
            Ok(result) => result,
            Err(_) => Err(RagdError::LlmError(format!(
                "Model pull timed out after {}s",
                self.pull_timeout.as_secs()
            ))),
        }
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<String> {
        let payload = OllamaGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                num_ctx: self.num_ctx,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| RagdError::LlmError(format!("Generation request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagdError::LlmError(format!(
                "Generation failed with status {status}: {body}"
            )));
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| RagdError::LlmError(format!("Failed to parse generation response: {e}")))?;

        Ok(parsed.response)
    }
}

#[async_trait]
impl GenerationBackend for OllamaClient {
    async fn ensure_model(&self, model: &str) -> Result<()> {
        match self.installed_models().await {
            Ok(names) if names.iter().any(|n| n == model) => return Ok(()),
            Ok(_) => tracing::info!("model {model} not installed"),
            Err(e) => tracing::warn!("model probe failed, attempting pull anyway: {e}"),
        }
        self.pull_model(model).await
    }

    async fn generate(&self, request: GenerationRequest) -> GenerationOutcome {
        if let Err(e) = self.ensure_model(&request.model).await {
            return GenerationOutcome::Failed(e.to_string());
        }

        match tokio::time::timeout(request.timeout, self.generate_once(&request)).await {
            Ok(Ok(answer)) => GenerationOutcome::Completed(answer),
            Ok(Err(e)) => GenerationOutcome::Failed(e.to_string()),
            Err(_) => {
                tracing::warn!(
                    "generation timed out after {}s",
                    request.timeout.as_secs()
                );
                GenerationOutcome::TimedOut
            }
        }
    }

    async fn stream(&self, request: GenerationRequest) -> BoxStream<'static, String> {
        if let Err(e) = self.ensure_model(&request.model).await {
            return stream::iter([format!("Error generating response: {e}")]).boxed();
        }

        // One deadline covers connect and every subsequent token. It
        // starts only now: a model pull runs under its own
        // minutes-scale budget and must not eat the streaming one.
        let deadline = Instant::now() + request.timeout;

        let payload = OllamaGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: true,
            options: OllamaOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                num_ctx: self.num_ctx,
            },
        };

        let send = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&payload)
            .send();

        let response = match tokio::time::timeout_at(deadline, send).await {
            Err(_) => return stream::iter([OVERLOAD_SENTINEL.to_string()]).boxed(),
            Ok(Err(e)) => {
                return stream::iter([format!("Error generating response: {e}")]).boxed()
            }
            Ok(Ok(response)) if !response.status().is_success() => {
                return stream::iter([format!(
                    "Error generating response: status {}",
                    response.status()
                )])
                .boxed()
            }
            Ok(Ok(response)) => response,
        };

        let state = StreamState {
            body: response
                .bytes_stream()
                .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
                .boxed(),
            buffer: Vec::new(),
            pending: VecDeque::new(),
            deadline,
            finished: false,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                if let Some(token) = st.pending.pop_front() {
                    return Some((token, st));
                }
                if st.finished {
                    return None;
                }

                match tokio::time::timeout_at(st.deadline, st.body.next()).await {
                    Err(_) => {
                        st.finished = true;
                        return Some((OVERLOAD_SENTINEL.to_string(), st));
                    }
                    Ok(None) => {
                        st.finished = true;
                        // A final line may arrive without its newline
                        if !st.buffer.is_empty() {
                            let line = std::mem::take(&mut st.buffer);
                            ingest_line(&line, &mut st.pending);
                        }
                    }
                    Ok(Some(Err(e))) => {
                        st.finished = true;
                        return Some((format!("Error generating response: {e}"), st));
                    }
                    Ok(Some(Ok(bytes))) => {
                        st.buffer.extend_from_slice(&bytes);
                        // Lines only; a token split across network reads
                        // stays buffered until its newline arrives.
                        while let Some(pos) = st.buffer.iter().position(|&b| b == b'\n') {
                            let line: Vec<u8> = st.buffer.drain(..=pos).collect();
                            if ingest_line(&line, &mut st.pending) {
                                st.finished = true;
                            }
                        }
                    }
                }
            }
        })
        .boxed()
    }
}

/// Accumulated state of one streaming generation.
struct StreamState {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
    deadline: Instant,
    finished: bool,
}

/// Parse one NDJSON line into the pending token queue. Returns whether
/// the backend signalled completion. Malformed lines are skipped.
fn ingest_line(line: &[u8], pending: &mut VecDeque<String>) -> bool {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return false;
    }

    match serde_json::from_str::<OllamaStreamChunk>(line) {
        Ok(chunk) => {
            if !chunk.response.is_empty() {
                pending.push_back(chunk.response);
            }
            chunk.done
        }
        Err(e) => {
            tracing::debug!("skipping malformed stream line: {e}");
            false
        }
    }
}
