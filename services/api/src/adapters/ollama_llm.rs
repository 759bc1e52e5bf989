//! services/api/src/adapters/ollama_llm.rs
//!
//! This module contains the adapter for the locally hosted tutoring model.
//! It implements the `LanguageModelService` port against Ollama's generate API.

use async_trait::async_trait;
use picata_core::ports::{Completion, CompletionRequest, LanguageModelService, PortError, PortResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LanguageModelService` using a local Ollama host.
#[derive(Clone)]
pub struct OllamaAdapter {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaAdapter {
    /// Creates a new `OllamaAdapter` for the host at `base_url` (e.g. `http://localhost:11434`).
    pub fn new(client: reqwest::Client, base_url: String, model: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

//=========================================================================================
// `LanguageModelService` Trait Implementation
//=========================================================================================

#[async_trait]
impl LanguageModelService for OllamaAdapter {
    /// Sends one fully rendered prompt and waits for the whole (non-streamed) answer.
    async fn complete(&self, request: CompletionRequest) -> PortResult<Completion> {
        debug!("PROMPT:\n{}", request.prompt);
        let started = Instant::now();

        let body = GenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            stream: false,
        };

        let response = self
            .client
            .post(self.generate_url())
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PortError::Timeout(request.timeout)
                } else {
                    PortError::Unexpected(format!("Model host request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Model host returned {}: {}",
                status, detail
            )));
        }

        let generated = response.json::<GenerateResponse>().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Timeout(request.timeout)
            } else {
                PortError::Unexpected(format!("Unreadable model response: {}", e))
            }
        })?;

        let elapsed = started.elapsed();
        info!("⏱️ {} took: {:?}", self.model, elapsed);

        Ok(Completion {
            text: generated.response.trim().to_string(),
            elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_disables_streaming() {
        let body = GenerateRequest {
            model: "llama3.2",
            prompt: "Answer: What is a graph?",
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "llama3.2", "prompt": "Answer: What is a graph?", "stream": false})
        );
    }

    #[test]
    fn generate_url_ignores_trailing_slash() {
        let adapter = OllamaAdapter::new(
            reqwest::Client::new(),
            "http://localhost:11434/".to_string(),
            "llama3.2".to_string(),
        );
        assert_eq!(adapter.generate_url(), "http://localhost:11434/api/generate");
    }
}
