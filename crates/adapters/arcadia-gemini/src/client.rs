use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use arcadia_core::generation::{
    GameGenerator, GenerateError, GenerationRequest, GenerationResult,
};

use crate::config::GeminiConfig;
use crate::wire::{GenerateContentRequest, GenerateContentResponse, api_error_message, build_prompt};

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Stateless client for `generateContent`. One call, one request, no retries.
pub struct GeminiGenerator {
    config: GeminiConfig,
    endpoint: String,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(config: GeminiConfig) -> Result<Self, GeminiError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("arcadia-gemini/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            endpoint: config.endpoint(),
            config,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn read_body(&self, mut resp: reqwest::Response) -> Result<Vec<u8>, GenerateError> {
        let limit = self.config.max_response_bytes;
        if let Some(len) = resp.content_length()
            && len > limit as u64
        {
            return Err(oversized(limit));
        }
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.map_err(transport_error)? {
            if body.len() + chunk.len() > limit {
                return Err(oversized(limit));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl GameGenerator for GeminiGenerator {
    async fn generate_game(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerateError> {
        let text = build_prompt(request.prompt(), self.config.style_hint.as_deref());
        let body = GenerateContentRequest::new(text);

        tracing::info!(
            model = %self.config.model,
            prompt_chars = request.prompt().chars().count(),
            "Requesting game generation"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let bytes = self.read_body(resp).await?;

        if !status.is_success() {
            let message = api_error_message(&bytes)
                .map(|m| format!("Generation service error ({status}): {m}"))
                .unwrap_or_else(|| format!("Generation service returned {status}"));
            tracing::warn!(%status, "Game generation rejected by service");
            return Err(GenerateError::failed(message));
        }

        let envelope: GenerateContentResponse = serde_json::from_slice(&bytes).map_err(|e| {
            GenerateError::failed(format!("Unreadable response from generation service: {e}"))
        })?;

        let Some(text) = envelope.candidate_text() else {
            let reason = envelope.empty_reason();
            tracing::warn!(reason = %reason, "Model produced no content");
            return Err(GenerateError::failed(reason));
        };

        let result = GenerationResult::from_structured_text(&text)?;
        tracing::info!(
            code_bytes = result.code.len(),
            "Game generation succeeded"
        );
        Ok(result)
    }
}

fn transport_error(e: reqwest::Error) -> GenerateError {
    tracing::warn!(error = %e, "Generation request failed");
    if e.is_timeout() {
        GenerateError::failed("Generation request timed out")
    } else {
        GenerateError::failed(format!("Could not reach generation service: {e}"))
    }
}

fn oversized(limit: usize) -> GenerateError {
    tracing::warn!(limit, "Generation response exceeded size limit");
    GenerateError::failed(format!(
        "Generation response exceeded the {limit} byte limit"
    ))
}
