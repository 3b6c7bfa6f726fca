use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shown to the player when a failure carries no message of its own.
pub const FALLBACK_FAILURE_MESSAGE: &str = "Game generation failed. Please try again.";

/// A validated generation prompt. Can only be built from non-blank text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Result<Self, GenerateError> {
        let prompt = prompt.into();
        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return Err(GenerateError::EmptyInput);
        }
        Ok(Self {
            prompt: trimmed.to_string(),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// A self-contained program plus a short explanation of how to play it.
///
/// Both fields are always present; either may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub code: String,
    pub explanation: String,
}

impl GenerationResult {
    /// Parse the model's structured output, checking both fields are strings.
    ///
    /// The remote schema is not trusted: anything other than an object with
    /// string `code` and `explanation` members is a generation failure.
    pub fn from_structured_text(text: &str) -> Result<Self, GenerateError> {
        let value: serde_json::Value = serde_json::from_str(text.trim())
            .map_err(|e| GenerateError::failed(format!("Model returned malformed JSON: {e}")))?;
        let Some(object) = value.as_object() else {
            return Err(GenerateError::failed(
                "Model response is not a JSON object",
            ));
        };
        let code = string_field(object, "code")?;
        let explanation = string_field(object, "explanation")?;
        Ok(Self { code, explanation })
    }
}

fn string_field(
    object: &serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Result<String, GenerateError> {
    match object.get(name) {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(GenerateError::failed(format!(
            "Model response field `{name}` is not a string"
        ))),
        None => Err(GenerateError::failed(format!(
            "Model response is missing `{name}`"
        ))),
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerateError {
    /// Blank prompt, rejected before any network traffic.
    #[error("prompt is empty")]
    EmptyInput,
    /// Transport, status, or payload failure. Always carries a displayable message.
    #[error("{0}")]
    GenerationFailed(String),
}

impl GenerateError {
    /// Build a `GenerationFailed`, substituting the fallback for blank messages.
    pub fn failed(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            Self::GenerationFailed(FALLBACK_FAILURE_MESSAGE.to_string())
        } else {
            Self::GenerationFailed(message)
        }
    }
}

/// A remote code-generation backend.
///
/// Implementations issue exactly one request per call and keep no state
/// between calls. Callers are responsible for not overlapping requests that
/// belong to the same play session.
#[async_trait]
pub trait GameGenerator: Send + Sync {
    async fn generate_game(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerateError>;

    /// Validate free text and generate from it. Blank text never reaches
    /// `generate_game`.
    async fn generate(&self, prompt: &str) -> Result<GenerationResult, GenerateError> {
        let request = GenerationRequest::new(prompt)?;
        self.generate_game(&request).await
    }
}
