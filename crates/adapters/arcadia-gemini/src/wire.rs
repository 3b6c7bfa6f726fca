//! Request and response bodies for `models/{model}:generateContent`.

use serde::{Deserialize, Serialize};

/// Instruction wrapped around the player's prompt.
pub fn build_prompt(prompt: &str, style_hint: Option<&str>) -> String {
    let request = match style_hint {
        Some(hint) if !hint.trim().is_empty() => format!("{prompt} - {}", hint.trim()),
        _ => prompt.to_string(),
    };
    format!(
        "Act as a senior game developer. Generate a single-file HTML document (including CSS \
         and JavaScript) for a playable browser game based on this request: \"{request}\".\n\
         The code must be fully self-contained in one string with no external files. Use \
         standard canvas or DOM-based game logic.\n\
         Include basic styles for a dark theme that matches a gaming portal.\n\
         Respond in JSON with two fields: 'code' (the full HTML/CSS/JS document) and \
         'explanation' (a short summary of how to play)."
    )
}

/// Two-field schema the model must conform to.
pub fn response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "code": {
                "type": "STRING",
                "description": "The full HTML/JS/CSS code for the game."
            },
            "explanation": {
                "type": "STRING",
                "description": "Short gameplay instructions."
            }
        },
        "required": ["code", "explanation"]
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<RequestContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct RequestContent {
    pub role: &'static str,
    pub parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
pub struct RequestPart {
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: &'static str,
    pub response_schema: serde_json::Value,
}

impl GenerateContentRequest {
    pub fn new(text: String) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, if it has any.
    pub fn candidate_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.is_empty() { None } else { Some(text) }
    }

    /// Human-readable reason the model produced nothing.
    pub fn empty_reason(&self) -> String {
        if let Some(reason) = self
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            return format!("Prompt was blocked by the model ({reason})");
        }
        match self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
        {
            Some(reason) => format!("Model returned no content (finish reason {reason})"),
            None => "Model returned no content".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub message: Option<String>,
}

/// Extract `error.message` from an API error body.
pub fn api_error_message(body: &[u8]) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_slice(body).ok()?;
    parsed.error.message.filter(|m| !m.trim().is_empty())
}
