/// Default public endpoint for the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model used for game generation.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Configuration for the Gemini generation client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,
    pub model: String,
    /// Scheme and host of the API, without a trailing path.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Responses larger than this are rejected without being parsed.
    pub max_response_bytes: usize,
    /// Appended to every prompt to steer the look of generated games.
    pub style_hint: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            max_response_bytes: 2 * 1024 * 1024,
            style_hint: None,
        }
    }
}

impl GeminiConfig {
    /// Full `generateContent` URL for the configured model.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}
