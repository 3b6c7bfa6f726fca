use serde::Deserialize;

use arcadia_gemini::GeminiConfig;
use arcadia_gemini::config::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Top-level server configuration, loaded from `arcadia.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    pub catalog_path: String,
    pub auth: AuthFileConfig,
    pub generation: GenerationConfig,
    pub sandbox: SandboxConfig,
    pub limits: LimitsConfig,
    pub sessions: SessionsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            catalog_path: "catalog/catalog.toml".to_string(),
            auth: AuthFileConfig::default(),
            generation: GenerationConfig::default(),
            sandbox: SandboxConfig::default(),
            limits: LimitsConfig::default(),
            sessions: SessionsConfig::default(),
        }
    }
}

/// Auth section of the config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthFileConfig {
    /// Bearer token for `/api/v1`. None = auth disabled.
    pub bearer_token: Option<String>,
}

/// Remote game generation settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub max_response_bytes: usize,
    pub max_prompt_chars: usize,
    pub style_hint: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
            max_response_bytes: 2 * 1024 * 1024,
            max_prompt_chars: 2000,
            style_hint: Some(
                "ensure the game has a neon arcade aesthetic (green, yellow, blue accents, dark mode)"
                    .to_string(),
            ),
        }
    }
}

impl GenerationConfig {
    pub fn to_gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone().unwrap_or_default(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
            max_response_bytes: self.max_response_bytes,
            style_hint: self.style_hint.clone(),
        }
    }
}

/// Isolation settings for hosted programs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Add `connect-src 'none'` so programs cannot make network requests.
    pub block_network: bool,
    /// Append the settings listener script to embedded catalog programs.
    pub inject_settings_listener: bool,
    /// Permissions-policy `allow` attribute advertised to clients.
    pub frame_allow: String,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            block_network: false,
            inject_settings_listener: true,
            frame_allow: arcadia_core::sandbox::FRAME_ALLOW.to_string(),
        }
    }
}

/// Infrastructure limits (session caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_sessions: usize,
    pub max_stream_subscribers: usize,
    /// Capacity of each session's frame command channel.
    pub frame_channel_capacity: usize,
    /// Generate endpoint rate limit: max burst tokens per IP.
    pub generate_rate_limit_burst: usize,
    /// Generate endpoint rate limit: token refill rate (requests per second) per IP.
    pub generate_rate_limit_per_sec: f64,
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 500,
            max_stream_subscribers: 500,
            frame_channel_capacity: 64,
            generate_rate_limit_burst: 5,
            generate_rate_limit_per_sec: 0.1, // ~6 req/min
            request_timeout_secs: 30,
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
            idle_check_interval_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Collect fatal configuration problems.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!(
                "listen_addr is not a valid socket address: {}",
                self.listen_addr
            ));
        }
        if self.limits.max_sessions == 0 {
            problems.push("limits.max_sessions must be > 0".to_string());
        }
        if self.limits.max_stream_subscribers == 0 {
            problems.push("limits.max_stream_subscribers must be > 0".to_string());
        }
        if self.limits.frame_channel_capacity == 0 {
            problems.push("limits.frame_channel_capacity must be > 0".to_string());
        }
        if self.limits.generate_rate_limit_burst == 0 {
            problems.push("limits.generate_rate_limit_burst must be > 0".to_string());
        }
        let per_sec = self.limits.generate_rate_limit_per_sec;
        if !per_sec.is_finite() || per_sec < 0.0 {
            problems.push(
                "limits.generate_rate_limit_per_sec must be a finite number >= 0".to_string(),
            );
        }
        if self.limits.request_timeout_secs == 0 {
            problems.push("limits.request_timeout_secs must be > 0".to_string());
        }
        if self.sessions.idle_timeout_secs == 0 {
            problems.push("sessions.idle_timeout_secs must be > 0".to_string());
        }
        if self.sessions.idle_check_interval_secs == 0 {
            problems.push("sessions.idle_check_interval_secs must be > 0".to_string());
        }
        if self.generation.enabled {
            if self.generation.request_timeout_secs == 0 {
                problems.push("generation.request_timeout_secs must be > 0".to_string());
            }
            if self.generation.max_response_bytes == 0 {
                problems.push("generation.max_response_bytes must be > 0".to_string());
            }
            if self.generation.max_prompt_chars == 0 {
                problems.push("generation.max_prompt_chars must be > 0".to_string());
            }
        }
        problems
    }

    /// Validate configuration, logging warnings and exiting on fatal problems.
    pub fn validate(&self) {
        if self.auth.bearer_token.is_some() {
            tracing::warn!(
                "bearer_token is set in config file, use ARCADIA_API_TOKEN env var in production"
            );
        }
        if self.generation.api_key.is_some() && self.generation.enabled {
            tracing::warn!(
                "generation.api_key is set, prefer ARCADIA_GEMINI_API_KEY in production"
            );
        }
        if self.generation.enabled && self.generation.api_key.is_none() {
            tracing::warn!("Generation enabled but no API key configured, requests will fail");
        }
        if !self.sandbox.block_network {
            tracing::warn!(
                "sandbox.block_network is off: hosted programs (including generated ones) \
                 can make outbound network requests"
            );
        }

        let problems = self.problems();
        if !problems.is_empty() {
            for problem in &problems {
                tracing::error!("{problem}");
            }
            std::process::exit(1);
        }
    }

    /// Load config from `arcadia.toml` if it exists, then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("ARCADIA_CONFIG").unwrap_or_else(|_| "arcadia.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "Loaded configuration");
                    cfg
                },
                Err(e) => {
                    tracing::warn!(path = %path, "Failed to parse config: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!(path = %path, "No config file found, using defaults");
                ServerConfig::default()
            },
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(addr) = non_empty("ARCADIA_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(root) = non_empty("ARCADIA_WEB_ROOT") {
            self.web_root = root;
        }
        if let Some(catalog) = non_empty("ARCADIA_CATALOG") {
            self.catalog_path = catalog;
        }
        if let Some(token) = non_empty("ARCADIA_API_TOKEN") {
            self.auth.bearer_token = Some(token);
        }
        if let Some(key) =
            non_empty("ARCADIA_GEMINI_API_KEY").or_else(|| non_empty("GEMINI_API_KEY"))
        {
            self.generation.api_key = Some(key);
        }
        if let Some(model) = non_empty("ARCADIA_GEMINI_MODEL") {
            self.generation.model = model;
        }
        if let Some(n) = non_empty("ARCADIA_MAX_SESSIONS").and_then(|v| v.parse::<usize>().ok()) {
            self.limits.max_sessions = n;
        }
    }
}
