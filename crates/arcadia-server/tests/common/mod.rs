use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use arcadia_core::catalog::{Catalog, Category, GameSource};
use arcadia_core::generation::{GameGenerator, GenerateError, GenerationRequest, GenerationResult};
use arcadia_core::test_helpers::{StubGenerator, make_game};

use arcadia_server::build_app;
use arcadia_server::config::{AuthFileConfig, ServerConfig};
use arcadia_server::state::AppState;

pub const SNAKE_CODE: &str = "<html><body><canvas id=\"snake\"></canvas></body></html>";
pub const SNAKE_EXPLANATION: &str = "Use arrow keys to steer the snake.";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Sample catalog, no auth, a generator that always returns the snake game.
    pub async fn new() -> Self {
        Self::with_generator(Arc::new(StubGenerator::succeeding(
            SNAKE_CODE,
            SNAKE_EXPLANATION,
        )))
        .await
    }

    pub async fn with_generator(generator: Arc<dyn GameGenerator>) -> Self {
        Self::from_parts(ServerConfig::default(), sample_catalog(), generator).await
    }

    pub async fn with_auth(token: &str) -> Self {
        let config = ServerConfig {
            auth: AuthFileConfig {
                bearer_token: Some(token.to_string()),
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let generator = Arc::new(StubGenerator::succeeding(SNAKE_CODE, SNAKE_EXPLANATION));
        Self::from_parts(config, sample_catalog(), generator).await
    }

    pub async fn from_parts(
        config: ServerConfig,
        catalog: Catalog,
        generator: Arc<dyn GameGenerator>,
    ) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, state) = build_app(config, catalog, generator);

        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            state,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn session_url(&self, session_id: &str, rest: &str) -> String {
        format!("http://{}/api/v1/sessions/{session_id}{rest}", self.addr)
    }

    /// Create a session and return its id.
    pub async fn create_session(&self) -> String {
        let resp = reqwest::Client::new()
            .post(self.url("/api/v1/sessions"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: serde_json::Value = resp.json().await.unwrap();
        body["session_id"].as_str().unwrap().to_string()
    }

    /// Load a catalog game, returning the session view.
    pub async fn play(&self, session_id: &str, game_id: &str) -> serde_json::Value {
        let resp = reqwest::Client::new()
            .post(self.session_url(session_id, "/play"))
            .json(&serde_json::json!({ "game_id": game_id }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200, "play {game_id} failed");
        resp.json().await.unwrap()
    }

    pub async fn post_config(&self, session_id: &str, key: &str, value: serde_json::Value) {
        let resp = reqwest::Client::new()
            .post(self.session_url(session_id, "/config"))
            .json(&serde_json::json!({ "key": key, "value": value }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 202);
    }
}

/// One game of each kind: embedded, external, and an empty program.
pub fn sample_catalog() -> Catalog {
    let mut strike = make_game(
        "neon-strike",
        GameSource::embedded("<html><body><p>strike</p></body></html>"),
    );
    strike.category = Category::Action;
    let mut hoops = make_game(
        "neon-hoops",
        GameSource::embedded("<html><body><p>hoops</p></body></html>"),
    );
    hoops.category = Category::Arcade;
    let mut remote = make_game(
        "remote-classic",
        GameSource::external_url("https://games.example.com/classic").unwrap(),
    );
    remote.category = Category::Classic;
    let mut empty = make_game("proxy-classic", GameSource::embedded(""));
    empty.category = Category::Classic;
    Catalog::new(vec![strike, hoops, remote, empty]).unwrap()
}

/// Generator that blocks until released, for observing in-flight state.
pub struct GatedGenerator {
    gate: Notify,
    result: GenerationResult,
}

impl GatedGenerator {
    pub fn new(code: &str, explanation: &str) -> Self {
        Self {
            gate: Notify::new(),
            result: GenerationResult {
                code: code.to_string(),
                explanation: explanation.to_string(),
            },
        }
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl GameGenerator for GatedGenerator {
    async fn generate_game(
        &self,
        _request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerateError> {
        self.gate.notified().await;
        Ok(self.result.clone())
    }
}

/// Poll until `check` holds or two seconds pass.
pub async fn wait_until<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Reads `data:` payloads out of an SSE response.
pub struct FrameReader {
    resp: reqwest::Response,
    buffer: String,
}

impl FrameReader {
    pub fn new(resp: reqwest::Response) -> Self {
        Self {
            resp,
            buffer: String::new(),
        }
    }

    /// Next frame command, or `None` on timeout or end of stream.
    pub async fn next(&mut self) -> Option<serde_json::Value> {
        let deadline = Duration::from_secs(3);
        tokio::time::timeout(deadline, async {
            loop {
                if let Some(frame) = self.take_event() {
                    return Some(frame);
                }
                match self.resp.chunk().await {
                    Ok(Some(bytes)) => self.buffer.push_str(&String::from_utf8_lossy(&bytes)),
                    _ => return None,
                }
            }
        })
        .await
        .unwrap_or(None)
    }

    fn take_event(&mut self) -> Option<serde_json::Value> {
        loop {
            let end = self.buffer.find("\n\n")?;
            let raw: String = self.buffer.drain(..end + 2).collect();
            let data: String = raw
                .lines()
                .filter_map(|l| l.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if !data.is_empty() {
                return serde_json::from_str(&data).ok();
            }
        }
    }
}

/// Open a session's frame stream.
pub async fn open_stream(server: &TestServer, session_id: &str) -> FrameReader {
    let resp = reqwest::Client::new()
        .get(server.session_url(session_id, "/stream"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    FrameReader::new(resp)
}
