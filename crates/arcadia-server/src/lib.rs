pub mod api;
pub mod auth;
pub mod blob_store;
pub mod catalog;
pub mod config;
pub mod error;
pub mod frame_channel;
pub mod health;
pub mod rate_limit;
pub mod sandbox_route;
pub mod session_manager;
pub mod sse;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::timeout::TimeoutLayer;

use arcadia_core::catalog::Catalog;
use arcadia_core::generation::GameGenerator;

use config::ServerConfig;
use error::AppError;
use state::AppState;

/// Rate-limit buckets idle this long are forgotten.
const RATE_LIMIT_BUCKET_TTL: Duration = Duration::from_secs(600);

/// Build the Axum router and application state.
pub fn build_app(
    config: ServerConfig,
    catalog: Catalog,
    generator: Arc<dyn GameGenerator>,
) -> (Router<()>, AppState) {
    let web_root = config.web_root.clone();
    let request_timeout = Duration::from_secs(config.limits.request_timeout_secs);
    let state = AppState::new(config, catalog, generator);

    let short_routes = Router::new()
        .route("/games", get(api::list_games))
        .route("/games/{game_id}", get(api::get_game))
        .route("/sessions", post(api::create_session))
        .route(
            "/sessions/{session_id}",
            get(api::get_session).delete(api::delete_session),
        )
        .route("/sessions/{session_id}/play", post(api::play_game))
        .route("/sessions/{session_id}/config", post(api::post_config))
        .layer(TimeoutLayer::new(request_timeout));

    // Generation and streams outlive the request timeout.
    let long_routes = Router::new()
        .route("/sessions/{session_id}/generate", post(api::generate_game))
        .route("/sessions/{session_id}/stream", get(sse::frame_stream));

    let api_routes = short_routes
        .merge(long_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            bearer_auth_layer,
        ));

    // Not behind auth: iframes cannot send credentials, handles are unguessable.
    let sandbox_routes =
        Router::new().route("/sandbox/{handle}", get(sandbox_route::serve_program));

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .nest("/api/v1", api_routes)
        .merge(sandbox_routes)
        .fallback_service(ServeDir::new(&web_root))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .with_state(state.clone());

    (app, state)
}

/// Background task that reaps idle sessions and stale rate-limit buckets.
pub fn spawn_session_reaper(state: AppState) -> tokio::task::JoinHandle<()> {
    let idle_timeout = Duration::from_secs(state.config.sessions.idle_timeout_secs);
    let period = Duration::from_secs(state.config.sessions.idle_check_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = state
                .sessions
                .write()
                .await
                .cleanup_idle_sessions(idle_timeout);
            if reaped > 0 {
                tracing::info!(reaped, "Reaped idle sessions");
            }
            let forgotten = state.generate_limiter.cleanup(RATE_LIMIT_BUCKET_TTL).await;
            if forgotten > 0 {
                tracing::debug!(forgotten, "Dropped stale rate-limit buckets");
            }
        }
    })
}

/// Middleware wrapper that injects AuthConfig into request extensions for the
/// bearer auth middleware.
async fn bearer_auth_layer(
    axum::extract::State(state): axum::extract::State<AppState>,
    mut request: axum::extract::Request,
    next: middleware::Next,
) -> Result<axum::response::Response, AppError> {
    request.extensions_mut().insert(state.auth.clone());
    auth::bearer_auth_middleware(request.headers().clone(), request, next).await
}
