use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use arcadia_gemini::GeminiGenerator;
use arcadia_server::catalog::load_catalog;
use arcadia_server::config::ServerConfig;
use arcadia_server::state::AppState;
use arcadia_server::{build_app, spawn_session_reaper};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("ARCADIA_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Wait for Ctrl-C, then close every session so open frame streams end and
/// graceful shutdown can complete.
async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    let closed = state.sessions.write().await.close_all();
    tracing::info!(closed, "Shutdown signal received");
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config = ServerConfig::load();
    config.validate();

    let catalog = match load_catalog(
        Path::new(&config.catalog_path),
        config.sandbox.inject_settings_listener,
    ) {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!("Failed to load catalog: {e}");
            std::process::exit(1);
        },
    };

    let generator = match GeminiGenerator::new(config.generation.to_gemini()) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::error!("Failed to build generation client: {e}");
            std::process::exit(1);
        },
    };
    tracing::info!(model = generator.model(), "Generation client ready");

    let addr: SocketAddr = match config.listen_addr.parse() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!(addr = %config.listen_addr, "Invalid listen address: {e}");
            std::process::exit(1);
        },
    };

    let (app, state) = build_app(config, catalog, Arc::new(generator));
    spawn_session_reaper(state.clone());

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, "Failed to bind: {e}");
            std::process::exit(1);
        },
    };
    tracing::info!(%addr, "Arcadia server listening");

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(state))
    .await
    {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
