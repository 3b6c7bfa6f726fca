use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::RwLock;

use arcadia_core::catalog::Catalog;
use arcadia_core::generation::GameGenerator;
use arcadia_core::sandbox::{FRAME_SANDBOX, FrameSpec};

use crate::auth::AuthConfig;
use crate::blob_store::BlobStore;
use crate::config::ServerConfig;
use crate::rate_limit::IpRateLimiter;
use crate::session_manager::SessionManager;

pub type SharedSessionManager = Arc<RwLock<SessionManager>>;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SharedSessionManager,
    pub catalog: Arc<Catalog>,
    pub generator: Arc<dyn GameGenerator>,
    pub blobs: BlobStore,
    pub auth: AuthConfig,
    pub generate_limiter: Arc<IpRateLimiter>,
    pub stream_subscriber_count: Arc<AtomicUsize>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig, catalog: Catalog, generator: Arc<dyn GameGenerator>) -> Self {
        let auth = AuthConfig {
            bearer_token: config.auth.bearer_token.clone(),
        };
        let blobs = BlobStore::new();
        let frame = FrameSpec {
            sandbox: FRAME_SANDBOX.to_string(),
            allow: config.sandbox.frame_allow.clone(),
        };
        let sessions = SessionManager::new(
            blobs.clone(),
            frame,
            config.limits.max_sessions,
            config.limits.frame_channel_capacity,
        );
        let generate_limiter = IpRateLimiter::new(
            config.limits.generate_rate_limit_burst as f64,
            config.limits.generate_rate_limit_per_sec,
        );
        Self {
            sessions: Arc::new(RwLock::new(sessions)),
            catalog: Arc::new(catalog),
            generator,
            blobs,
            auth,
            generate_limiter: Arc::new(generate_limiter),
            stream_subscriber_count: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }
}

/// Counts an open connection for as long as it lives.
pub struct ConnectionGuard {
    counter: Arc<AtomicUsize>,
}

impl ConnectionGuard {
    pub fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self { counter }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_guard_tracks_lifetime() {
        let counter = Arc::new(AtomicUsize::new(0));
        let a = ConnectionGuard::new(Arc::clone(&counter));
        let b = ConnectionGuard::new(Arc::clone(&counter));
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        drop(a);
        assert_eq!(counter.load(Ordering::Relaxed), 1);
        drop(b);
        assert_eq!(counter.load(Ordering::Relaxed), 0);
    }
}
