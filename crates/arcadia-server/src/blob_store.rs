use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use arcadia_core::sandbox::{ResourceHandle, ResourceStore};

/// URL prefix under which minted programs are served.
pub const SANDBOX_PREFIX: &str = "/sandbox";

/// A minted program document.
#[derive(Debug, Clone)]
pub struct Blob {
    pub content: Arc<str>,
    pub mime: &'static str,
    pub created_at: Instant,
}

/// In-memory store of temporary program resources, shared by all sessions.
///
/// Each handle is reachable at `/sandbox/{handle}` until revoked.
#[derive(Clone, Default)]
pub struct BlobStore {
    blobs: Arc<Mutex<HashMap<ResourceHandle, Blob>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ResourceHandle, Blob>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.blobs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, handle: &ResourceHandle) -> Option<Blob> {
        self.lock().get(handle).cloned()
    }

    /// Number of live handles across all sessions.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().values().map(|b| b.content.len()).sum()
    }
}

impl ResourceStore for BlobStore {
    fn mint(&self, content: &str, mime: &'static str) -> ResourceHandle {
        let handle = ResourceHandle::new();
        self.lock().insert(
            handle,
            Blob {
                content: Arc::from(content),
                mime,
                created_at: Instant::now(),
            },
        );
        tracing::debug!(%handle, bytes = content.len(), "Minted sandbox resource");
        handle
    }

    fn revoke(&self, handle: &ResourceHandle) -> bool {
        let removed = self.lock().remove(handle);
        if let Some(blob) = &removed {
            tracing::debug!(
                %handle,
                age_ms = blob.created_at.elapsed().as_millis() as u64,
                "Revoked sandbox resource"
            );
        }
        removed.is_some()
    }

    fn address(&self, handle: &ResourceHandle) -> String {
        format!("{SANDBOX_PREFIX}/{handle}")
    }
}
