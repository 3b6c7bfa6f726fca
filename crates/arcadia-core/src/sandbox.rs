use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::GameSource;
use crate::messages::{HostMessage, SettingValue};

/// Mime type attached to every embedded program resource.
pub const PROGRAM_MIME: &str = "text/html; charset=utf-8";

/// `sandbox` attribute for the iframe hosting a session. Scripts run, but the
/// document gets an opaque origin: no host cookies, storage, or top navigation.
pub const FRAME_SANDBOX: &str = "allow-scripts allow-pointer-lock";

/// `allow` attribute (permissions policy) for the hosting iframe.
pub const FRAME_ALLOW: &str = "fullscreen; autoplay; gamepad";

/// Opaque id of a short-lived, locally addressable program resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceHandle(Uuid);

impl ResourceHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for ResourceHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mints and revokes the temporary resources that back embedded programs.
pub trait ResourceStore {
    /// Package `content` as a resource of type `mime` and return its handle.
    fn mint(&self, content: &str, mime: &'static str) -> ResourceHandle;
    /// Release a handle. Returns `false` if it was unknown or already revoked.
    fn revoke(&self, handle: &ResourceHandle) -> bool;
    /// Address the isolated context navigates to for this handle.
    fn address(&self, handle: &ResourceHandle) -> String;
}

/// The isolated execution context a session drives.
///
/// The host only ever navigates it, blanks it, or posts messages into it.
pub trait IsolatedContext {
    fn navigate(&mut self, address: &str);
    fn blank(&mut self);
    /// Fire-and-forget. Messages posted before the context is ready may be lost.
    fn post_message(&self, message: &HostMessage);
}

/// Attributes a client must put on the iframe that hosts a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSpec {
    pub sandbox: String,
    pub allow: String,
}

impl Default for FrameSpec {
    fn default() -> Self {
        Self {
            sandbox: FRAME_SANDBOX.to_string(),
            allow: FRAME_ALLOW.to_string(),
        }
    }
}

/// One play view's sandbox: the active source plus at most one live resource.
///
/// Dropping the session unloads it, so the handle is released on every exit
/// path.
pub struct SandboxSession<S: ResourceStore, C: IsolatedContext> {
    store: S,
    context: C,
    active: Option<GameSource>,
    handle: Option<ResourceHandle>,
}

impl<S: ResourceStore, C: IsolatedContext> SandboxSession<S, C> {
    pub fn new(store: S, context: C) -> Self {
        Self {
            store,
            context,
            active: None,
            handle: None,
        }
    }

    /// Activate `source`, releasing whatever was loaded before.
    pub fn load(&mut self, source: GameSource) {
        self.release_handle();
        match &source {
            GameSource::ExternalUrl(url) => {
                tracing::debug!(url = %url, "Loading external game");
                self.context.navigate(url);
            },
            GameSource::EmbeddedProgram(program) => {
                if program.trim().is_empty() {
                    tracing::debug!("Loading empty program, region will render blank");
                }
                let handle = self.store.mint(program, PROGRAM_MIME);
                let address = self.store.address(&handle);
                tracing::debug!(%handle, bytes = program.len(), "Loading embedded program");
                self.handle = Some(handle);
                self.context.navigate(&address);
            },
        }
        self.active = Some(source);
    }

    /// Release the temporary resource (if any) and blank the context.
    pub fn unload(&mut self) {
        let had_source = self.active.take().is_some();
        self.release_handle();
        if had_source {
            self.context.blank();
        }
    }

    /// Post a setting change into the running program. Best-effort.
    pub fn post_config(&self, key: &str, value: impl Into<SettingValue>) {
        self.context.post_message(&HostMessage::setting(key, value));
    }

    /// Unload and drop the session.
    pub fn close(self) {
        drop(self);
    }

    pub fn active_source(&self) -> Option<&GameSource> {
        self.active.as_ref()
    }

    pub fn handle(&self) -> Option<ResourceHandle> {
        self.handle
    }

    /// Address the context currently shows, if anything is loaded.
    pub fn current_address(&self) -> Option<String> {
        match (&self.active, &self.handle) {
            (Some(GameSource::ExternalUrl(url)), _) => Some(url.clone()),
            (Some(GameSource::EmbeddedProgram(_)), Some(handle)) => {
                Some(self.store.address(handle))
            },
            _ => None,
        }
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    fn release_handle(&mut self) {
        if let Some(handle) = self.handle.take()
            && !self.store.revoke(&handle)
        {
            tracing::warn!(%handle, "Resource handle was already released");
        }
    }
}

impl<S: ResourceStore, C: IsolatedContext> Drop for SandboxSession<S, C> {
    fn drop(&mut self) {
        self.unload();
    }
}
