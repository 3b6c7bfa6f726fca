use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use arcadia_core::catalog::{GameDescriptor, GameSource};
use arcadia_core::generation::GenerationResult;
use arcadia_core::messages::SettingValue;
use arcadia_core::sandbox::{FrameSpec, SandboxSession};

use crate::blob_store::BlobStore;
use crate::error::AppError;
use crate::frame_channel::{FrameChannel, FrameCommand};

/// The sandbox behind one player view.
pub type PlaySession = SandboxSession<BlobStore, FrameChannel>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(String),
    #[error("Session limit reached ({0})")]
    LimitReached(usize),
    #[error("A generation is already in progress for this session")]
    GenerationPending,
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(_) => Self::NotFound(e.to_string()),
            SessionError::LimitReached(_) => Self::ServiceUnavailable(e.to_string()),
            SessionError::GenerationPending => Self::Conflict(e.to_string()),
        }
    }
}

/// Client-facing snapshot of a session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub game_id: Option<String>,
    /// What the iframe should currently show.
    pub src: Option<String>,
    pub source_kind: Option<&'static str>,
    pub explanation: Option<String>,
    pub generating: bool,
    pub frame: FrameSpec,
}

struct SessionEntry {
    session: PlaySession,
    game_id: Option<String>,
    explanation: Option<String>,
    generating: bool,
    last_activity: Instant,
}

/// Owns every live play session and drives their load/unload transitions.
pub struct SessionManager {
    sessions: HashMap<String, SessionEntry>,
    blobs: BlobStore,
    frame: FrameSpec,
    max_sessions: usize,
    channel_capacity: usize,
}

impl SessionManager {
    pub fn new(
        blobs: BlobStore,
        frame: FrameSpec,
        max_sessions: usize,
        channel_capacity: usize,
    ) -> Self {
        Self {
            sessions: HashMap::new(),
            blobs,
            frame,
            max_sessions,
            channel_capacity,
        }
    }

    /// Create an empty session. Returns its view.
    pub fn create_session(&mut self) -> Result<SessionView, SessionError> {
        if self.sessions.len() >= self.max_sessions {
            tracing::warn!(max = self.max_sessions, "Session limit reached");
            return Err(SessionError::LimitReached(self.max_sessions));
        }
        let id = Uuid::new_v4().to_string();
        let channel = FrameChannel::new(id.clone(), self.channel_capacity);
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                session: SandboxSession::new(self.blobs.clone(), channel),
                game_id: None,
                explanation: None,
                generating: false,
                last_activity: Instant::now(),
            },
        );
        tracing::info!(session = %id, "Session created");
        self.view(&id)
    }

    pub fn view(&self, id: &str) -> Result<SessionView, SessionError> {
        let entry = self.entry(id)?;
        Ok(SessionView {
            session_id: id.to_string(),
            game_id: entry.game_id.clone(),
            src: entry.session.current_address(),
            source_kind: entry.session.active_source().map(GameSource::kind),
            explanation: entry.explanation.clone(),
            generating: entry.generating,
            frame: self.frame.clone(),
        })
    }

    /// Tear a session down, releasing its resource handle.
    pub fn close_session(&mut self, id: &str) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .remove(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.session.close();
        tracing::info!(session = %id, "Session closed");
        Ok(())
    }

    /// Load a catalog game into the session, replacing whatever was running.
    pub fn play_game(
        &mut self,
        id: &str,
        game: &GameDescriptor,
    ) -> Result<SessionView, SessionError> {
        let entry = self.entry_mut(id)?;
        entry.session.load(game.source.clone());
        entry.game_id = Some(game.id.clone());
        entry.explanation = None;
        tracing::info!(session = %id, game = %game.id, kind = game.source.kind(), "Game loaded");
        self.view(id)
    }

    /// Load a freshly generated program into the session.
    pub fn load_program(
        &mut self,
        id: &str,
        result: GenerationResult,
    ) -> Result<SessionView, SessionError> {
        let entry = self.entry_mut(id)?;
        entry.session.load(GameSource::EmbeddedProgram(result.code));
        entry.game_id = None;
        entry.explanation = Some(result.explanation);
        tracing::info!(session = %id, "Generated game loaded");
        self.view(id)
    }

    pub fn post_config(
        &mut self,
        id: &str,
        key: &str,
        value: SettingValue,
    ) -> Result<(), SessionError> {
        let entry = self.entry_mut(id)?;
        entry.session.post_config(key, value);
        Ok(())
    }

    /// Mark a generation as in flight. Fails if one already is.
    pub fn begin_generation(&mut self, id: &str) -> Result<(), SessionError> {
        let entry = self.entry_mut(id)?;
        if entry.generating {
            return Err(SessionError::GenerationPending);
        }
        entry.generating = true;
        Ok(())
    }

    /// Clear the in-flight flag. No-op if the session is gone.
    pub fn finish_generation(&mut self, id: &str) {
        if let Some(entry) = self.sessions.get_mut(id) {
            entry.generating = false;
            entry.last_activity = Instant::now();
        }
    }

    /// Subscribe to a session's frame commands. The first item returned is
    /// the command that brings a fresh iframe up to date.
    pub fn subscribe(
        &mut self,
        id: &str,
    ) -> Result<(FrameCommand, broadcast::Receiver<FrameCommand>), SessionError> {
        let entry = self.entry_mut(id)?;
        let current = match entry.session.current_address() {
            Some(src) => FrameCommand::Navigate { src },
            None => FrameCommand::Blank,
        };
        Ok((current, entry.session.context().subscribe()))
    }

    /// Remove sessions idle for longer than `max_idle`. Sessions with a
    /// generation in flight are kept.
    pub fn cleanup_idle_sessions(&mut self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|id, entry| {
            let keep = entry.generating
                || entry.session.context().subscriber_count() > 0
                || now.duration_since(entry.last_activity) < max_idle;
            if !keep {
                tracing::info!(session = %id, "Reaping idle session");
            }
            keep
        });
        before - self.sessions.len()
    }

    /// Close every session. Returns how many were closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.sessions.len();
        for (_, entry) in self.sessions.drain() {
            entry.session.close();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    fn entry(&self, id: &str) -> Result<&SessionEntry, SessionError> {
        self.sessions
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    fn entry_mut(&mut self, id: &str) -> Result<&mut SessionEntry, SessionError> {
        let entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.last_activity = Instant::now();
        Ok(entry)
    }

    #[cfg(test)]
    fn backdate(&mut self, id: &str, by: Duration) {
        if let Some(entry) = self.sessions.get_mut(id) {
            entry.last_activity = Instant::now() - by;
        }
    }
}
