use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog category a game is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Classic,
    Action,
    Puzzle,
    Arcade,
    #[serde(rename = "AI-Gen")]
    AiGen,
}

/// Where a game's playable content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum GameSource {
    /// The isolated context navigates straight to this address.
    ExternalUrl(String),
    /// Literal self-contained HTML/CSS/JS document text.
    EmbeddedProgram(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("external url must use http or https: {0}")]
    UnsupportedScheme(String),
    #[error("external url is empty")]
    EmptyUrl,
}

impl GameSource {
    /// Build an external source, rejecting anything but `http(s)://` addresses.
    ///
    /// Schemes such as `javascript:` or `data:` would execute in a context the
    /// host does not control, so they never reach a session.
    pub fn external_url(url: impl Into<String>) -> Result<Self, SourceError> {
        let url = url.into();
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(SourceError::EmptyUrl);
        }
        let lower = trimmed.to_ascii_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(SourceError::UnsupportedScheme(trimmed.to_string()));
        }
        Ok(Self::ExternalUrl(trimmed.to_string()))
    }

    pub fn embedded(program: impl Into<String>) -> Self {
        Self::EmbeddedProgram(program.into())
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Self::EmbeddedProgram(_))
    }

    /// Short label used in logs and API summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExternalUrl(_) => "external",
            Self::EmbeddedProgram(_) => "embedded",
        }
    }
}

/// A playable catalog entry. Immutable once the catalog is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub category: Category,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: GameSource,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate game id: {0}")]
    DuplicateId(String),
    #[error("game id must not be empty")]
    EmptyId,
    #[error("game {id}: {source}")]
    InvalidSource { id: String, source: SourceError },
}

/// Static, read-only list of games, shared for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    games: Vec<GameDescriptor>,
}

impl Catalog {
    /// Build a catalog, validating ids and external sources.
    /// External URLs are stored in their normalized form.
    pub fn new(mut games: Vec<GameDescriptor>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::with_capacity(games.len());
        for game in &mut games {
            if game.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(game.id.clone()) {
                return Err(CatalogError::DuplicateId(game.id.clone()));
            }
            if let GameSource::ExternalUrl(url) = &game.source {
                let normalized = GameSource::external_url(url.as_str()).map_err(|source| {
                    CatalogError::InvalidSource {
                        id: game.id.clone(),
                        source,
                    }
                })?;
                game.source = normalized;
            }
        }
        Ok(Self { games })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&GameDescriptor> {
        self.games.iter().find(|g| g.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GameDescriptor> {
        self.games.iter()
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}
