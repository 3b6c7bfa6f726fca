use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};

use arcadia_core::catalog::{Category, GameDescriptor};
use arcadia_core::generation::GenerationRequest;
use arcadia_core::messages::SettingValue;

use crate::error::AppError;
use crate::session_manager::SessionView;
use crate::state::AppState;

const MAX_SETTING_KEY_LEN: usize = 64;

/// Catalog listing entry. Program text is left out; it is only ever served
/// through the sandbox.
#[derive(Debug, Serialize)]
pub struct GameSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail: String,
    pub category: Category,
    pub tags: Vec<String>,
    pub kind: &'static str,
}

impl From<&GameDescriptor> for GameSummary {
    fn from(game: &GameDescriptor) -> Self {
        Self {
            id: game.id.clone(),
            title: game.title.clone(),
            description: game.description.clone(),
            thumbnail: game.thumbnail.clone(),
            category: game.category,
            tags: game.tags.clone(),
            kind: game.source.kind(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GamesQuery {
    pub category: Option<Category>,
}

/// GET /api/v1/games: catalog summaries, optionally filtered by category.
pub async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<GamesQuery>,
) -> Json<Vec<GameSummary>> {
    let games = state
        .catalog
        .iter()
        .filter(|g| query.category.is_none_or(|c| g.category == c))
        .map(GameSummary::from)
        .collect();
    Json(games)
}

/// GET /api/v1/games/{game_id}
pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameDescriptor>, AppError> {
    state
        .catalog
        .get(&game_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Game {game_id} not found")))
}

/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let view = state.sessions.write().await.create_session()?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/sessions/{session_id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.read().await.view(&session_id)?))
}

/// DELETE /api/v1/sessions/{session_id}: tear down and release the sandbox.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.sessions.write().await.close_session(&session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PlayBody {
    pub game_id: String,
}

/// POST /api/v1/sessions/{session_id}/play: load a catalog game.
pub async fn play_game(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<PlayBody>,
) -> Result<Json<SessionView>, AppError> {
    let game = state
        .catalog
        .get(&body.game_id)
        .ok_or_else(|| AppError::NotFound(format!("Game {} not found", body.game_id)))?;
    let view = state.sessions.write().await.play_game(&session_id, game)?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub prompt: String,
}

/// POST /api/v1/sessions/{session_id}/generate: generate a game from a
/// prompt and load it into the session.
///
/// The remote call runs in its own task. A client that disconnects does not
/// cancel it; the result is still loaded if the session is alive.
pub async fn generate_game(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Path(session_id): Path<String>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<SessionView>, AppError> {
    let request = GenerationRequest::new(body.prompt)?;
    let max_chars = state.config.generation.max_prompt_chars;
    if request.prompt().chars().count() > max_chars {
        return Err(AppError::BadRequest(format!(
            "Prompt exceeds {max_chars} characters"
        )));
    }
    if !state.config.generation.enabled {
        return Err(AppError::ServiceUnavailable(
            "Game generation is disabled".to_string(),
        ));
    }

    // Unknown sessions and overlapping submits are refused before a token is spent.
    state.sessions.write().await.begin_generation(&session_id)?;
    if let Err(retry_after) = state.generate_limiter.acquire(addr.ip()).await {
        state.sessions.write().await.finish_generation(&session_id);
        tracing::warn!(ip = %addr.ip(), ?retry_after, "Generate rate limit hit");
        return Err(AppError::TooManyRequests(match retry_after {
            Some(wait) => format!("Too many generations, retry in {}s", wait.as_secs() + 1),
            None => "Too many generations".to_string(),
        }));
    }
    tracing::info!(
        session = %session_id,
        chars = request.prompt().chars().count(),
        "Generation started"
    );

    let task = tokio::spawn(async move {
        let outcome = state.generator.generate_game(&request).await;
        let mut sessions = state.sessions.write().await;
        sessions.finish_generation(&session_id);
        match outcome {
            Ok(result) => {
                if !sessions.contains(&session_id) {
                    tracing::info!(session = %session_id, "Session closed before generation finished");
                }
                Ok(sessions.load_program(&session_id, result)?)
            },
            Err(e) => {
                tracing::warn!(session = %session_id, "Generation failed: {e}");
                Err(AppError::from(e))
            },
        }
    });

    let view = task
        .await
        .map_err(|e| AppError::Internal(format!("Generation task failed: {e}")))??;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct ConfigBody {
    pub key: String,
    pub value: SettingValue,
}

/// POST /api/v1/sessions/{session_id}/config: forward a setting change to
/// the running program. Best-effort: delivery is not confirmed.
pub async fn post_config(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<StatusCode, AppError> {
    let key = body.key.trim();
    if key.is_empty() {
        return Err(AppError::BadRequest("Setting key must not be empty".to_string()));
    }
    if key.len() > MAX_SETTING_KEY_LEN {
        return Err(AppError::BadRequest(format!(
            "Setting key exceeds {MAX_SETTING_KEY_LEN} chars"
        )));
    }
    state
        .sessions
        .write()
        .await
        .post_config(&session_id, key, body.value)?;
    Ok(StatusCode::ACCEPTED)
}
