//! Admin and operator HTTP surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::config::GameConfig;

use super::AppState;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

/// Server-wide aggregates.
pub async fn stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.manager.stats();
    let bots: usize = stats.iter().map(|s| s.bots.len()).sum();
    let hands: u64 = stats.iter().map(|s| s.hands_completed).sum();
    Json(json!({
        "games": stats.len(),
        "bots": bots,
        "hands_completed": hands,
    }))
}

/// Per-game snapshots.
pub async fn games(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.stats())
}

/// Body of `POST /admin/games`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameBody {
    pub id: String,
    pub small_blind: u32,
    pub big_blind: u32,
    pub start_chips: u32,
    pub timeout_ms: u64,
    pub min_players: usize,
    pub max_players: usize,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub hands: Option<u64>,
}

impl CreateGameBody {
    /// Admin-created games allow sub-second timeouts (test harnesses rely
    /// on them); everything else mirrors config-file validation.
    fn validate(&self) -> Result<GameConfig, String> {
        if self.small_blind == 0 || self.big_blind <= self.small_blind {
            return Err("blinds must satisfy bb > sb > 0".to_owned());
        }
        if !(2..=10).contains(&self.max_players)
            || self.min_players < 2
            || self.min_players > self.max_players
        {
            return Err("player counts must satisfy 2 <= min <= max <= 10".to_owned());
        }
        if self.start_chips < self.big_blind {
            return Err("start_chips must cover the big blind".to_owned());
        }
        if self.timeout_ms == 0 {
            return Err("timeout_ms must be positive".to_owned());
        }
        Ok(GameConfig {
            small_blind: self.small_blind,
            big_blind: self.big_blind,
            start_chips: self.start_chips,
            timeout: std::time::Duration::from_millis(self.timeout_ms),
            min_players: self.min_players,
            max_players: self.max_players,
            seed: self.seed,
            hand_limit: self.hands,
        })
    }
}

pub async fn create_game(
    State(state): State<AppState>,
    Json(body): Json<CreateGameBody>,
) -> impl IntoResponse {
    let cfg = match body.validate() {
        Ok(cfg) => cfg,
        Err(reason) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
        }
    };
    match state.manager.create_game(&body.id, cfg) {
        Ok(pool) => (StatusCode::CREATED, Json(pool.stats())).into_response(),
        Err(e) => (StatusCode::CONFLICT, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

pub async fn delete_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.manager.delete_game(&id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(json!({ "error": e.to_string() }))).into_response(),
    }
}

pub async fn game_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.manager.get(&id) {
        Some(pool) => Json(pool.stats()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("no such game '{id}'") })),
        )
            .into_response(),
    }
}
