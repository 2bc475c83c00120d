use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::{lock_db, require_admin};
use crate::errors::AppError;
use crate::models::{GameType, Settings};
use crate::services::bookings;
use crate::state::AppState;

// GET /api/game-types
pub async fn list_game_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GameType>>, AppError> {
    let db = lock_db(&state)?;
    Ok(Json(bookings::catalog_with_rates(&db)?))
}

// GET /api/settings
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<Settings>, AppError> {
    let db = lock_db(&state)?;
    Ok(Json(bookings::load_settings(&db)?))
}

// PUT /api/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<Settings>,
) -> Result<Json<Settings>, AppError> {
    require_admin(&state, &headers)?;
    let db = lock_db(&state)?;
    bookings::replace_settings(&db, &body)?;
    Ok(Json(body))
}
