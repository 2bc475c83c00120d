use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use super::{bearer_token, lock_db, require_admin};
use crate::errors::AppError;
use crate::models::{AdminSession, LoginRequest};
use crate::services::auth::password_matches;
use crate::services::bookings::{self, AdminStats};
use crate::state::AppState;

// POST /api/admin/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AdminSession>, AppError> {
    if !password_matches(&body.password, &state.config.admin_password) {
        tracing::warn!("admin login failed");
        return Err(AppError::Unauthorized);
    }
    let session = state.sessions.issue(state.clock.now());
    tracing::info!(expires_at = %session.expires_at, "admin session issued");
    Ok(Json(session))
}

// POST /api/admin/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let token = bearer_token(&headers).ok_or(AppError::Unauthorized)?;
    let revoked = state.sessions.revoke(token);
    Ok(Json(serde_json::json!({"ok": true, "revoked": revoked})))
}

// GET /api/admin/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AdminStats>, AppError> {
    require_admin(&state, &headers)?;
    let today = state.clock.now().date();
    let db = lock_db(&state)?;
    Ok(Json(bookings::stats(&db, today)?))
}
