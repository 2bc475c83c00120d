pub mod admin;
pub mod availability;
pub mod bookings;
pub mod catalog;
pub mod health;

use std::sync::{Arc, MutexGuard};

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use rusqlite::Connection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::errors::AppError;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Bookings
        .route(
            "/api/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/api/bookings/calculate-price", post(bookings::calculate_price))
        .route(
            "/api/bookings/reference/:reference",
            get(bookings::get_by_reference),
        )
        .route(
            "/api/bookings/reference/:reference/cancel",
            post(bookings::cancel_by_reference),
        )
        .route(
            "/api/bookings/:id",
            get(bookings::get_booking)
                .put(bookings::update_booking)
                .delete(bookings::delete_booking),
        )
        // Catalog and availability
        .route("/api/availability/:date", get(availability::get_availability))
        .route("/api/game-types", get(catalog::list_game_types))
        .route(
            "/api/settings",
            get(catalog::get_settings).put(catalog::update_settings),
        )
        // Admin sessions
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout))
        .route("/api/admin/stats", get(admin::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub(crate) fn lock_db(state: &AppState) -> Result<MutexGuard<'_, Connection>, AppError> {
    state
        .db
        .lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("database lock poisoned")))
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request unless it carries a live admin session token.
pub(crate) fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthorized)?;
    if !state.sessions.validate(token, state.clock.now()) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}
