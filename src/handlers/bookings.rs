use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use super::{lock_db, require_admin};
use crate::errors::AppError;
use crate::models::{Booking, CreateBookingRequest, PriceBreakdown, PriceQuery, UpdateBookingRequest};
use crate::services::bookings;
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let now = state.clock.now();
    let db = lock_db(&state)?;
    let booking = bookings::create_booking(&db, &state.config, now, body)?;
    Ok((StatusCode::CREATED, Json(booking)))
}

// GET /api/bookings
#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    require_admin(&state, &headers)?;
    let db = lock_db(&state)?;
    Ok(Json(bookings::list_bookings(&db, query.status.as_deref())?))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Booking>, AppError> {
    require_admin(&state, &headers)?;
    let db = lock_db(&state)?;
    Ok(Json(bookings::get_booking(&db, &id)?))
}

// PUT /api/bookings/:id
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    require_admin(&state, &headers)?;
    let now = state.clock.now();
    let db = lock_db(&state)?;
    Ok(Json(bookings::update_booking(&db, now, &id, body)?))
}

// DELETE /api/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_admin(&state, &headers)?;
    let db = lock_db(&state)?;
    bookings::delete_booking(&db, &id)?;
    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/bookings/reference/:reference
pub async fn get_by_reference(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let db = lock_db(&state)?;
    Ok(Json(bookings::get_by_reference(&db, &reference)?))
}

// POST /api/bookings/reference/:reference/cancel
pub async fn cancel_by_reference(
    State(state): State<Arc<AppState>>,
    Path(reference): Path<String>,
) -> Result<Json<Booking>, AppError> {
    let now = state.clock.now();
    let db = lock_db(&state)?;
    Ok(Json(bookings::cancel_by_reference(&db, &state.config, now, &reference)?))
}

// POST /api/bookings/calculate-price
pub async fn calculate_price(
    State(state): State<Arc<AppState>>,
    Json(query): Json<PriceQuery>,
) -> Result<Json<PriceBreakdown>, AppError> {
    let db = lock_db(&state)?;
    Ok(Json(bookings::quote(&db, &query)?))
}
