use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use super::lock_db;
use crate::errors::AppError;
use crate::models::DayAvailability;
use crate::services::bookings;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub game_type: Option<String>,
    /// Minutes.
    pub duration: Option<u32>,
}

// GET /api/availability/:date
pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path(raw_date): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<DayAvailability>, AppError> {
    let date = NaiveDate::parse_from_str(raw_date.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date {raw_date:?}, expected YYYY-MM-DD")))?;
    if query.duration == Some(0) {
        return Err(AppError::Validation("duration must be positive".to_string()));
    }

    let now = state.clock.now();
    let game_type = query.game_type.as_deref().map(str::trim).filter(|g| !g.is_empty());
    let db = lock_db(&state)?;
    let day = bookings::availability_on(&db, date, now, game_type, query.duration)?;
    Ok(Json(day))
}
