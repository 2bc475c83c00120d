use std::env;

use crate::models::BookingStatus;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_password: String,
    pub admin_session_ttl_minutes: i64,
    /// Status given to new bookings: `Pending` waits for admin approval,
    /// `Confirmed` auto-accepts.
    pub initial_status: BookingStatus,
    pub cancellation_cutoff_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8001),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "lounge.db".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string()),
            admin_session_ttl_minutes: env::var("ADMIN_SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(480),
            initial_status: parse_initial_status(
                &env::var("BOOKING_INITIAL_STATUS").unwrap_or_default(),
            ),
            cancellation_cutoff_minutes: env::var("CANCELLATION_CUTOFF_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

fn parse_initial_status(raw: &str) -> BookingStatus {
    match BookingStatus::parse(raw) {
        Some(BookingStatus::Confirmed) => BookingStatus::Confirmed,
        Some(BookingStatus::Pending) => BookingStatus::Pending,
        _ => {
            if !raw.is_empty() {
                tracing::warn!(value = raw, "unsupported BOOKING_INITIAL_STATUS, using pending");
            }
            BookingStatus::Pending
        }
    }
}
