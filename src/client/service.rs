use chrono::{DateTime, Local, NaiveDate, TimeZone};

use super::{BookingApi, ClientError};
use crate::models::{
    AdminSession, Booking, BookingStatus, DayAvailability, GameType, NewBooking, PriceBreakdown,
    PriceQuery, Settings, TimeSlot, UpdateBookingRequest,
};

/// Calendar date as seen on the wall clock of `at`'s timezone. Dates sent
/// to the API come from here, never from a UTC conversion.
pub fn local_date<Tz: TimeZone>(at: &DateTime<Tz>) -> NaiveDate {
    at.date_naive()
}

pub fn today() -> NaiveDate {
    local_date(&Local::now())
}

/// Slots for the booking form, with a notice when they could not be
/// loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityView {
    pub date: NaiveDate,
    pub time_slots: Vec<TimeSlot>,
    pub notice: Option<String>,
}

/// Client-facing booking operations. Input is checked locally first, so a
/// `Validation` error never costs a round trip.
pub struct BookingService<A> {
    api: A,
}

impl<A: BookingApi> BookingService<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub async fn create(&self, booking: &NewBooking) -> Result<Booking, ClientError> {
        booking.validate()?;
        if booking.date < today() {
            return Err(ClientError::validation("date: is in the past"));
        }
        self.api.create_booking(booking).await
    }

    pub async fn get_by_reference(&self, reference: &str) -> Result<Booking, ClientError> {
        let reference = normalize_reference(reference)?;
        self.api.get_by_reference(&reference).await
    }

    pub async fn cancel_by_reference(&self, reference: &str) -> Result<Booking, ClientError> {
        let reference = normalize_reference(reference)?;
        self.api.cancel_by_reference(&reference).await
    }

    /// Price preview. The booking stores its own price when created, so a
    /// quote is not a promise.
    pub async fn calculate_price(&self, query: &PriceQuery) -> Result<PriceBreakdown, ClientError> {
        if query.game_type.trim().is_empty() {
            return Err(ClientError::validation("game_type: is required"));
        }
        if query.duration == 0 {
            return Err(ClientError::validation("duration: must be positive"));
        }
        if query.num_people == 0 {
            return Err(ClientError::validation("num_people: must be at least 1"));
        }
        self.api.calculate_price(query).await
    }

    pub async fn availability(
        &self,
        date: NaiveDate,
        game_type: Option<&str>,
        duration: Option<u32>,
    ) -> Result<DayAvailability, ClientError> {
        self.api.availability(date, game_type, duration).await
    }

    /// Like [`availability`](Self::availability), but an unreachable API
    /// yields no slots and a notice instead of an error.
    pub async fn availability_or_notice(
        &self,
        date: NaiveDate,
        game_type: Option<&str>,
        duration: Option<u32>,
    ) -> Result<AvailabilityView, ClientError> {
        match self.api.availability(date, game_type, duration).await {
            Ok(day) => Ok(AvailabilityView {
                date: day.date,
                time_slots: day.time_slots,
                notice: None,
            }),
            Err(err @ ClientError::Transport(_)) => {
                err.report();
                Ok(AvailabilityView {
                    date,
                    time_slots: Vec::new(),
                    notice: Some(
                        "Live availability is unavailable right now. Please try again shortly."
                            .to_string(),
                    ),
                })
            }
            Err(err) => Err(err),
        }
    }

    pub async fn game_types(&self) -> Result<Vec<GameType>, ClientError> {
        self.api.game_types().await
    }

    pub async fn settings(&self) -> Result<Settings, ClientError> {
        self.api.settings().await
    }

    // ── Admin ──

    pub async fn login(&self, password: &str) -> Result<AdminSession, ClientError> {
        if password.is_empty() {
            return Err(ClientError::validation("password: is required"));
        }
        self.api.login(password).await
    }

    pub async fn logout(&self, session: &AdminSession) -> Result<(), ClientError> {
        self.api.logout(&session.token).await
    }

    pub async fn list(
        &self,
        session: &AdminSession,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ClientError> {
        ensure_live(session)?;
        self.api.list_bookings(&session.token, status).await
    }

    pub async fn get(&self, session: &AdminSession, id: &str) -> Result<Booking, ClientError> {
        ensure_live(session)?;
        let id = normalize_id(id)?;
        self.api.get_booking(&session.token, id).await
    }

    /// Requests a status change. Values outside the three statuses are
    /// refused here; whether the move itself is allowed is the server's
    /// call.
    pub async fn update_status(
        &self,
        session: &AdminSession,
        id: &str,
        status: &str,
    ) -> Result<Booking, ClientError> {
        let status = BookingStatus::parse(status)
            .ok_or_else(|| ClientError::InvalidStatus(status.to_string()))?;
        ensure_live(session)?;
        let id = normalize_id(id)?;
        let update = UpdateBookingRequest {
            status: Some(status.as_str().to_string()),
            special_requests: None,
        };
        self.api.update_booking(&session.token, id, &update).await
    }

    pub async fn update_special_requests(
        &self,
        session: &AdminSession,
        id: &str,
        special_requests: &str,
    ) -> Result<Booking, ClientError> {
        ensure_live(session)?;
        let id = normalize_id(id)?;
        let update = UpdateBookingRequest {
            status: None,
            special_requests: Some(special_requests.to_string()),
        };
        self.api.update_booking(&session.token, id, &update).await
    }

    pub async fn delete(&self, session: &AdminSession, id: &str) -> Result<(), ClientError> {
        ensure_live(session)?;
        let id = normalize_id(id)?;
        self.api.delete_booking(&session.token, id).await
    }
}

fn ensure_live(session: &AdminSession) -> Result<(), ClientError> {
    if session.is_expired(Local::now().naive_local()) {
        return Err(ClientError::Unauthorized(
            "admin session expired".to_string(),
        ));
    }
    Ok(())
}

fn normalize_reference(reference: &str) -> Result<String, ClientError> {
    let reference = reference.trim().to_uppercase();
    if reference.is_empty() {
        return Err(ClientError::validation("reference_number: is required"));
    }
    if !reference.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ClientError::validation(
            "reference_number: may only contain letters and digits",
        ));
    }
    Ok(reference)
}

fn normalize_id(id: &str) -> Result<&str, ClientError> {
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ClientError::validation("id: is not a booking id"));
    }
    Ok(id)
}
