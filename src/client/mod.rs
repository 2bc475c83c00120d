//! Client side of the booking API: the calls the booking form, the
//! cancellation page and the admin dashboard make.

pub mod admin;
pub mod error;
pub mod http;
pub mod service;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{
    AdminSession, Booking, BookingStatus, DayAvailability, GameType, NewBooking, PriceBreakdown,
    PriceQuery, Settings, UpdateBookingRequest,
};

pub use admin::{AdminSnapshot, AdminView, RefreshHandle};
pub use error::ClientError;
pub use http::{ClientConfig, HttpBookingApi};
pub use service::{local_date, today, AvailabilityView, BookingService};

/// The REST endpoints the client depends on. Admin calls take the bearer
/// token of an [`AdminSession`].
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn create_booking(&self, booking: &NewBooking) -> Result<Booking, ClientError>;

    async fn get_by_reference(&self, reference: &str) -> Result<Booking, ClientError>;

    async fn cancel_by_reference(&self, reference: &str) -> Result<Booking, ClientError>;

    async fn calculate_price(&self, query: &PriceQuery) -> Result<PriceBreakdown, ClientError>;

    async fn availability(
        &self,
        date: NaiveDate,
        game_type: Option<&str>,
        duration: Option<u32>,
    ) -> Result<DayAvailability, ClientError>;

    async fn game_types(&self) -> Result<Vec<GameType>, ClientError>;

    async fn settings(&self) -> Result<Settings, ClientError>;

    async fn login(&self, password: &str) -> Result<AdminSession, ClientError>;

    async fn logout(&self, token: &str) -> Result<(), ClientError>;

    async fn list_bookings(
        &self,
        token: &str,
        status: Option<BookingStatus>,
    ) -> Result<Vec<Booking>, ClientError>;

    async fn get_booking(&self, token: &str, id: &str) -> Result<Booking, ClientError>;

    async fn update_booking(
        &self,
        token: &str,
        id: &str,
        update: &UpdateBookingRequest,
    ) -> Result<Booking, ClientError>;

    async fn delete_booking(&self, token: &str, id: &str) -> Result<(), ClientError>;
}
