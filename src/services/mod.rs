pub mod auth;
pub mod availability;
pub mod bookings;
pub mod clock;
pub mod pricing;
