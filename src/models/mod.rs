pub mod availability;
pub mod booking;
pub mod game_type;
pub mod pricing;
pub mod session;
pub mod settings;

pub use availability::{DayAvailability, Schedule, TimeSlot};
pub use booking::{
    Booking, BookingStatus, CancelRefusal, CreateBookingRequest, FieldError, InvalidTransition,
    NewBooking, StatusCounts, Transition, UpdateBookingRequest, ValidationErrors,
};
pub use game_type::GameType;
pub use pricing::{PriceBreakdown, PriceQuery};
pub use session::{AdminSession, LoginRequest};
pub use settings::{ContactInfo, GameRate, PricingConfig, Settings};
