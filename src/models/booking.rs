use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::availability::parse_slot_label;
use super::pricing::{default_duration, default_people};

pub const REFERENCE_PREFIX: &str = "KGG";
const REFERENCE_SUFFIX_LEN: usize = 6;
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub reference_number: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub game_type: String,
    pub date: NaiveDate,
    pub time_slot: String,
    /// Minutes.
    pub duration: u32,
    pub num_people: u32,
    pub special_requests: Option<String>,
    pub price: f64,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Booking {
    pub fn session_start(&self) -> NaiveDateTime {
        // Slot labels are validated on creation; a legacy row with an
        // unreadable label is treated as starting at midnight.
        let time = parse_slot_label(&self.time_slot).unwrap_or(NaiveTime::MIN);
        self.date.and_time(time)
    }

    pub fn session_end(&self) -> NaiveDateTime {
        self.session_start() + Duration::minutes(self.duration as i64)
    }

    pub fn occupies(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.status != BookingStatus::Cancelled
            && self.session_start() < end
            && self.session_end() > start
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot move a {from} booking to {to}")]
pub struct InvalidTransition {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 3] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Checks a move to `target`. Re-applying the current status is
    /// `Unchanged` and must not be written.
    pub fn transition(self, target: BookingStatus) -> Result<Transition, InvalidTransition> {
        use BookingStatus::*;
        match (self, target) {
            (from, to) if from == to => Ok(Transition::Unchanged),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Cancelled) => {
                Ok(Transition::Applied)
            }
            // explicit admin reactivation
            (Cancelled, Confirmed) => Ok(Transition::Applied),
            (from, to) => Err(InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
        .collect();
    format!("{REFERENCE_PREFIX}{suffix}")
}

pub fn is_valid_reference(s: &str) -> bool {
    s.strip_prefix(REFERENCE_PREFIX)
        .map(|suffix| {
            suffix.len() >= REFERENCE_SUFFIX_LEN
                && suffix
                    .bytes()
                    .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub cancelled: i64,
}

impl StatusCounts {
    pub fn tally<'a>(bookings: impl IntoIterator<Item = &'a Booking>) -> Self {
        let mut counts = StatusCounts::default();
        for booking in bookings {
            counts.add(booking.status, 1);
        }
        counts
    }

    pub fn add(&mut self, status: BookingStatus, n: i64) {
        self.total += n;
        match status {
            BookingStatus::Pending => self.pending += n,
            BookingStatus::Confirmed => self.confirmed += n,
            BookingStatus::Cancelled => self.cancelled += n,
        }
    }
}

// ── Self-cancellation ──

#[derive(Debug, Clone, PartialEq)]
pub enum CancelRefusal {
    AlreadyCancelled,
    SessionStarted,
    InsideWindow { cutoff_minutes: i64 },
}

impl fmt::Display for CancelRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelRefusal::AlreadyCancelled => write!(f, "This booking has already been cancelled."),
            CancelRefusal::SessionStarted => write!(
                f,
                "This session has already started or passed and can no longer be cancelled."
            ),
            CancelRefusal::InsideWindow { cutoff_minutes } => write!(
                f,
                "Cancellations must be made more than {} before the session.",
                describe_minutes(*cutoff_minutes)
            ),
        }
    }
}

fn describe_minutes(minutes: i64) -> String {
    match minutes {
        60 => "1 hour".to_string(),
        m if m % 60 == 0 => format!("{} hours", m / 60),
        m => format!("{m} minutes"),
    }
}

/// A customer may cancel only while the session start is strictly more than
/// `cutoff` away from `now`.
pub fn check_self_cancellation(
    booking: &Booking,
    now: NaiveDateTime,
    cutoff: Duration,
) -> Result<(), CancelRefusal> {
    if booking.status == BookingStatus::Cancelled {
        return Err(CancelRefusal::AlreadyCancelled);
    }
    let start = booking.session_start();
    if start <= now {
        return Err(CancelRefusal::SessionStarted);
    }
    if start - now <= cutoff {
        return Err(CancelRefusal::InsideWindow {
            cutoff_minutes: cutoff.num_minutes(),
        });
    }
    Ok(())
}

// ── Creation input ──

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.field.as_str()).collect()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// A booking request in canonical units (duration in minutes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBooking {
    pub name: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub game_type: String,
    pub date: NaiveDate,
    pub time_slot: String,
    pub duration: u32,
    pub num_people: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

impl NewBooking {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if self.name.trim().is_empty() {
            errors.push("name", "is required");
        }
        if self.phone.trim().is_empty() {
            errors.push("phone", "is required");
        }
        if let Some(email) = self.email.as_deref() {
            if !email.trim().is_empty() && !is_plausible_email(email) {
                errors.push("email", "is not a valid email address");
            }
        }
        if self.game_type.trim().is_empty() {
            errors.push("game_type", "is required");
        }
        if self.time_slot.trim().is_empty() {
            errors.push("time_slot", "is required");
        } else if parse_slot_label(&self.time_slot).is_none() {
            errors.push("time_slot", "is not a recognised time");
        }
        if self.duration == 0 {
            errors.push("duration", "must be positive");
        }
        if self.num_people == 0 {
            errors.push("num_people", "must be at least 1");
        }
        errors.into_result()
    }

    pub fn session_start(&self) -> Option<NaiveDateTime> {
        parse_slot_label(&self.time_slot).map(|t| self.date.and_time(t))
    }
}

/// Booking payload as it arrives over HTTP. Older clients send
/// `group_size` or `duration_hours`; both are converted here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBookingRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub game_type: Option<String>,
    pub date: Option<String>,
    pub time_slot: Option<String>,
    pub duration: Option<u32>,
    pub duration_hours: Option<u32>,
    #[serde(alias = "group_size")]
    pub num_people: Option<u32>,
    pub special_requests: Option<String>,
}

impl CreateBookingRequest {
    pub fn normalize(self) -> Result<NewBooking, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let date = match self.date.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push("date", "is required");
                None
            }
            Some(raw) => {
                // Accept a plain date or the date part of an ISO timestamp.
                let day = raw.get(..10).unwrap_or(raw);
                match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
                    Ok(d) => Some(d),
                    Err(_) => {
                        errors.push("date", "must be formatted as YYYY-MM-DD");
                        None
                    }
                }
            }
        };

        let hours_in_minutes = self.duration_hours.map(|hours| hours.checked_mul(60));
        let duration = match (self.duration, hours_in_minutes) {
            (_, Some(None)) => {
                errors.push("duration_hours", "is too large");
                self.duration.unwrap_or_else(default_duration)
            }
            (Some(minutes), Some(Some(converted))) if minutes != converted => {
                errors.push("duration", "conflicts with duration_hours");
                minutes
            }
            (Some(minutes), _) => minutes,
            (None, Some(Some(converted))) => converted,
            (None, None) => default_duration(),
        };

        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());
        let special_requests = self
            .special_requests
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let booking = NewBooking {
            name: self.name.unwrap_or_default().trim().to_string(),
            phone: self.phone.unwrap_or_default().trim().to_string(),
            email,
            game_type: self.game_type.unwrap_or_default().trim().to_string(),
            date: date.unwrap_or(NaiveDate::MIN),
            time_slot: self.time_slot.unwrap_or_default().trim().to_string(),
            duration,
            num_people: self.num_people.unwrap_or_else(default_people),
            special_requests,
        };

        if let Err(more) = booking.validate() {
            errors.0.extend(more.0);
        }
        errors.into_result().map(|_| booking)
    }
}

/// Partial update sent by the admin. `status` stays a raw string so an
/// unknown value can be reported as such.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateBookingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_requests: Option<String>,
}

pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|part| !part.is_empty())
}
