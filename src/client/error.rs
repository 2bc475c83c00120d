use serde::Deserialize;

use crate::models::{FieldError, ValidationErrors};

/// Failures surfaced to booking and admin screens. Everything except
/// `Transport` is an expected outcome that the user can act on.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    #[error("{message}")]
    Validation {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    CancellationWindow(String),

    #[error("{0}")]
    AlreadyCancelled(String),

    #[error("{0}")]
    SlotUnavailable(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    detail: String,
    #[serde(default)]
    fields: Vec<FieldError>,
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Maps a non-2xx API response to an error, preferring the
    /// machine-readable code in the body over the status.
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
        let detail = parsed
            .as_ref()
            .map(|b| b.detail.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}: {}", body.trim()));

        match parsed.as_ref().map(|b| b.error.as_str()) {
            Some("validation") => ClientError::Validation {
                message: detail,
                fields: parsed.map(|b| b.fields).unwrap_or_default(),
            },
            Some("not_found") => ClientError::NotFound(detail),
            Some("cancellation_window") => ClientError::CancellationWindow(detail),
            Some("already_cancelled") => ClientError::AlreadyCancelled(detail),
            Some("slot_unavailable") => ClientError::SlotUnavailable(detail),
            Some("invalid_status") => ClientError::InvalidStatus(detail),
            Some("invalid_transition") => ClientError::InvalidTransition(detail),
            Some("unauthorized") => ClientError::Unauthorized(detail),
            _ => match status {
                401 | 403 => ClientError::Unauthorized(detail),
                404 => ClientError::NotFound(detail),
                400..=499 => ClientError::validation(detail),
                _ => ClientError::Transport(detail),
            },
        }
    }

    /// Only transport failures are worth retrying unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation { message, .. } => {
                format!("Please check your details: {message}")
            }
            ClientError::NotFound(_) => {
                "We couldn't find that booking. Please check your reference number.".to_string()
            }
            ClientError::CancellationWindow(detail) => detail.clone(),
            ClientError::AlreadyCancelled(_) => "This booking has already been cancelled.".to_string(),
            ClientError::SlotUnavailable(_) => {
                "Sorry, that time slot was just taken. Please pick a different slot.".to_string()
            }
            ClientError::InvalidStatus(status) => {
                format!("\"{status}\" is not a booking status.")
            }
            ClientError::InvalidTransition(detail) => detail.clone(),
            ClientError::Unauthorized(_) => {
                "Your admin session has ended. Please log in again.".to_string()
            }
            ClientError::Transport(_) => {
                "We couldn't reach the booking service. Please try again.".to_string()
            }
        }
    }

    /// Logs the error at a level matching its category.
    pub fn report(&self) {
        match self {
            ClientError::Transport(detail) => {
                tracing::error!(error = %detail, "booking service unreachable")
            }
            ClientError::InvalidStatus(status) => {
                tracing::error!(status = %status, "invalid booking status requested")
            }
            other => tracing::debug!(error = %other, "booking request refused"),
        }
    }
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        ClientError::Validation {
            message: errors.to_string(),
            fields: errors.0,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_decode() {
            "unreadable response"
        } else {
            "request failed"
        };
        ClientError::Transport(format!("{kind}: {err}"))
    }
}
