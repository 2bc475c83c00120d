use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::{CancelRefusal, InvalidTransition, ValidationErrors};
use crate::services::availability::SchedulingError;
use crate::services::pricing::PricingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),

    #[error("{0}")]
    Validation(String),

    #[error("invalid booking details: {0}")]
    InvalidFields(ValidationErrors),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    SlotUnavailable(String),

    #[error("{0}")]
    CancellationWindow(String),

    #[error("{0}")]
    AlreadyCancelled(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl AppError {
    /// Machine-readable code carried in the `error` field of the response.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Internal(_) => "internal",
            AppError::Validation(_) | AppError::InvalidFields(_) => "validation",
            AppError::InvalidStatus(_) => "invalid_status",
            AppError::InvalidTransition(_) => "invalid_transition",
            AppError::NotFound(_) => "not_found",
            AppError::SlotUnavailable(_) => "slot_unavailable",
            AppError::CancellationWindow(_) => "cancellation_window",
            AppError::AlreadyCancelled(_) => "already_cancelled",
            AppError::Unauthorized => "unauthorized",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::InvalidFields(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidTransition(_)
            | AppError::SlotUnavailable(_)
            | AppError::CancellationWindow(_)
            | AppError::AlreadyCancelled(_) => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<CancelRefusal> for AppError {
    fn from(refusal: CancelRefusal) -> Self {
        match refusal {
            CancelRefusal::AlreadyCancelled => AppError::AlreadyCancelled(refusal.to_string()),
            CancelRefusal::SessionStarted | CancelRefusal::InsideWindow { .. } => {
                AppError::CancellationWindow(refusal.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::InvalidFields(errors)
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Database(e) => AppError::Internal(e),
            SchedulingError::SlotStarted { .. }
            | SchedulingError::PastClosing { .. }
            | SchedulingError::Conflict { .. } => AppError::SlotUnavailable(err.to_string()),
            SchedulingError::PastDate(_)
            | SchedulingError::UnknownGameType(_)
            | SchedulingError::GameUnavailable(_)
            | SchedulingError::UnknownSlot { .. } => AppError::Validation(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Database(_) | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({ "error": self.code(), "detail": detail });
        if let AppError::InvalidFields(errors) = &self {
            body["fields"] = serde_json::to_value(&errors.0).unwrap_or_default();
        }
        (status, axum::Json(body)).into_response()
    }
}
