use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::TimeWindow;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),

    #[error("{0}")]
    Booking(#[from] BookingError),

    #[error("AI provider error: {0}")]
    Ai(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Booking(e) => e.status_code(),
            AppError::Ai(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        };

        let mut body = serde_json::json!({ "error": self.to_string() });
        if let AppError::Booking(
            BookingError::Conflict { alternatives }
            | BookingError::OutsideAvailability { alternatives }
            | BookingError::PastTime { alternatives, .. },
        ) = &self
        {
            body["alternatives"] = serde_json::json!(alternatives);
        }
        if let AppError::Booking(BookingError::IncompleteRequest { missing }) = &self {
            body["missing"] = serde_json::json!(missing);
        }
        (status, axum::Json(body)).into_response()
    }
}

/// Failures of the scheduling protocol. `Display` is written for the patient.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Sorry, that slot is no longer available.{}", describe_alternatives(.alternatives))]
    Conflict { alternatives: Vec<TimeWindow> },

    #[error("That time is not within the doctor's schedule.{}", describe_alternatives(.alternatives))]
    OutsideAvailability { alternatives: Vec<TimeWindow> },

    #[error("I couldn't find an appointment with id {0}.")]
    NotFound(String),

    #[error("I couldn't find a doctor with id {0}.")]
    DoctorNotFound(i64),

    #[error("The name and phone number don't match that appointment.")]
    IdentityMismatch,

    #[error("To book I still need your {}.", .missing.join(", "))]
    IncompleteRequest { missing: Vec<&'static str> },

    #[error("Could you give me a specific date (YYYY-MM-DD) instead of \"{0}\"?")]
    AmbiguousDate(String),

    #[error("Could you give me a specific time like 09:30 instead of \"{0}\"?")]
    AmbiguousTime(String),

    #[error("{0} is in the past. Please choose a future date.")]
    PastDate(chrono::NaiveDate),

    #[error("{} today has already passed.{}", .time.format("%H:%M"), describe_alternatives(.alternatives))]
    PastTime {
        time: chrono::NaiveTime,
        alternatives: Vec<TimeWindow>,
    },

    #[error("storage unavailable: {0}")]
    Storage(#[from] anyhow::Error),
}

impl BookingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Conflict { .. } => StatusCode::CONFLICT,
            BookingError::NotFound(_) | BookingError::DoctorNotFound(_) => StatusCode::NOT_FOUND,
            BookingError::IdentityMismatch => StatusCode::FORBIDDEN,
            BookingError::IncompleteRequest { .. }
            | BookingError::AmbiguousDate(_)
            | BookingError::AmbiguousTime(_)
            | BookingError::PastDate(_)
            | BookingError::PastTime { .. }
            | BookingError::OutsideAvailability { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Storage failures abort the turn; everything else is a reply to the patient.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BookingError::Storage(_))
    }
}

impl From<rusqlite::Error> for BookingError {
    fn from(e: rusqlite::Error) -> Self {
        BookingError::Storage(e.into())
    }
}

fn describe_alternatives(alternatives: &[TimeWindow]) -> String {
    if alternatives.is_empty() {
        return " There are no other open times that day.".to_string();
    }
    let windows = alternatives
        .iter()
        .map(TimeWindow::describe)
        .collect::<Vec<_>>()
        .join("; ");
    format!(" Open times: {windows}")
}
