use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;

/// Rejections from the attendance engine.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceError {
    #[error("Already checked in today")]
    AlreadyCheckedIn,

    #[error("No active check-in found for today")]
    NotCheckedIn,

    #[error("Already checked out today")]
    AlreadyCheckedOut,

    #[error("Invalid attendance status: {0}")]
    InvalidStatus(String),

    #[error("Check-in location rejected: {0}")]
    LocationRejected(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Record store failure, passed through untouched.
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AttendanceError::Store(e) => {
                tracing::error!(error = %e, "Attendance store failure");
                HttpResponse::InternalServerError().json(json!({
                    "message": "Internal Server Error"
                }))
            }
            other => HttpResponse::BadRequest().json(json!({
                "message": other.to_string()
            })),
        }
    }
}
