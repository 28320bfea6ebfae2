use crate::{models::drs::ErrorBody, services::drs_service::DrsError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            msg: self.message,
            status_code: self.status.as_u16(),
        });

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

/// Default mapping used by the metadata route. The access route remaps
/// `ObjectNotFound` to 400 itself.
impl From<DrsError> for AppError {
    fn from(err: DrsError) -> Self {
        match err {
            DrsError::ObjectNotFound(_) => {
                AppError::not_found("The requested 'DrsObject' wasn't found")
            }
            DrsError::UnsupportedAccessMethod(_) => {
                AppError::bad_request("The requested access method does not exist")
            }
            DrsError::ObjectAlreadyExists(id) => {
                AppError::new(StatusCode::CONFLICT, format!("object `{}` already exists", id))
            }
            other => {
                tracing::error!(error = %other, "request failed");
                AppError::internal(other.to_string())
            }
        }
    }
}
