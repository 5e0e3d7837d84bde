//! API error handling
//!
//! Wraps [`HamletError`] for axum. The response body carries the stable
//! machine code, the human message, and the structured error itself so
//! clients can rebuild the exact variant.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use hamlet_types::{ErrorBody, HamletError};

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Transparent wrapper giving [`HamletError`] an HTTP shape.
#[derive(Debug)]
pub struct ApiError(pub HamletError);

impl From<HamletError> for ApiError {
    fn from(err: HamletError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            HamletError::Validation { .. } => StatusCode::BAD_REQUEST,
            HamletError::NotFound { .. } => StatusCode::NOT_FOUND,
            HamletError::Unreachable { .. } => StatusCode::BAD_GATEWAY,
            // Everything else is a well-formed request the current state
            // rejects.
            HamletError::InsufficientResource { .. }
            | HamletError::AlreadyActed { .. }
            | HamletError::AlreadySlept
            | HamletError::NoShelter
            | HamletError::NoFood
            | HamletError::InvalidState { .. } => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.error_code().to_string(),
            message: self.0.to_string(),
            error: Some(self.0.clone()),
        };
        (self.status(), Json(body)).into_response()
    }
}
