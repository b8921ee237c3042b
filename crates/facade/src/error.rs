//! HTTP rendering of control-plane errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use control::ControlError;
use tracing::error;

/// A [`ControlError`] on its way out of a handler.
///
/// The body is the serialised error itself, so remote clients reconstruct the
/// exact variant the dispatcher produced.
#[derive(Debug)]
pub struct ApiError(pub ControlError);

impl ApiError {
    /// Returns the HTTP status code for this error.
    ///
    /// - InvalidArgument: 400 Bad Request
    /// - SessionNotFound: 404 Not Found
    /// - Capability: 422 Unprocessable Entity (the request reached the domain
    ///   and the domain refused it)
    /// - LogRotation, Internal: 500 Internal Server Error
    /// - Unavailable: 503 Service Unavailable
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match &self.0 {
            ControlError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            ControlError::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            ControlError::Capability { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ControlError::LogRotation { .. } | ControlError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
            ControlError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ControlError> for ApiError {
    fn from(err: ControlError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self.0, "request failed");
        }
        (status, Json(self.0)).into_response()
    }
}
