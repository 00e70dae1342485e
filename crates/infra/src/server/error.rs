//! HTTP mapping of gateway errors

use authgate_domain::AuthGateError;
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

/// Status code for an error on a JSON route
#[must_use]
pub fn status_for(error: &AuthGateError) -> StatusCode {
    match error {
        AuthGateError::NotAuthenticated => StatusCode::FOUND,
        AuthGateError::NotFound(_) => StatusCode::NOT_FOUND,
        AuthGateError::InvalidInput(_)
        | AuthGateError::InvalidState(_)
        | AuthGateError::DuplicateState(_)
        | AuthGateError::AuthorizationFailed(_)
        | AuthGateError::ExchangeFailed(_) => StatusCode::BAD_REQUEST,
        AuthGateError::Network(_) | AuthGateError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        AuthGateError::Config(_) | AuthGateError::Internal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON error response
///
/// `NotAuthenticated` becomes the "go authenticate" signal: `302` with
/// `Location: /`. Everything else is `{"detail": ...}` with [`status_for`].
#[derive(Debug)]
pub struct ApiError(pub AuthGateError);

impl From<AuthGateError> for ApiError {
    fn from(value: AuthGateError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self.0, AuthGateError::NotAuthenticated) {
            return (StatusCode::FOUND, [(LOCATION, "/")]).into_response();
        }

        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(reason = self.0.label(), error = %self.0, "request failed");
        } else {
            debug!(reason = self.0.label(), error = %self.0, "request rejected");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}
