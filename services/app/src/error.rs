//! services/app/src/error.rs
//!
//! Defines the primary error type for the entire web service and its mapping
//! onto HTTP responses. Nothing is swallowed at the boundary: every failure
//! that reaches a handler is turned into a status code and a message the
//! browser can show.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::config::ConfigError;
use rainfall_core::ports::PortError;

/// The primary error type for the `app` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service
    /// ports.
    #[error("Service port error: {0}")]
    Port(#[from] PortError),

    /// Represents an error raised by the web framework itself.
    #[error("Web framework error: {0}")]
    Axum(#[from] axum::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network
    /// socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Port(PortError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Port(PortError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Port(PortError::Conflict(_)) => StatusCode::CONFLICT,
            AppError::Port(PortError::Unauthorized) => StatusCode::UNAUTHORIZED,
            // A failing upstream service is the provider's fault, not ours.
            AppError::Port(PortError::Unexpected(_)) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {:?}", self);
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_user_visible_statuses() {
        let cases = [
            (PortError::NotFound("users/u1".into()), StatusCode::NOT_FOUND),
            (
                PortError::Validation("missing photo".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (PortError::Conflict("users/u1".into()), StatusCode::CONFLICT),
            (PortError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                PortError::Unexpected("upstream 500".into()),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (port_error, expected) in cases {
            assert_eq!(AppError::Port(port_error).status(), expected);
        }
    }
}
