use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use shared::ProtocolError;

/// Server-level error kinds, realizing the five categories a socket or
/// registry operation can fail with. `ProtocolError` wraps the wire-codec
/// failures from `shared`; the rest are specific to room/session management.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("fatal error: {0}")]
    Fatal(String),
}

impl ServerError {
    /// A short machine-readable reason string, used both as a `join_failed`
    /// payload and as a WebSocket close reason.
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Protocol(_) => StatusCode::BAD_REQUEST,
            ServerError::Authorization(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.reason()).into_response()
    }
}
