use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::session::SessionError;

const GENERIC_FAILURE: &str = "Authentication failed. Please try again.";

/// Client-caused callback failures, in gate order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("missing state")]
    MissingState,
    #[error("state mismatch")]
    StateMismatch,
    #[error("missing code")]
    MissingCode,
}

/// Errors surfaced by [`AuthFlowController`](super::AuthFlowController).
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Token exchange or userinfo failed, or the provider was unreachable.
    #[error("upstream error: {0}")]
    Upstream(#[source] crate::Error),

    /// No user in the session.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// HTTP status this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Protocol(_) | Self::Session(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(e) if e.is_transport() => StatusCode::BAD_GATEWAY,
            Self::Upstream(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
        }
    }

    /// Message safe to show the browser: never provider text, never the code.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Protocol(ProtocolError::MissingState | ProtocolError::StateMismatch) => {
                "State verification failed"
            }
            Self::Protocol(ProtocolError::MissingCode) => "No authorization code received",
            Self::Upstream(e) if e.is_transport() => {
                "Authentication provider unavailable. Please try again."
            }
            Self::Upstream(_) | Self::Session(_) => GENERIC_FAILURE,
            Self::NotAuthenticated => "Not authenticated",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Session(ref e) = self {
            tracing::error!(error = %e, "Auth internal error");
        }
        let body = Json(json!({ "detail": self.public_message() }));
        (self.status(), body).into_response()
    }
}

/// Response for a handler that panicked: logged, then reported like any
/// other unclassified failure.
pub(crate) fn panic_response(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Auth handler panicked");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "detail": GENERIC_FAILURE })),
    )
        .into_response()
}
