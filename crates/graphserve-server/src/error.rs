//! Request-boundary error type.
//!
//! Every failure during engine selection, invocation or formatting maps to
//! a generic server error with the message as detail; the process keeps
//! serving. The kinds are explicit so tests (and future status mapping)
//! can tell them apart.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Closed set of request-handling failures.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Engine construction has not completed (or failed).
    #[error("Search engines not initialized")]
    EngineNotReady,

    /// The selected engine's search failed.
    #[error("{0}")]
    Downstream(String),

    /// The request body was structurally valid JSON but unusable.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<graphserve::Error> for ServeError {
    fn from(e: graphserve::Error) -> Self {
        ServeError::Downstream(e.to_string())
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        // The wire contract is a flat 500 with a detail string for every
        // failure kind.
        tracing::error!(error = %self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.to_string() })),
        )
            .into_response()
    }
}
