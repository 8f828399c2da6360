//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** Internal errors (Database, Internal) are logged with
//! full detail but only a generic message is returned to the caller so that
//! file paths, SQL, or other implementation details never leak to clients.
//! Share-tool output is the exception: it is the operator-facing diagnostic
//! the API exists to surface, so it is returned verbatim.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::engine::EngineError;

/// All errors that can occur in the shareward request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the access synchronization engine.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Propagated from the SQLite (or other) store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with existing state (duplicate browse path).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m) => error_body(StatusCode::NOT_FOUND, &m),
            ServerError::BadRequest(m) => error_body(StatusCode::BAD_REQUEST, &m),
            ServerError::Conflict(m) => error_body(StatusCode::CONFLICT, &m),

            ServerError::Engine(e) => engine_response(e),

            // Internal errors: log the full detail, return a generic message.
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
            }
        }
    }
}

fn engine_response(e: EngineError) -> Response {
    match e {
        EngineError::Validation(m) => error_body(StatusCode::BAD_REQUEST, &m),
        EngineError::NotFound(m) => error_body(StatusCode::NOT_FOUND, &m),
        EngineError::ShareFailed { output, exit_code } => {
            let body = json!({
                "message": "share operation failed",
                "output": output,
                "error": match exit_code {
                    Some(code) => format!("share command exited with code {code}"),
                    None => "share command did not run to completion".to_owned(),
                },
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        // The OS operation succeeded but the state write failed: persisted
        // state now disagrees with the real share state. Surfaced with a
        // distinct body so callers can reconcile manually.
        EngineError::PartialSuccess { output, source } => {
            error!(error = %source, "state write failed after successful share operation");
            let body = json!({
                "message": "share operation succeeded but its state was not recorded",
                "state": "partial",
                "output": output,
                "error": "storage failure after the OS operation; re-check and re-sync this directory",
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
        EngineError::Storage(e) => {
            error!(error = %e, "storage error");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        // Log the full error chain before discarding it so that diagnostic
        // detail is preserved in the server logs even though clients only
        // see a generic message.
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}
