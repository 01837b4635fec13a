//! Error types for OData result execution.
//!
//! Every failure surfaced by this crate is an [`ODataError`]. Errors raised
//! by a [`BodyFormatter`](crate::format::BodyFormatter) are returned to the
//! caller as-is, so upstream error handlers see exactly what the formatter
//! produced.
//!
//! # Error Mapping
//!
//! When rendered with [`IntoResponse`], errors become OData JSON error
//! payloads:
//!
//! | Error | HTTP Status | OData error code |
//! |-------|-------------|------------------|
//! | ArgumentNull | 500 | ArgumentNull |
//! | ResponseStarted | 500 | ResponseStarted |
//! | NotAcceptable | 406 | NotAcceptable |
//! | InvalidVersion | 400 | InvalidVersion |
//! | Serialization | 500 | SerializationError |
//! | Transport | 500 | TransportError |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// The primary error type for OData result operations.
#[derive(Error, Debug)]
pub enum ODataError {
    /// A required argument (the entity or the execution context) was missing.
    #[error("value cannot be null: {param}")]
    ArgumentNull {
        /// Name of the missing argument.
        param: &'static str,
    },

    /// The response body was already committed when execution started.
    #[error("response has already started; status and body can no longer be written")]
    ResponseStarted,

    /// The client's Accept header rules out every format we can write.
    #[error("not acceptable: {message}")]
    NotAcceptable {
        /// Description of the rejected media range.
        message: String,
    },

    /// A protocol version token could not be parsed.
    #[error("invalid OData version: {value}")]
    InvalidVersion {
        /// The offending token.
        value: String,
    },

    /// The entity could not be serialized to JSON.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// The body could not be written to the response channel.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

/// Result alias used throughout the crate.
pub type ODataResult<T> = Result<T, ODataError>;

impl ODataError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ODataError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            ODataError::InvalidVersion { .. } => StatusCode::BAD_REQUEST,
            ODataError::ArgumentNull { .. }
            | ODataError::ResponseStarted
            | ODataError::Serialization(_)
            | ODataError::Transport { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the OData error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            ODataError::ArgumentNull { .. } => "ArgumentNull",
            ODataError::ResponseStarted => "ResponseStarted",
            ODataError::NotAcceptable { .. } => "NotAcceptable",
            ODataError::InvalidVersion { .. } => "InvalidVersion",
            ODataError::Serialization(_) => "SerializationError",
            ODataError::Transport { .. } => "TransportError",
        }
    }
}

impl IntoResponse for ODataError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = create_odata_error(self.code(), &self.to_string());
        (status, Json(body)).into_response()
    }
}

/// Creates an OData JSON error payload.
///
/// # Arguments
///
/// * `code` - Service-defined error code
/// * `message` - Human-readable message
fn create_odata_error(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}
