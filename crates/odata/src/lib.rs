//! # helios-odata - OData update results
//!
//! This crate shapes the HTTP response to an OData data-update request
//! (`PUT`, `PATCH`, `MERGE`). Given the entity a handler just updated, it
//! honors the client's `Prefer` header and stamps the protocol version:
//!
//! | Request `Prefer` | Status | Body |
//! |------------------|--------|------|
//! | `return=representation` | 200 | Updated entity (OData JSON) |
//! | `return=minimal` | 204 | Empty |
//! | absent, malformed, or contradictory | 204 | Empty |
//!
//! Every successful response carries `OData-Version`, derived from the
//! request's `OData-MaxVersion` / `OData-Version` headers and added only
//! after the body has been written.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{Extension, Json, Router, response::Response, routing::patch};
//! use helios_odata::{ActionContext, ODataConfig, ODataResult, UpdatedResult};
//!
//! async fn patch_customer(context: ActionContext, Json(customer): Json<Customer>) -> ODataResult<Response> {
//!     UpdatedResult::new(customer).respond(context).await
//! }
//!
//! let config = ODataConfig::default();
//! let app = Router::new()
//!     .route("/Customers/{id}", patch(patch_customer))
//!     .layer(Extension(config.services()));
//! ```
//!
//! ## Architecture
//!
//! - [`error`] - Error types and OData error payloads
//! - [`config`] - Service configuration
//! - [`context`] - Per-request execution context and response channel
//! - [`preference`] - Prefer header parsing
//! - [`version`] - Protocol version negotiation
//! - [`headers`] - Response header composition
//! - [`format`] - Body formatting and content negotiation
//! - [`results`] - Action results, including [`UpdatedResult`]

// Enforce documentation
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod format;
pub mod headers;
pub mod preference;
pub mod results;
pub mod version;

// Re-export commonly used types
pub use config::ODataConfig;
pub use context::{ActionContext, ODataServices, RequestHead, ResponseChannel};
pub use error::{ODataError, ODataResult};
pub use format::{BodyFormatter, JsonFormatter};
pub use preference::{PreferHeader, ReturnPreference, request_prefers_return_content};
pub use results::{ActionResult, ResponseShape, UpdatedResult};
pub use version::ODataVersion;

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup.
///
/// # Arguments
///
/// * `level` - The log level (error, warn, info, debug, trace)
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helios_odata={},tower_http=debug", level)));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
