//! Helios OData demo server
//!
//! Serves `PUT` and `PATCH` on `/{entity_set}/{key}`, answering every update
//! through [`UpdatedResult`] so clients can exercise `Prefer` and
//! `OData-Version` handling without a backing store.

use std::time::Duration;

use axum::{
    Extension, Json, Router,
    extract::Path,
    http::StatusCode,
    response::Response,
    routing::put,
};
use clap::Parser;
use helios_odata::{
    ActionContext, ODataConfig, ODataResult, PreferHeader, UpdatedResult, init_logging,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{debug, info};

/// Echoes the request body back as the updated entity, keyed by the URL.
async fn update_handler(
    Path((entity_set, key)): Path<(String, String)>,
    prefer: PreferHeader,
    context: ActionContext,
    Json(mut entity): Json<Value>,
) -> ODataResult<Response> {
    debug!(
        entity_set = %entity_set,
        key = %key,
        prefer = ?prefer.return_preference().map(|p| p.as_directive()),
        handling = ?prefer.handling(),
        respond_async = prefer.prefer_async(),
        odata = ?prefer.odata_preferences(),
        "Processing update request"
    );

    if let Some(object) = entity.as_object_mut() {
        object
            .entry("id")
            .or_insert_with(|| Value::String(key.clone()));
    }

    UpdatedResult::new(entity).respond(context).await
}

/// Builds the router with tracing and timeout layers.
fn create_app(config: &ODataConfig) -> Router {
    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    Router::new()
        .route("/{entity_set}/{key}", put(update_handler).patch(update_handler))
        .layer(Extension(config.services()))
        .layer(service_builder)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ODataConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        default_version = %config.default_version,
        "Starting OData server"
    );

    let app = create_app(&config);
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
