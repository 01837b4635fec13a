//! Per-request execution context.
//!
//! An [`ActionContext`] bundles what an action result needs to run: the
//! request head it reads from, the [`ResponseChannel`] it writes to, and the
//! shared [`ODataServices`]. Handlers obtain one through the axum extractor
//! and turn it back into a response once the result has executed.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{Json, response::Response};
//! use helios_odata::{ActionContext, ActionResult, ODataResult, UpdatedResult};
//!
//! async fn update(mut context: ActionContext, Json(customer): Json<Customer>) -> ODataResult<Response> {
//!     UpdatedResult::new(customer).execute_result(&mut context).await?;
//!     Ok(context.into_response())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::FromRequestParts,
    http::{HeaderMap, Method, StatusCode, Uri, request::Parts},
    response::Response,
};
use bytes::Bytes;

use crate::error::{ODataError, ODataResult};
use crate::format::{BodyFormatter, JsonFormatter};
use crate::version::ODataVersion;

/// Shared collaborators for executing results.
///
/// Install with `axum::Extension(services)`; requests without the extension
/// use [`ODataServices::default`].
#[derive(Clone)]
pub struct ODataServices {
    formatter: Arc<dyn BodyFormatter>,
    default_version: ODataVersion,
}

impl ODataServices {
    /// Creates services with the given formatter and default version.
    pub fn new(formatter: Arc<dyn BodyFormatter>, default_version: ODataVersion) -> Self {
        Self {
            formatter,
            default_version,
        }
    }

    /// Returns a copy using `formatter` for response bodies.
    pub fn with_formatter(mut self, formatter: Arc<dyn BodyFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Returns a copy using `version` when the request names none.
    pub fn with_default_version(mut self, version: ODataVersion) -> Self {
        self.default_version = version;
        self
    }

    /// Returns the body formatter.
    pub fn formatter(&self) -> Arc<dyn BodyFormatter> {
        Arc::clone(&self.formatter)
    }

    /// Returns the default protocol version.
    pub fn default_version(&self) -> ODataVersion {
        self.default_version
    }
}

impl Default for ODataServices {
    fn default() -> Self {
        Self::new(Arc::new(JsonFormatter), ODataVersion::default())
    }
}

impl fmt::Debug for ODataServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ODataServices")
            .field("default_version", &self.default_version)
            .finish_non_exhaustive()
    }
}

/// The parts of the inbound request an action result reads.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
}

impl RequestHead {
    /// Creates a request head.
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
        }
    }

    /// Copies the head out of axum request parts.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::new(parts.method.clone(), parts.uri.clone(), parts.headers.clone())
    }

    /// Returns the request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// Buffered response under construction.
///
/// Status and body are written once through [`commit`](Self::commit).
/// Headers stay mutable after the commit; nothing reaches the wire until
/// [`into_response`](Self::into_response).
#[derive(Debug)]
pub struct ResponseChannel {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    committed: bool,
}

impl ResponseChannel {
    /// Creates an open channel with status 200 and no headers.
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            committed: false,
        }
    }

    /// Fails with [`ODataError::ResponseStarted`] once the body is committed.
    pub fn ensure_open(&self) -> ODataResult<()> {
        if self.is_committed() {
            Err(ODataError::ResponseStarted)
        } else {
            Ok(())
        }
    }

    /// Writes the status code and body.
    pub fn commit(&mut self, status: StatusCode, body: Bytes) -> ODataResult<()> {
        self.ensure_open()?;
        self.status = status;
        self.body = body;
        self.committed = true;
        Ok(())
    }

    /// Returns whether the body has been committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Returns the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response headers for mutation.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns the committed body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Converts the channel into an axum response.
    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl Default for ResponseChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution context for one request.
#[derive(Debug)]
pub struct ActionContext {
    request: RequestHead,
    response: ResponseChannel,
    services: ODataServices,
}

impl ActionContext {
    /// Creates a context with a fresh response channel.
    pub fn new(request: RequestHead, services: ODataServices) -> Self {
        Self {
            request,
            response: ResponseChannel::new(),
            services,
        }
    }

    /// Returns the request head.
    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    /// Returns the response channel.
    pub fn response(&self) -> &ResponseChannel {
        &self.response
    }

    /// Returns the response channel for mutation.
    pub fn response_mut(&mut self) -> &mut ResponseChannel {
        &mut self.response
    }

    /// Borrows the request and the response at the same time.
    pub fn split_mut(&mut self) -> (&RequestHead, &mut ResponseChannel) {
        (&self.request, &mut self.response)
    }

    /// Returns the shared services.
    pub fn services(&self) -> &ODataServices {
        &self.services
    }

    /// Converts the context into the final axum response.
    pub fn into_response(self) -> Response {
        self.response.into_response()
    }
}

/// Axum extractor for the execution context.
///
/// Reads [`ODataServices`] from the request extensions when present.
impl<S> FromRequestParts<S> for ActionContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let services = parts
            .extensions
            .get::<ODataServices>()
            .cloned()
            .unwrap_or_default();

        Ok(ActionContext::new(RequestHead::from_parts(parts), services))
    }
}
