//! Result for update operations.
//!
//! Implements the response rules for `PUT`, `PATCH` and `MERGE` on an
//! entity: `200 OK` with the entity when the client sent
//! `Prefer: return=representation`, `204 No Content` otherwise. Either way
//! the response carries `OData-Version` once the body has been written.

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::response::Response;
use serde::Serialize;
use tracing::debug;

use crate::context::ActionContext;
use crate::error::{ODataError, ODataResult};
use crate::headers::add_service_version;
use crate::preference::request_prefers_return_content;
use crate::results::{ActionResult, ResponseShape};
use crate::version::response_version;

/// Represents the response to a PUT, PATCH, or MERGE on an OData entity.
///
/// Handles the HTTP Prefer header and stamps the protocol version.
///
/// # Example
///
/// ```rust,ignore
/// use helios_odata::{ActionContext, ODataResult, UpdatedResult};
///
/// async fn patch_customer(context: ActionContext, Json(customer): Json<Customer>) -> ODataResult<Response> {
///     let updated = repository.save(customer).await?;
///     UpdatedResult::new(updated).respond(context).await
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedResult<T> {
    entity: T,
}

impl<T> UpdatedResult<T> {
    /// Creates a result for the updated entity.
    pub fn new(entity: T) -> Self {
        Self { entity }
    }

    /// Returns the entity that was updated.
    pub fn entity(&self) -> &T {
        &self.entity
    }

    /// Chooses the response shape for a request with the given headers.
    pub fn decide(&self, headers: &HeaderMap) -> ResponseShape<'_, T> {
        if request_prefers_return_content(headers) {
            ResponseShape::full_representation(&self.entity)
        } else {
            ResponseShape::acknowledgement()
        }
    }
}

/// Fails with `ArgumentNull` when no entity is supplied.
impl<T> TryFrom<Option<T>> for UpdatedResult<T> {
    type Error = ODataError;

    fn try_from(entity: Option<T>) -> Result<Self, Self::Error> {
        entity
            .map(Self::new)
            .ok_or(ODataError::ArgumentNull { param: "entity" })
    }
}

impl<T> UpdatedResult<T>
where
    T: Serialize + Send + Sync,
{
    /// Executes against `context`, failing with `ArgumentNull` when it is
    /// missing.
    ///
    /// The shape is decided and its body written first. `OData-Version` is
    /// added only after the body write succeeds; if the write fails the
    /// error is returned as-is and no header is added.
    pub async fn execute_with(self, context: Option<&mut ActionContext>) -> ODataResult<()> {
        let context = context.ok_or(ODataError::ArgumentNull { param: "context" })?;

        let shape = self.decide(context.request().headers());
        debug!(
            method = %context.request().method(),
            uri = %context.request().uri(),
            status = %shape.status(),
            "Update response shape decided"
        );

        shape.execute(context).await?;

        let default_version = context.services().default_version();
        let (request, response) = context.split_mut();
        let stamped = add_service_version(response, || {
            response_version(request.headers(), default_version).to_string()
        });

        debug!(stamped = stamped, "Update response finalized");
        Ok(())
    }

    /// Executes against `context` and converts it into the final response.
    pub async fn respond(self, mut context: ActionContext) -> ODataResult<Response> {
        self.execute_with(Some(&mut context)).await?;
        Ok(context.into_response())
    }
}

#[async_trait]
impl<T> ActionResult for UpdatedResult<T>
where
    T: Serialize + Send + Sync,
{
    async fn execute_result(self, context: &mut ActionContext) -> ODataResult<()> {
        self.execute_with(Some(context)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use axum::http::{HeaderValue, Method, StatusCode, header};
    use bytes::Bytes;
    use serde_json::{Value, json};

    use crate::context::{ODataServices, RequestHead, ResponseChannel};
    use crate::format::{BodyFormatter, JsonFormatter};
    use crate::preference::PREFER;
    use crate::version::{ODATA_MAX_VERSION, ODATA_VERSION, ODataVersion};

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Customer {
        id: u32,
        name: String,
    }

    fn customer() -> Customer {
        Customer {
            id: 1,
            name: "x".to_string(),
        }
    }

    fn context_with(
        headers: &[(&'static str, &'static str)],
        services: ODataServices,
    ) -> ActionContext {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.append(*name, HeaderValue::from_static(*value));
        }
        let request = RequestHead::new(Method::PATCH, "/Customers(1)".parse().unwrap(), map);
        ActionContext::new(request, services)
    }

    fn context(headers: &[(&'static str, &'static str)]) -> ActionContext {
        context_with(headers, ODataServices::default())
    }

    struct FailingFormatter;

    #[async_trait]
    impl BodyFormatter for FailingFormatter {
        async fn write(
            &self,
            _request: &RequestHead,
            _response: &mut ResponseChannel,
            _status: StatusCode,
            _payload: Option<Value>,
        ) -> ODataResult<()> {
            Err(ODataError::Transport {
                message: "connection reset".to_string(),
            })
        }
    }

    /// Records whether OData-Version was already present when the body was written.
    struct RecordingFormatter {
        saw_version_header: Arc<AtomicBool>,
    }

    #[async_trait]
    impl BodyFormatter for RecordingFormatter {
        async fn write(
            &self,
            request: &RequestHead,
            response: &mut ResponseChannel,
            status: StatusCode,
            payload: Option<Value>,
        ) -> ODataResult<()> {
            self.saw_version_header
                .store(response.headers().contains_key(ODATA_VERSION), Ordering::SeqCst);
            JsonFormatter.write(request, response, status, payload).await
        }
    }

    #[test]
    fn test_try_from_none_fails() {
        let err = UpdatedResult::<Customer>::try_from(None).unwrap_err();
        assert!(matches!(err, ODataError::ArgumentNull { param: "entity" }));
    }

    #[test]
    fn test_try_from_some() {
        let result = UpdatedResult::try_from(Some(customer())).unwrap();
        assert_eq!(result.entity(), &customer());
    }

    #[test]
    fn test_decide_representation() {
        let result = UpdatedResult::new(customer());
        let mut headers = HeaderMap::new();
        headers.insert(PREFER, HeaderValue::from_static("return=representation"));

        let shape = result.decide(&headers);
        assert_eq!(shape, ResponseShape::full_representation(result.entity()));
        assert_eq!(shape.status(), StatusCode::OK);
    }

    #[test]
    fn test_decide_defaults_to_acknowledgement() {
        let result = UpdatedResult::new(customer());
        for value in [
            None,
            Some("return=minimal"),
            Some("{garbage}"),
            Some("return=representation, return=minimal"),
        ] {
            let mut headers = HeaderMap::new();
            if let Some(value) = value {
                headers.insert(PREFER, HeaderValue::from_static(value));
            }
            assert_eq!(
                result.decide(&headers),
                ResponseShape::acknowledgement(),
                "{value:?}"
            );
        }
    }

    #[test]
    fn test_decide_is_pure() {
        let result = UpdatedResult::new(customer());
        let mut headers = HeaderMap::new();
        headers.insert(PREFER, HeaderValue::from_static("return=representation"));

        assert_eq!(result.decide(&headers), result.decide(&headers));
        assert_eq!(result.entity(), &customer());
    }

    #[tokio::test]
    async fn test_execute_representation() {
        let mut context = context(&[("prefer", "return=representation")]);

        UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap();

        let response = context.response();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body, json!({"id": 1, "name": "x"}));
        assert_eq!(response.headers()[ODATA_VERSION], "4.0");
        assert!(response.headers().contains_key(header::CONTENT_TYPE));
    }

    #[tokio::test]
    async fn test_execute_acknowledgement() {
        let mut context = context(&[]);

        UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap();

        let response = context.response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(response.body().is_empty());
        assert_eq!(response.headers()[ODATA_VERSION], "4.0");
    }

    #[tokio::test]
    async fn test_execute_without_context_fails() {
        let err = UpdatedResult::new(customer())
            .execute_with(None)
            .await
            .unwrap_err();
        assert!(matches!(err, ODataError::ArgumentNull { param: "context" }));
    }

    #[tokio::test]
    async fn test_header_stamped_after_body() {
        let saw_version_header = Arc::new(AtomicBool::new(true));
        let services = ODataServices::default().with_formatter(Arc::new(RecordingFormatter {
            saw_version_header: Arc::clone(&saw_version_header),
        }));
        let mut context = context_with(&[("prefer", "return=representation")], services);

        UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap();

        assert!(!saw_version_header.load(Ordering::SeqCst));
        assert!(context.response().headers().contains_key(ODATA_VERSION));
    }

    #[tokio::test]
    async fn test_body_failure_propagates_and_skips_header() {
        let services = ODataServices::default().with_formatter(Arc::new(FailingFormatter));
        let mut context = context_with(&[("prefer", "return=representation")], services);

        let err = UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap_err();

        match err {
            ODataError::Transport { message } => assert_eq!(message, "connection reset"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!context.response().headers().contains_key(ODATA_VERSION));
    }

    #[tokio::test]
    async fn test_committed_response_rejected() {
        let mut context = context(&[]);
        context
            .response_mut()
            .commit(StatusCode::ACCEPTED, Bytes::new())
            .unwrap();

        let err = UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap_err();

        assert!(matches!(err, ODataError::ResponseStarted));
        assert_eq!(context.response().status(), StatusCode::ACCEPTED);
        assert!(!context.response().headers().contains_key(ODATA_VERSION));
    }

    #[tokio::test]
    async fn test_existing_version_header_kept() {
        let mut context = context(&[]);
        context
            .response_mut()
            .headers_mut()
            .insert(ODATA_VERSION, HeaderValue::from_static("4.01"));

        UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap();

        let headers = context.response().headers();
        assert_eq!(headers.get_all(ODATA_VERSION).iter().count(), 1);
        assert_eq!(headers[ODATA_VERSION], "4.01");
    }

    #[tokio::test]
    async fn test_version_follows_request() {
        let services = ODataServices::default().with_default_version(ODataVersion::V4_01);
        let mut context = context_with(&[("odata-maxversion", "4.0")], services);

        UpdatedResult::new(customer())
            .execute_result(&mut context)
            .await
            .unwrap();

        assert_eq!(context.response().headers()[ODATA_VERSION], "4.0");
        assert!(!context.response().headers().contains_key(ODATA_MAX_VERSION));
    }

    #[tokio::test]
    async fn test_respond_builds_response() {
        let context = context(&[("prefer", "return=minimal")]);
        let response = UpdatedResult::new(customer()).respond(context).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ODATA_VERSION], "4.0");
    }
}
