//! Action results for OData write operations.
//!
//! - [`ActionResult`] - Something that can be executed against an [`ActionContext`]
//! - [`ResponseShape`] - The two possible responses to an update
//! - [`updated`] - [`UpdatedResult`], the response to PUT/PATCH/MERGE

pub mod updated;

pub use updated::UpdatedResult;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use tracing::debug;

use crate::context::ActionContext;
use crate::error::ODataResult;

/// A result that writes itself to the response of an [`ActionContext`].
#[async_trait]
pub trait ActionResult: Send {
    /// Executes the result, consuming it.
    async fn execute_result(self, context: &mut ActionContext) -> ODataResult<()>;
}

/// The response chosen for an updated entity.
#[derive(Debug, PartialEq, Eq)]
pub enum ResponseShape<'a, T> {
    /// `200 OK` with the entity serialized in the body.
    FullRepresentation {
        /// The entity to return.
        entity: &'a T,
        /// Always `200 OK`.
        status: StatusCode,
    },
    /// `204 No Content` with an empty body.
    Acknowledgement {
        /// Always `204 No Content`.
        status: StatusCode,
    },
}

// Derived impls would require `T: Copy`; the shape only holds `&T`.
impl<T> Clone for ResponseShape<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResponseShape<'_, T> {}

impl<'a, T> ResponseShape<'a, T> {
    /// Full representation of `entity` with `200 OK`.
    pub fn full_representation(entity: &'a T) -> Self {
        ResponseShape::FullRepresentation {
            entity,
            status: StatusCode::OK,
        }
    }

    /// Empty acknowledgement with `204 No Content`.
    pub fn acknowledgement() -> Self {
        ResponseShape::Acknowledgement {
            status: StatusCode::NO_CONTENT,
        }
    }

    /// Returns the status code this shape responds with.
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseShape::FullRepresentation { status, .. } => *status,
            ResponseShape::Acknowledgement { status } => *status,
        }
    }

    /// Returns the entity when the shape carries a body.
    pub fn entity(&self) -> Option<&'a T> {
        match self {
            ResponseShape::FullRepresentation { entity, .. } => Some(entity),
            ResponseShape::Acknowledgement { .. } => None,
        }
    }
}

impl<T: Serialize + Sync> ResponseShape<'_, T> {
    /// Writes the status and, for a full representation, the entity body
    /// through the context's formatter.
    ///
    /// Formatter errors are returned unchanged.
    pub async fn execute(self, context: &mut ActionContext) -> ODataResult<()> {
        context.response().ensure_open()?;

        let formatter = context.services().formatter();
        let (status, payload) = match self {
            ResponseShape::FullRepresentation { entity, status } => {
                (status, Some(serde_json::to_value(entity)?))
            }
            ResponseShape::Acknowledgement { status } => (status, None),
        };

        debug!(status = %status, has_body = payload.is_some(), "Executing response shape");

        let (request, response) = context.split_mut();
        formatter.write(request, response, status, payload).await
    }
}
