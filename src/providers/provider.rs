//! The capability contract a backing store implements.
//!
//! Providers see validated input: adapters have already rejected
//! caller-supplied identifiers, missing natural keys and unsupported filter
//! shapes. Providers own identifier assignment, uniqueness and metadata.

use super::error::ProviderError;
use crate::protocol::{FilterPredicate, PatchRequest};
use crate::resource::{Resource, ResourceKind};

use std::future::Future;
use uuid::Uuid;

/// Per-request data handed to every provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlation identifier carried through logs
    pub correlation_id: String,
}

impl RequestContext {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
        }
    }

    pub fn with_generated_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

/// Storage operations for users and groups.
///
/// Absent targets are reported as [`ProviderError::NotFound`] and natural-key
/// collisions as [`ProviderError::Conflict`].
pub trait Provider: Send + Sync {
    /// Store a new resource, assigning its identifier and `meta`.
    fn create(
        &self,
        kind: ResourceKind,
        resource: Resource,
        context: &RequestContext,
    ) -> impl Future<Output = Result<Resource, ProviderError>> + Send;

    fn retrieve(
        &self,
        kind: ResourceKind,
        id: &str,
        context: &RequestContext,
    ) -> impl Future<Output = Result<Resource, ProviderError>> + Send;

    /// Overwrite an existing resource; `resource.id` names the target.
    fn replace(
        &self,
        kind: ResourceKind,
        resource: Resource,
        context: &RequestContext,
    ) -> impl Future<Output = Result<Resource, ProviderError>> + Send;

    fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        context: &RequestContext,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Apply a patch request atomically, returning the updated resource.
    fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        request: &PatchRequest,
        context: &RequestContext,
    ) -> impl Future<Output = Result<Resource, ProviderError>> + Send;

    /// All resources matching every filter, in a stable order.
    fn query(
        &self,
        kind: ResourceKind,
        filters: &[FilterPredicate],
        context: &RequestContext,
    ) -> impl Future<Output = Result<Vec<Resource>, ProviderError>> + Send;

    /// Number of top-level filters a query may carry.
    fn supported_filter_count(&self) -> usize {
        1
    }
}
