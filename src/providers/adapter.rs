//! Uniform CRUD and query surface per resource type.
//!
//! Adapters sit between the operation handler and a [`Provider`]. They
//! validate requests before they reach the store, compose filters, apply
//! attribute projection and paging, and turn provider errors into
//! [`ScimError`]s without losing not-found and conflict.

use super::provider::{Provider, RequestContext};
use crate::config::EngineConfig;
use crate::error::{ScimError, ScimResult};
use crate::protocol::{
    ComparisonOperator, FilterError, FilterPredicate, ProtocolObject, QueryResponse, ResourceQuery,
};
use crate::resource::{Projection, Resource, ResourceKind};

use log::{debug, info, warn};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// CRUD and query operations for one resource type.
pub trait ProviderAdapter: Send + Sync {
    /// Core schema of the resources this adapter serves.
    fn schema_identifier(&self) -> &str;

    /// Store a resource that does not yet have an identifier.
    fn create(
        &self,
        resource: Resource,
        correlation_id: &str,
    ) -> impl Future<Output = ScimResult<Resource>> + Send;

    /// Fetch one resource, rendered with the query's projection. Filters on
    /// the query further constrain the match.
    fn retrieve(
        &self,
        identifier: &str,
        query: &ResourceQuery,
        correlation_id: &str,
    ) -> impl Future<Output = ScimResult<Value>> + Send;

    /// Overwrite the resource named by `resource.id`.
    fn replace(
        &self,
        resource: Resource,
        correlation_id: &str,
    ) -> impl Future<Output = ScimResult<Resource>> + Send;

    fn delete(
        &self,
        identifier: &str,
        correlation_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    /// Apply a dispatched payload, which must be a patch request.
    fn update(
        &self,
        identifier: &str,
        payload: ProtocolObject,
        correlation_id: &str,
    ) -> impl Future<Output = ScimResult<()>> + Send;

    fn query(
        &self,
        query: &ResourceQuery,
        correlation_id: &str,
    ) -> impl Future<Output = ScimResult<QueryResponse>> + Send;
}

fn request_context(correlation_id: &str) -> ScimResult<RequestContext> {
    if correlation_id.trim().is_empty() {
        return Err(ScimError::internal("a correlation identifier is required"));
    }
    Ok(RequestContext::new(correlation_id))
}

fn require_identifier(identifier: &str) -> ScimResult<&str> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(ScimError::invalid_request("a resource identifier is required"));
    }
    Ok(identifier)
}

/// Adapter for users or groups backed by a [`Provider`].
#[derive(Debug)]
pub struct ResourceProviderAdapter<P> {
    provider: Arc<P>,
    kind: ResourceKind,
    config: Arc<EngineConfig>,
}

impl<P> Clone for ResourceProviderAdapter<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            kind: self.kind,
            config: Arc::clone(&self.config),
        }
    }
}

impl<P: Provider> ResourceProviderAdapter<P> {
    pub fn new(provider: Arc<P>, kind: ResourceKind, config: Arc<EngineConfig>) -> Self {
        Self {
            provider,
            kind,
            config,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    fn check_kind(&self, resource: &Resource) -> ScimResult<()> {
        match resource.kind() {
            Some(kind) if kind.same_store(self.kind) => Ok(()),
            _ => Err(ScimError::invalid_request(format!(
                "payload is not a {} resource",
                self.kind
            ))),
        }
    }

    fn check_natural_key(&self, resource: &Resource) -> ScimResult<()> {
        if resource.natural_key_value(self.kind).is_none() {
            return Err(ScimError::invalid_request(format!(
                "'{}' is required",
                self.kind.natural_key()
            )));
        }
        Ok(())
    }

    /// The filters of `query`, once they are known to be evaluable.
    fn check_filters<'q>(&self, query: &'q ResourceQuery) -> ScimResult<&'q [FilterPredicate]> {
        if query.filters.is_empty() {
            return Ok(&query.filters);
        }
        if !self.config.filter_supported {
            return Err(ScimError::not_implemented(self.kind.type_name(), "filter"));
        }

        let supported = self
            .config
            .supported_filter_count
            .min(self.provider.supported_filter_count());
        if query.filters.len() > supported {
            warn!(
                "Rejecting query with {} filters ({} supported)",
                query.filters.len(),
                supported
            );
            return Err(ScimError::invalid_request(format!(
                "invalid parameters: {} filters supplied, at most {} supported",
                query.filters.len(),
                supported
            )));
        }

        let unsupported = query
            .filters
            .iter()
            .flat_map(FilterPredicate::iter)
            .find(|predicate| predicate.operator() != ComparisonOperator::Equals);
        if let Some(predicate) = unsupported {
            return Err(FilterError::UnsupportedOperator {
                operator: predicate.operator().keyword().to_string(),
            }
            .into());
        }
        Ok(&query.filters)
    }

    fn render(resource: &Resource, projection: &Projection) -> Value {
        let mut body = resource.to_json();
        projection.apply(&mut body);
        body
    }
}

impl<P: Provider> ProviderAdapter for ResourceProviderAdapter<P> {
    fn schema_identifier(&self) -> &str {
        self.kind.core_schema()
    }

    async fn create(&self, resource: Resource, correlation_id: &str) -> ScimResult<Resource> {
        let context = request_context(correlation_id)?;
        self.check_kind(&resource)?;
        if let Some(id) = &resource.id {
            warn!("Rejecting create with caller-supplied id '{}'", id);
            return Err(ScimError::invalid_request(
                "'id' is assigned by the service provider and must not be supplied",
            ));
        }
        self.check_natural_key(&resource)?;

        let created = self
            .provider
            .create(self.kind, resource, &context)
            .await
            .inspect_err(|e| warn!("Create {} failed: {}", self.kind, e))?;
        info!(
            "Created {} '{}' (request: '{}')",
            self.kind,
            created.id.as_deref().unwrap_or_default(),
            correlation_id
        );
        Ok(created)
    }

    async fn retrieve(
        &self,
        identifier: &str,
        query: &ResourceQuery,
        correlation_id: &str,
    ) -> ScimResult<Value> {
        let context = request_context(correlation_id)?;
        let identifier = require_identifier(identifier)?;
        let filters = self.check_filters(query)?;

        let resource = match filters {
            [] => self.provider.retrieve(self.kind, identifier, &context).await?,
            [filter] => {
                let composed = FilterPredicate::identifier_within(identifier, Some(filter.clone()));
                debug!("Retrieving {} through filter '{}'", self.kind, composed);
                let mut found = self
                    .provider
                    .query(self.kind, std::slice::from_ref(&composed), &context)
                    .await?;
                match found.len() {
                    0 => {
                        return Err(ScimError::resource_not_found(
                            self.kind.type_name(),
                            identifier,
                        ));
                    }
                    1 => found.remove(0),
                    n => {
                        return Err(ScimError::invalid_request(format!(
                            "identifier '{}' matched {} resources",
                            identifier, n
                        )));
                    }
                }
            }
            _ => {
                return Err(ScimError::invalid_request(
                    "invalid parameters: retrieve accepts a single filter",
                ));
            }
        };
        Ok(Self::render(&resource, &query.projection))
    }

    async fn replace(&self, resource: Resource, correlation_id: &str) -> ScimResult<Resource> {
        let context = request_context(correlation_id)?;
        self.check_kind(&resource)?;
        let Some(id) = resource.id.as_deref().map(require_identifier).transpose()? else {
            return Err(ScimError::invalid_request("replace requires a resource identifier"));
        };
        let id = id.to_string();
        self.check_natural_key(&resource)?;

        let replaced = self
            .provider
            .replace(self.kind, resource, &context)
            .await
            .inspect_err(|e| warn!("Replace {} '{}' failed: {}", self.kind, id, e))?;
        info!(
            "Replaced {} '{}' (request: '{}')",
            self.kind, id, correlation_id
        );
        Ok(replaced)
    }

    async fn delete(&self, identifier: &str, correlation_id: &str) -> ScimResult<()> {
        let context = request_context(correlation_id)?;
        let identifier = require_identifier(identifier)?;
        self.provider
            .delete(self.kind, identifier, &context)
            .await
            .inspect_err(|e| warn!("Delete {} '{}' failed: {}", self.kind, identifier, e))?;
        info!(
            "Deleted {} '{}' (request: '{}')",
            self.kind, identifier, correlation_id
        );
        Ok(())
    }

    async fn update(
        &self,
        identifier: &str,
        payload: ProtocolObject,
        correlation_id: &str,
    ) -> ScimResult<()> {
        let context = request_context(correlation_id)?;
        let identifier = require_identifier(identifier)?;
        if !self.config.patch_supported {
            return Err(ScimError::not_implemented(self.kind.type_name(), "patch"));
        }
        let request = match payload {
            ProtocolObject::PatchRequest(request) => request,
            other => {
                warn!("Rejecting {} payload for patch", other.shape_name());
                return Err(ScimError::UnsupportedPatchType(other.shape_name().to_string()));
            }
        };

        self.provider
            .update(self.kind, identifier, &request, &context)
            .await
            .inspect_err(|e| warn!("Patch {} '{}' failed: {}", self.kind, identifier, e))?;
        info!(
            "Patched {} '{}' with {} operation(s) (request: '{}')",
            self.kind,
            identifier,
            request.operations.len(),
            correlation_id
        );
        Ok(())
    }

    async fn query(&self, query: &ResourceQuery, correlation_id: &str) -> ScimResult<QueryResponse> {
        let context = request_context(correlation_id)?;
        let filters = self.check_filters(query)?;

        let matches = self.provider.query(self.kind, filters, &context).await?;
        let total = matches.len();
        let page = query.pagination.window(matches, self.config.max_results);
        debug!(
            "Query on {} returned {} of {} (startIndex {})",
            self.kind,
            page.len(),
            total,
            query.pagination.start_index()
        );

        let resources = page
            .iter()
            .map(|resource| Self::render(resource, &query.projection))
            .collect();
        Ok(QueryResponse::new(
            resources,
            total,
            query.pagination.start_index(),
        ))
    }
}

/// Catch-all adapter for paths that name no known resource type.
///
/// Create, delete, update and query are not implemented; retrieve returns a
/// bare stub and replace echoes its input.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootProviderAdapter;

impl RootProviderAdapter {
    const TYPE_NAME: &'static str = "Resource";
}

impl ProviderAdapter for RootProviderAdapter {
    fn schema_identifier(&self) -> &str {
        ""
    }

    async fn create(&self, _resource: Resource, correlation_id: &str) -> ScimResult<Resource> {
        request_context(correlation_id)?;
        Err(ScimError::not_implemented(Self::TYPE_NAME, "create"))
    }

    async fn retrieve(
        &self,
        identifier: &str,
        _query: &ResourceQuery,
        correlation_id: &str,
    ) -> ScimResult<Value> {
        request_context(correlation_id)?;
        let mut stub = Resource::new(std::iter::empty::<String>());
        stub.id = Some(require_identifier(identifier)?.to_string());
        Ok(stub.to_json())
    }

    async fn replace(&self, resource: Resource, correlation_id: &str) -> ScimResult<Resource> {
        request_context(correlation_id)?;
        Ok(resource)
    }

    async fn delete(&self, _identifier: &str, correlation_id: &str) -> ScimResult<()> {
        request_context(correlation_id)?;
        Err(ScimError::not_implemented(Self::TYPE_NAME, "delete"))
    }

    async fn update(
        &self,
        _identifier: &str,
        _payload: ProtocolObject,
        correlation_id: &str,
    ) -> ScimResult<()> {
        request_context(correlation_id)?;
        Err(ScimError::not_implemented(Self::TYPE_NAME, "update"))
    }

    async fn query(&self, _query: &ResourceQuery, correlation_id: &str) -> ScimResult<QueryResponse> {
        request_context(correlation_id)?;
        Err(ScimError::not_implemented(Self::TYPE_NAME, "query"))
    }
}
