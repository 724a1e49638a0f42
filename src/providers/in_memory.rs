//! Reference in-memory provider.
//!
//! Resources are kept per resource type in a `tokio::sync::RwLock`-guarded
//! map keyed by lowercase identifier, so lookups ignore case. Patches are
//! applied while the write lock is held; the natural key is checked again
//! afterwards so a patch cannot introduce a duplicate.
//!
//! ```rust
//! use scim_protocol::providers::{InMemoryProvider, Provider, RequestContext};
//! use scim_protocol::resource::{Resource, ResourceKind};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let provider = InMemoryProvider::default();
//! let context = RequestContext::with_generated_id();
//!
//! let mut user = Resource::new(["urn:ietf:params:scim:schemas:core:2.0:User"]);
//! user.set_attribute("userName", json!("alice"));
//!
//! let stored = provider.create(ResourceKind::User, user, &context).await.unwrap();
//! assert!(stored.id.is_some());
//! # });
//! ```

use super::error::ProviderError;
use super::provider::{Provider, RequestContext};
use crate::config::EngineConfig;
use crate::protocol::{CaseMode, FilterError, FilterPredicate, PatchRequest};
use crate::resource::meta::weak_etag;
use crate::resource::{Meta, PatchApplier, Resource, ResourceKind};
use crate::schema::{ResourceTypeDefinition, SchemaRegistry};

use log::{debug, info, trace, warn};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

type Table = HashMap<String, Resource>;

/// Thread-safe in-memory [`Provider`].
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    tables: Arc<RwLock<HashMap<&'static str, Table>>>,
    registry: Arc<SchemaRegistry>,
    config: Arc<EngineConfig>,
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new(Arc::new(SchemaRegistry::new()), Arc::new(EngineConfig::default()))
    }
}

impl InMemoryProvider {
    pub fn new(registry: Arc<SchemaRegistry>, config: Arc<EngineConfig>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            registry,
            config,
        }
    }

    /// Number of stored resources of `kind`.
    pub async fn count(&self, kind: ResourceKind) -> usize {
        self.tables
            .read()
            .await
            .get(kind.type_name())
            .map_or(0, HashMap::len)
    }

    pub async fn clear(&self) {
        self.tables.write().await.clear();
    }

    fn definition(&self, kind: ResourceKind) -> &ResourceTypeDefinition {
        match kind {
            ResourceKind::User | ResourceKind::EnterpriseUser => self.registry.user_type(),
            ResourceKind::Group => self.registry.group_type(),
        }
    }

    fn stamp(resource: &mut Resource, meta: Meta) -> Result<(), ProviderError> {
        let content = serde_json::to_vec(&resource.attributes).map_err(|e| ProviderError::Internal {
            message: format!("Failed to serialize resource: {}", e),
        })?;
        let mut meta = meta;
        meta.version = Some(weak_etag(&content));
        resource.meta = Some(meta);
        Ok(())
    }
}

fn natural_key(kind: ResourceKind, resource: &Resource) -> Result<String, ProviderError> {
    resource
        .natural_key_value(kind)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::invalid_input(format!("'{}' is required", kind.natural_key())))
}

/// Fail if another resource in `table` already holds `value` as its natural
/// key. Values compare ordinally; `own_id` is skipped.
fn ensure_unique(
    table: &Table,
    kind: ResourceKind,
    value: &str,
    own_id: Option<&str>,
) -> Result<(), ProviderError> {
    let duplicate = table.iter().any(|(key, existing)| {
        own_id.is_none_or(|id| !key.eq_ignore_ascii_case(id))
            && existing.natural_key_value(kind) == Some(value)
    });
    if duplicate {
        warn!("Duplicate {} '{}' for {}", kind.natural_key(), value, kind);
        return Err(ProviderError::conflict(kind.type_name(), kind.natural_key(), value));
    }
    Ok(())
}

fn filter_error(error: FilterError) -> ProviderError {
    match error {
        FilterError::UnsupportedOperator { operator } => ProviderError::UnsupportedOperator { operator },
        other => ProviderError::invalid_input(other.to_string()),
    }
}

impl Provider for InMemoryProvider {
    async fn create(
        &self,
        kind: ResourceKind,
        mut resource: Resource,
        context: &RequestContext,
    ) -> Result<Resource, ProviderError> {
        info!(
            "Creating {} resource (request: '{}')",
            kind, context.correlation_id
        );
        trace!("Create data: {}", resource.to_json());

        let key = natural_key(kind, &resource)?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(kind.type_name()).or_default();
        ensure_unique(table, kind, &key, None)?;

        let id = Uuid::new_v4().to_string();
        resource.id = Some(id.clone());
        let meta = Meta::new(kind.type_name(), self.config.location(kind.endpoint(), &id));
        Self::stamp(&mut resource, meta)?;

        table.insert(id.to_ascii_lowercase(), resource.clone());
        debug!("Stored {} '{}' ({} total)", kind, id, table.len());
        Ok(resource)
    }

    async fn retrieve(
        &self,
        kind: ResourceKind,
        id: &str,
        context: &RequestContext,
    ) -> Result<Resource, ProviderError> {
        debug!(
            "Getting {} resource with ID '{}' (request: '{}')",
            kind, id, context.correlation_id
        );
        let tables = self.tables.read().await;
        tables
            .get(kind.type_name())
            .and_then(|table| table.get(&id.to_ascii_lowercase()))
            .cloned()
            .ok_or_else(|| ProviderError::not_found(kind.type_name(), id))
    }

    async fn replace(
        &self,
        kind: ResourceKind,
        mut resource: Resource,
        context: &RequestContext,
    ) -> Result<Resource, ProviderError> {
        let id = resource
            .id
            .clone()
            .ok_or_else(|| ProviderError::invalid_input("replace requires an identifier"))?;
        info!(
            "Replacing {} resource with ID '{}' (request: '{}')",
            kind, id, context.correlation_id
        );

        let key = natural_key(kind, &resource)?;
        let mut tables = self.tables.write().await;
        let table = tables.entry(kind.type_name()).or_default();
        let slot = id.to_ascii_lowercase();
        let Some(existing) = table.get(&slot) else {
            return Err(ProviderError::not_found(kind.type_name(), id));
        };
        ensure_unique(table, kind, &key, Some(&id))?;

        resource.id = existing.id.clone();
        let mut meta = existing
            .meta
            .clone()
            .unwrap_or_else(|| Meta::new(kind.type_name(), self.config.location(kind.endpoint(), &id)));
        meta.last_modified = chrono::Utc::now();
        Self::stamp(&mut resource, meta)?;

        table.insert(slot, resource.clone());
        Ok(resource)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        id: &str,
        context: &RequestContext,
    ) -> Result<(), ProviderError> {
        info!(
            "Deleting {} resource with ID '{}' (request: '{}')",
            kind, id, context.correlation_id
        );
        let mut tables = self.tables.write().await;
        tables
            .get_mut(kind.type_name())
            .and_then(|table| table.remove(&id.to_ascii_lowercase()))
            .map(|_| ())
            .ok_or_else(|| ProviderError::not_found(kind.type_name(), id))
    }

    async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        request: &PatchRequest,
        context: &RequestContext,
    ) -> Result<Resource, ProviderError> {
        info!(
            "Patching {} resource with ID '{}' ({} operations, request: '{}')",
            kind,
            id,
            request.operations.len(),
            context.correlation_id
        );

        let mut tables = self.tables.write().await;
        let table = tables.entry(kind.type_name()).or_default();
        let slot = id.to_ascii_lowercase();
        let Some(existing) = table.get(&slot) else {
            return Err(ProviderError::not_found(kind.type_name(), id));
        };

        let mut patched = PatchApplier::new(self.definition(kind)).apply(existing, request)?;
        let key = natural_key(kind, &patched)?;
        ensure_unique(table, kind, &key, Some(id))?;

        let mut meta = patched
            .meta
            .take()
            .unwrap_or_else(|| Meta::new(kind.type_name(), self.config.location(kind.endpoint(), id)));
        meta.last_modified = chrono::Utc::now();
        Self::stamp(&mut patched, meta)?;

        table.insert(slot, patched.clone());
        Ok(patched)
    }

    async fn query(
        &self,
        kind: ResourceKind,
        filters: &[FilterPredicate],
        context: &RequestContext,
    ) -> Result<Vec<Resource>, ProviderError> {
        debug!(
            "Querying {} resources with {} filter(s) (request: '{}')",
            kind,
            filters.len(),
            context.correlation_id
        );

        let tables = self.tables.read().await;
        let Some(table) = tables.get(kind.type_name()) else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        for resource in table.values() {
            let mut keep = true;
            for filter in filters {
                if !filter
                    .matches(resource, CaseMode::IgnoreCase)
                    .map_err(filter_error)?
                {
                    keep = false;
                    break;
                }
            }
            if keep {
                matches.push(resource.clone());
            }
        }

        matches.sort_by(|left, right| {
            let created = |resource: &Resource| resource.meta.as_ref().map(|meta| meta.created);
            created(left)
                .cmp(&created(right))
                .then_with(|| left.id.cmp(&right.id))
        });
        debug!("Query matched {} {} resource(s)", matches.len(), kind);
        Ok(matches)
    }
}
