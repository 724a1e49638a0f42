//! Request and response types and the main dispatch loop.

use crate::config::EngineConfig;
use crate::error::{ScimError, ScimResult};
use crate::protocol::SchemaDispatcher;
use crate::providers::{Provider, ResourceProviderAdapter, RootProviderAdapter};
use crate::resource::ResourceKind;
use crate::schema::identifiers::endpoints;
use crate::schema::SchemaRegistry;
use crate::schema_discovery::SchemaDiscovery;

use log::{debug, info, warn};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// HTTP methods the handler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScimMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl FromStr for ScimMethod {
    type Err = ScimError;

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        match method.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(ScimError::invalid_request(format!(
                "unsupported method '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ScimMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        })
    }
}

/// Transport-agnostic SCIM request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimRequest {
    pub method: ScimMethod,
    /// Resource path such as `/Users/2819c223`
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    pub body: Option<Value>,
    /// Generated by the handler when absent
    pub correlation_id: Option<String>,
}

impl ScimRequest {
    pub fn new(method: ScimMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            body: None,
            correlation_id: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(ScimMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(ScimMethod::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(ScimMethod::Put, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(ScimMethod::Patch, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(ScimMethod::Delete, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub(super) fn require_body(&self) -> ScimResult<&Value> {
        self.body
            .as_ref()
            .ok_or_else(|| ScimError::invalid_request(format!("{} requires a request body", self.method)))
    }
}

/// Transport-agnostic SCIM response.
#[derive(Debug, Clone, PartialEq)]
pub struct ScimResponse {
    pub status: u16,
    pub body: Option<Value>,
    /// `Location` of a created resource
    pub location: Option<String>,
}

impl ScimResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
            location: None,
        }
    }

    pub fn created(body: Value, location: Option<String>) -> Self {
        Self {
            status: 201,
            body: Some(body),
            location,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            body: None,
            location: None,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Where a request path leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Route {
    Resource {
        kind: ResourceKind,
        id: Option<String>,
    },
    ServiceProviderConfig,
    ResourceTypes(Option<String>),
    Schemas(Option<String>),
    Root(Option<String>),
}

impl Route {
    pub(crate) fn parse(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default();
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        let Some(endpoint) = segments.next() else {
            return Route::Root(None);
        };
        let id = segments.next().map(str::to_string);
        let endpoint = format!("/{}", endpoint);

        if let Some(kind) = ResourceKind::from_endpoint(&endpoint) {
            Route::Resource { kind, id }
        } else if endpoint.eq_ignore_ascii_case(endpoints::SERVICE_PROVIDER_CONFIG) {
            Route::ServiceProviderConfig
        } else if endpoint.eq_ignore_ascii_case(endpoints::RESOURCE_TYPES) {
            Route::ResourceTypes(id)
        } else if endpoint.eq_ignore_ascii_case(endpoints::SCHEMAS) {
            Route::Schemas(id)
        } else {
            Route::Root(id)
        }
    }
}

/// Framework-agnostic entry point for SCIM requests.
///
/// Owns the dispatcher and one adapter per resource type; every error is
/// rendered as an RFC 7644 error response with the matching status.
pub struct ScimOperationHandler<P: Provider> {
    pub(super) config: Arc<EngineConfig>,
    pub(super) dispatcher: SchemaDispatcher,
    pub(super) users: ResourceProviderAdapter<P>,
    pub(super) groups: ResourceProviderAdapter<P>,
    pub(super) root: RootProviderAdapter,
    pub(super) discovery: SchemaDiscovery,
}

impl<P: Provider> fmt::Debug for ScimOperationHandler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScimOperationHandler")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<P: Provider> ScimOperationHandler<P> {
    pub fn new(provider: Arc<P>, config: EngineConfig) -> Self {
        Self::with_registry(provider, Arc::new(SchemaRegistry::new()), config)
    }

    pub fn with_registry(provider: Arc<P>, registry: Arc<SchemaRegistry>, config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            dispatcher: SchemaDispatcher::new(Arc::clone(&registry), &config),
            users: ResourceProviderAdapter::new(
                Arc::clone(&provider),
                ResourceKind::User,
                Arc::clone(&config),
            ),
            groups: ResourceProviderAdapter::new(provider, ResourceKind::Group, Arc::clone(&config)),
            root: RootProviderAdapter,
            discovery: SchemaDiscovery::new(registry, &config),
            config,
        }
    }

    /// Replace the dispatcher, e.g. one with custom resource factories.
    pub fn with_dispatcher(mut self, dispatcher: SchemaDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn dispatcher(&self) -> &SchemaDispatcher {
        &self.dispatcher
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle one request. Never fails: errors become error responses.
    pub async fn handle(&self, request: ScimRequest) -> ScimResponse {
        let correlation_id = request
            .correlation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        info!(
            "SCIM operation handler processing {} {} (request: '{}')",
            request.method, request.path, correlation_id
        );

        let route = Route::parse(&request.path);
        let result = match &route {
            Route::Resource { kind, id } => {
                let adapter = match kind {
                    ResourceKind::User | ResourceKind::EnterpriseUser => &self.users,
                    ResourceKind::Group => &self.groups,
                };
                super::handlers::crud::handle_resource(
                    self,
                    adapter,
                    id.as_deref(),
                    &request,
                    &correlation_id,
                )
                .await
            }
            Route::Root(id) => {
                super::handlers::crud::handle_resource(
                    self,
                    &self.root,
                    id.as_deref(),
                    &request,
                    &correlation_id,
                )
                .await
            }
            Route::ServiceProviderConfig | Route::ResourceTypes(_) | Route::Schemas(_) => {
                super::handlers::schema::handle_discovery(self, &route, &request)
            }
        };

        match result {
            Ok(response) => {
                debug!(
                    "SCIM operation handler completed with {} (request: '{}')",
                    response.status, correlation_id
                );
                response
            }
            Err(e) => {
                warn!(
                    "SCIM operation handler failed: {} (request: '{}')",
                    e, correlation_id
                );
                super::errors::error_response(&e)
            }
        }
    }
}
