//! Schema-driven dispatch of JSON payloads to protocol objects.
//!
//! [`SchemaDispatcher::create`] reads a payload's `schemas` array and decides
//! what the payload is. Resolution runs in a fixed order and the first step
//! that claims the payload wins:
//!
//! 1. resources: User (Enterprise User when that extension is declared) or Group,
//! 2. protocol messages: a PATCH request or an error response,
//! 3. registered [`ProtocolExtension`]s, in registration order.
//!
//! Resource constructors come from a strategy table keyed by schema
//! identifier. Overrides installed with [`SchemaDispatcher::with_resource_factory`]
//! are consulted before the built-in constructors.

use super::error_response::ErrorResponse;
use super::filter::lookup;
use super::patch::{CompliantPatchStrategy, PatchRequest, PatchRequestStrategy};
use crate::config::EngineConfig;
use crate::error::{ScimError, ScimResult};
use crate::resource::{Resource, ResourceKind};
use crate::schema::identifiers::{self, attributes};
use crate::schema::{ProtocolExtension, SchemaRegistry, SchemaSet};

use log::{debug, trace};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a resource from a normalized payload.
pub type ResourceFactory = Arc<dyn Fn(Value) -> ScimResult<Resource> + Send + Sync>;

/// A payload materialized by a registered extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionObject {
    pub schema_identifier: String,
    pub schemas: SchemaSet,
    pub body: Value,
}

/// Everything a payload can dispatch to.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolObject {
    Resource(Resource),
    PatchRequest(PatchRequest),
    Error(ErrorResponse),
    Extension(ExtensionObject),
}

impl ProtocolObject {
    /// Short name of the variant, used in error messages.
    pub fn shape_name(&self) -> &'static str {
        match self {
            ProtocolObject::Resource(_) => "Resource",
            ProtocolObject::PatchRequest(_) => "PatchRequest",
            ProtocolObject::Error(_) => "ErrorResponse",
            ProtocolObject::Extension(_) => "Extension",
        }
    }

    pub fn schemas(&self) -> &SchemaSet {
        match self {
            ProtocolObject::Resource(resource) => &resource.schemas,
            ProtocolObject::PatchRequest(request) => &request.schemas,
            ProtocolObject::Error(error) => &error.schemas,
            ProtocolObject::Extension(extension) => &extension.schemas,
        }
    }
}

/// Resolves JSON payloads into protocol objects.
pub struct SchemaDispatcher {
    registry: Arc<SchemaRegistry>,
    factories: HashMap<String, ResourceFactory>,
    overrides: HashMap<String, ResourceFactory>,
    patch_strategy: Option<Arc<dyn PatchRequestStrategy>>,
    membership_attributes: Vec<String>,
}

impl SchemaDispatcher {
    /// A dispatcher with the built-in constructors and the multi-valued
    /// patch strategy tried before the compliant one.
    pub fn new(registry: Arc<SchemaRegistry>, config: &EngineConfig) -> Self {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            identifiers::CORE_USER.to_ascii_lowercase(),
            Arc::new(|body| build_resource(body, ResourceKind::User)),
        );
        factories.insert(
            identifiers::ENTERPRISE_USER.to_ascii_lowercase(),
            Arc::new(|body| build_resource(body, ResourceKind::EnterpriseUser)),
        );
        factories.insert(
            identifiers::CORE_GROUP.to_ascii_lowercase(),
            Arc::new(|body| build_resource(body, ResourceKind::Group)),
        );

        Self {
            registry,
            factories,
            overrides: HashMap::new(),
            patch_strategy: Some(Arc::new(super::patch::MultiValuedPatchStrategy)),
            membership_attributes: config.membership_attributes.clone(),
        }
    }

    /// Install a constructor that takes precedence for `schema_identifier`.
    pub fn with_resource_factory(mut self, schema_identifier: &str, factory: ResourceFactory) -> Self {
        self.overrides
            .insert(schema_identifier.trim().to_ascii_lowercase(), factory);
        self
    }

    /// Replace the strategy tried before the compliant one; `None` leaves only
    /// the compliant strategy.
    pub fn with_patch_strategy(mut self, strategy: Option<Arc<dyn PatchRequestStrategy>>) -> Self {
        self.patch_strategy = strategy;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// Register a protocol extension with the shared registry.
    pub fn register_extension(&self, extension: Arc<dyn ProtocolExtension>) -> bool {
        self.registry.register_extension(extension)
    }

    /// Materialize a payload.
    pub fn create(&self, json: &Value) -> ScimResult<ProtocolObject> {
        let normalized = normalize(json);
        trace!("Dispatching payload: {}", normalized);

        let schemas = match lookup(&normalized, attributes::SCHEMAS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|identifier| !identifier.is_empty())
                .collect::<SchemaSet>(),
            _ => return Err(ScimError::UnidentifiableSchema),
        };
        if schemas.is_empty() {
            return Err(ScimError::UnidentifiableSchema);
        }

        if let Some(resource) = self.try_resource(&normalized, &schemas)? {
            return Ok(ProtocolObject::Resource(resource));
        }
        if let Some(object) = self.try_protocol_object(&normalized, &schemas)? {
            return Ok(object);
        }
        if let Some(object) = self.try_extension(&normalized, &schemas)? {
            return Ok(object);
        }

        let unrecognized = schemas.to_vec();
        debug!("No dispatch step claimed schemas {:?}", unrecognized);
        Err(ScimError::UnsupportedSchema {
            schemas: unrecognized,
        })
    }

    fn try_resource(&self, json: &Value, schemas: &SchemaSet) -> ScimResult<Option<Resource>> {
        let is_user = schemas.contains(identifiers::CORE_USER);
        let is_group = schemas.contains(identifiers::CORE_GROUP);
        let (core, kind) = match (is_user, is_group) {
            (false, false) => return Ok(None),
            (true, true) => {
                return Err(ScimError::DispatchAmbiguity {
                    message: "payload declares both the User and the Group schema".to_string(),
                });
            }
            (true, false) if schemas.contains(identifiers::ENTERPRISE_USER) => {
                (identifiers::CORE_USER, ResourceKind::EnterpriseUser)
            }
            (true, false) => (identifiers::CORE_USER, ResourceKind::User),
            (false, true) => (identifiers::CORE_GROUP, ResourceKind::Group),
        };

        let definition = match kind {
            ResourceKind::Group => self.registry.group_type(),
            _ => self.registry.user_type(),
        };
        let unsupported = schemas.unrecognized(|identifier| {
            identifiers::same_identifier(identifier, core)
                || definition.is_extension(identifier)
                || self
                    .registry
                    .extensions()
                    .iter()
                    .any(|extension| identifiers::same_identifier(extension.schema_identifier(), identifier))
        });
        if !unsupported.is_empty() {
            return Err(ScimError::UnsupportedSchema {
                schemas: unsupported,
            });
        }

        let factory = self
            .overrides
            .get(&core.to_ascii_lowercase())
            .or_else(|| {
                let key = match kind {
                    ResourceKind::EnterpriseUser => identifiers::ENTERPRISE_USER,
                    _ => core,
                };
                self.factories.get(&key.to_ascii_lowercase())
            })
            .ok_or_else(|| ScimError::internal(format!("no constructor registered for {}", kind)))?;

        debug!("Dispatching payload to {:?} resource", kind);
        factory(json.clone()).map(Some)
    }

    fn try_protocol_object(&self, json: &Value, schemas: &SchemaSet) -> ScimResult<Option<ProtocolObject>> {
        if schemas.len() != 1 {
            return Ok(None);
        }
        if schemas.contains(identifiers::PATCH_OP) {
            return self.create_patch_request(json).map(|request| Some(ProtocolObject::PatchRequest(request)));
        }
        if schemas.contains(identifiers::ERROR) {
            let response: ErrorResponse = serde_json::from_value(json.clone())?;
            return Ok(Some(ProtocolObject::Error(response)));
        }
        Ok(None)
    }

    fn create_patch_request(&self, json: &Value) -> ScimResult<PatchRequest> {
        if let Some(strategy) = &self.patch_strategy {
            match PatchRequest::from_json_with(strategy.as_ref(), json, &self.membership_attributes) {
                Ok(request) => return Ok(request),
                Err(error) => debug!(
                    "Patch strategy '{}' declined the request ({}); falling back to compliant parsing",
                    strategy.name(),
                    error
                ),
            }
        }
        PatchRequest::from_json_with(&CompliantPatchStrategy, json, &self.membership_attributes)
    }

    fn try_extension(&self, json: &Value, schemas: &SchemaSet) -> ScimResult<Option<ProtocolObject>> {
        let Some(extension) = self
            .registry
            .extensions()
            .into_iter()
            .find(|extension| extension.matches(schemas))
        else {
            return Ok(None);
        };
        debug!("Dispatching payload to extension '{}'", extension.schema_identifier());
        let body = extension.build(json.clone())?;
        Ok(Some(ProtocolObject::Extension(ExtensionObject {
            schema_identifier: extension.schema_identifier().to_string(),
            schemas: schemas.clone(),
            body,
        })))
    }
}

impl fmt::Debug for SchemaDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDispatcher")
            .field("registry", &self.registry)
            .field("overrides", &self.overrides.keys().collect::<Vec<_>>())
            .field("patch_strategy", &self.patch_strategy.as_ref().map(|s| s.name()))
            .finish()
    }
}

fn build_resource(body: Value, kind: ResourceKind) -> ScimResult<Resource> {
    let resource = Resource::from_json(body)?;
    if kind == ResourceKind::EnterpriseUser {
        resource.schemas.add(identifiers::ENTERPRISE_USER);
    }
    Ok(resource)
}

/// Drop null members and empty nested objects. Arrays are kept as they are.
pub fn normalize(json: &Value) -> Value {
    match json {
        Value::Object(members) => Value::Object(trim_object(members)),
        other => other.clone(),
    }
}

fn trim_object(members: &Map<String, Value>) -> Map<String, Value> {
    members
        .iter()
        .filter_map(|(key, value)| match value {
            Value::Null => None,
            Value::Object(nested) => {
                let trimmed = trim_object(nested);
                (!trimmed.is_empty()).then(|| (key.clone(), Value::Object(trimmed)))
            }
            other => Some((key.clone(), other.clone())),
        })
        .collect()
}
