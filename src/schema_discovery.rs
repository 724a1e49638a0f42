//! Discovery documents: ServiceProviderConfig, ResourceTypes and Schemas.
//!
//! ```rust
//! use scim_protocol::schema_discovery::SchemaDiscovery;
//! use scim_protocol::{EngineConfig, SchemaRegistry};
//! use std::sync::Arc;
//!
//! let discovery = SchemaDiscovery::new(Arc::new(SchemaRegistry::new()), &EngineConfig::default());
//! assert!(discovery.service_provider_config().patch.supported);
//! assert_eq!(discovery.resource_types().len(), 2);
//! ```

use crate::config::EngineConfig;
use crate::error::{ScimError, ScimResult};
use crate::schema::{identifiers, ResourceTypeDefinition, Schema, SchemaRegistry, SchemaSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A capability flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Supported {
    pub supported: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BulkSupport {
    pub supported: bool,
    pub max_operations: u32,
    pub max_payload_size: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FilterSupport {
    pub supported: bool,
    pub max_results: usize,
}

/// RFC 7643 §5 service provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProviderConfig {
    pub schemas: SchemaSet,
    pub patch: Supported,
    pub bulk: BulkSupport,
    pub filter: FilterSupport,
    pub change_password: Supported,
    pub sort: Supported,
    pub etag: Supported,
    #[serde(default)]
    pub authentication_schemes: Vec<Value>,
}

impl ServiceProviderConfig {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            schemas: [identifiers::SERVICE_PROVIDER_CONFIG].into_iter().collect(),
            patch: Supported {
                supported: config.patch_supported,
            },
            bulk: BulkSupport {
                supported: false,
                max_operations: 0,
                max_payload_size: 0,
            },
            filter: FilterSupport {
                supported: config.filter_supported,
                max_results: config.max_results,
            },
            change_password: Supported { supported: false },
            sort: Supported { supported: false },
            etag: Supported { supported: true },
            authentication_schemes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SchemaExtensionReference {
    pub schema: String,
    pub required: bool,
}

/// RFC 7643 §6 resource type document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeDocument {
    pub schemas: SchemaSet,
    pub id: String,
    pub name: String,
    pub endpoint: String,
    pub description: String,
    pub schema: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_extensions: Vec<SchemaExtensionReference>,
}

impl From<&ResourceTypeDefinition> for ResourceTypeDocument {
    fn from(definition: &ResourceTypeDefinition) -> Self {
        Self {
            schemas: [identifiers::RESOURCE_TYPE].into_iter().collect(),
            id: definition.name.clone(),
            name: definition.name.clone(),
            endpoint: definition.endpoint.clone(),
            description: definition.description.clone(),
            schema: definition.schema.id.clone(),
            schema_extensions: definition
                .extensions
                .iter()
                .map(|extension| SchemaExtensionReference {
                    schema: extension.id.clone(),
                    required: false,
                })
                .collect(),
        }
    }
}

/// Serves discovery documents from a registry.
#[derive(Debug, Clone)]
pub struct SchemaDiscovery {
    registry: Arc<SchemaRegistry>,
    service_config: ServiceProviderConfig,
}

impl SchemaDiscovery {
    pub fn new(registry: Arc<SchemaRegistry>, config: &EngineConfig) -> Self {
        Self {
            registry,
            service_config: ServiceProviderConfig::from_config(config),
        }
    }

    pub fn service_provider_config(&self) -> &ServiceProviderConfig {
        &self.service_config
    }

    pub fn resource_types(&self) -> Vec<ResourceTypeDocument> {
        self.registry
            .resource_types()
            .into_iter()
            .map(|definition| ResourceTypeDocument::from(&**definition))
            .collect()
    }

    /// The resource type document named `name`, ignoring case.
    pub fn resource_type(&self, name: &str) -> Option<ResourceTypeDocument> {
        self.resource_types()
            .into_iter()
            .find(|document| document.name.eq_ignore_ascii_case(name))
    }

    pub fn schemas(&self) -> Vec<&Schema> {
        self.registry.schemas()
    }

    pub fn schema(&self, id: &str) -> Option<&Schema> {
        self.registry.schema(id)
    }

    /// A schema definition rendered as a discovery document.
    pub fn schema_document(schema: &Schema) -> ScimResult<Value> {
        let mut document = serde_json::to_value(schema)
            .map_err(|e| ScimError::internal(format!("Failed to serialize schema: {}", e)))?;
        if let Value::Object(members) = &mut document {
            members.insert(
                "schemas".to_string(),
                Value::Array(vec![Value::String(identifiers::SCHEMA.to_string())]),
            );
        }
        Ok(document)
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }
}
