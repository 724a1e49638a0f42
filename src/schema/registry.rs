//! Schema registry: known schema identifiers, resource types and extensions.
//!
//! The registry is the one piece of process-wide mutable state in the engine.
//! It is owned by whoever builds the dispatcher and shared through an `Arc`;
//! registration is idempotent and safe under concurrent callers.

use super::identifiers::{self, attributes};
use super::schema_set::SchemaSet;
use super::types::{AttributeDefinition, ResourceTypeDefinition, Schema};
use crate::error::ScimResult;

use log::debug;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A pluggable protocol object recognized by its schema identifiers.
///
/// Extensions are consulted by the dispatcher only after resource and
/// protocol-message dispatch have declined a payload.
pub trait ProtocolExtension: Send + Sync {
    /// The identifier this extension is registered under.
    fn schema_identifier(&self) -> &str;

    /// Whether this extension claims a payload with the given schemas.
    fn matches(&self, schemas: &SchemaSet) -> bool {
        schemas.contains(self.schema_identifier())
    }

    /// Materialize the payload. The default keeps it as-is.
    fn build(&self, payload: Value) -> ScimResult<Value> {
        Ok(payload)
    }
}

/// Registry of schemas and protocol extensions.
pub struct SchemaRegistry {
    known: SchemaSet,
    user: Arc<ResourceTypeDefinition>,
    group: Arc<ResourceTypeDefinition>,
    extensions: RwLock<Vec<Arc<dyn ProtocolExtension>>>,
}

impl SchemaRegistry {
    /// Create a registry holding the core User, Enterprise User and Group schemas.
    pub fn new() -> Self {
        let known: SchemaSet = [
            identifiers::CORE_USER,
            identifiers::ENTERPRISE_USER,
            identifiers::CORE_GROUP,
            identifiers::PATCH_OP,
            identifiers::ERROR,
            identifiers::LIST_RESPONSE,
            identifiers::SERVICE_PROVIDER_CONFIG,
            identifiers::RESOURCE_TYPE,
            identifiers::SCHEMA,
        ]
        .into_iter()
        .collect();

        let user = ResourceTypeDefinition {
            name: "User".to_string(),
            endpoint: identifiers::endpoints::USERS.to_string(),
            description: "User Account".to_string(),
            schema: core_user_schema(),
            extensions: vec![enterprise_user_schema()],
        };
        let group = ResourceTypeDefinition {
            name: "Group".to_string(),
            endpoint: identifiers::endpoints::GROUPS.to_string(),
            description: "Group".to_string(),
            schema: core_group_schema(),
            extensions: Vec::new(),
        };

        Self {
            known,
            user: Arc::new(user),
            group: Arc::new(group),
            extensions: RwLock::new(Vec::new()),
        }
    }

    /// Record an identifier as known. Returns `false` if it already was.
    pub fn register_identifier(&self, identifier: &str) -> bool {
        self.known.add(identifier.trim())
    }

    pub fn is_known(&self, identifier: &str) -> bool {
        self.known.contains(identifier.trim())
    }

    pub fn known_identifiers(&self) -> Vec<String> {
        self.known.to_vec()
    }

    /// Register a protocol extension.
    ///
    /// Returns `false` when an extension with the same identifier is already
    /// registered; the existing one stays in place.
    pub fn register_extension(&self, extension: Arc<dyn ProtocolExtension>) -> bool {
        let identifier = extension.schema_identifier().trim().to_string();
        let mut extensions = self.write_extensions();
        if extensions
            .iter()
            .any(|existing| identifiers::same_identifier(existing.schema_identifier(), &identifier))
        {
            return false;
        }
        extensions.push(extension);
        self.known.add(identifier.clone());
        debug!("Registered protocol extension '{}'", identifier);
        true
    }

    /// Snapshot of registered extensions in registration order.
    pub fn extensions(&self) -> Vec<Arc<dyn ProtocolExtension>> {
        self.read_extensions().clone()
    }

    pub fn user_type(&self) -> &Arc<ResourceTypeDefinition> {
        &self.user
    }

    pub fn group_type(&self) -> &Arc<ResourceTypeDefinition> {
        &self.group
    }

    pub fn resource_types(&self) -> Vec<&Arc<ResourceTypeDefinition>> {
        vec![&self.user, &self.group]
    }

    /// Every schema carried by a resource type, core schemas first.
    pub fn schemas(&self) -> Vec<&Schema> {
        let mut schemas = vec![&self.user.schema, &self.group.schema];
        schemas.extend(self.user.extensions.iter());
        schemas.extend(self.group.extensions.iter());
        schemas
    }

    pub fn schema(&self, id: &str) -> Option<&Schema> {
        self.schemas()
            .into_iter()
            .find(|schema| schema.id.eq_ignore_ascii_case(id))
    }

    fn read_extensions(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn ProtocolExtension>>> {
        self.extensions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_extensions(&self) -> RwLockWriteGuard<'_, Vec<Arc<dyn ProtocolExtension>>> {
        self.extensions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("known", &self.known)
            .field("extensions", &self.read_extensions().len())
            .finish()
    }
}

fn meta_attribute() -> AttributeDefinition {
    AttributeDefinition::complex(
        attributes::META,
        vec![
            AttributeDefinition::string("resourceType").read_only().case_exact(),
            AttributeDefinition::date_time("created").read_only(),
            AttributeDefinition::date_time("lastModified").read_only(),
            AttributeDefinition::reference("location").read_only().case_exact(),
            AttributeDefinition::string("version").read_only().case_exact(),
        ],
    )
    .read_only()
}

fn id_attribute() -> AttributeDefinition {
    AttributeDefinition::string(attributes::ID)
        .read_only()
        .case_exact()
        .unique()
        .returned("always")
}

fn multi_valued_typed(name: &str) -> AttributeDefinition {
    AttributeDefinition::complex(
        name,
        vec![
            AttributeDefinition::string("value"),
            AttributeDefinition::string("display"),
            AttributeDefinition::string("type"),
            AttributeDefinition::boolean("primary"),
        ],
    )
    .multi_valued()
}

fn core_user_schema() -> Schema {
    let mut attributes = vec![
        id_attribute(),
        AttributeDefinition::string(attributes::EXTERNAL_ID).case_exact(),
        AttributeDefinition::string(attributes::USER_NAME).required().unique(),
        AttributeDefinition::complex(
            "name",
            [
                "formatted",
                "familyName",
                "givenName",
                "middleName",
                "honorificPrefix",
                "honorificSuffix",
            ]
            .into_iter()
            .map(AttributeDefinition::string)
            .collect(),
        ),
    ];
    attributes.extend(
        [
            attributes::DISPLAY_NAME,
            "nickName",
            "title",
            "userType",
            "preferredLanguage",
            "locale",
            "timezone",
        ]
        .into_iter()
        .map(AttributeDefinition::string),
    );
    attributes.push(AttributeDefinition::reference("profileUrl"));
    attributes.push(AttributeDefinition::boolean("active"));
    attributes.push(AttributeDefinition::string("password").returned("never"));
    attributes.push(multi_valued_typed("emails"));
    attributes.push(multi_valued_typed("phoneNumbers"));
    attributes.push(multi_valued_typed("ims"));
    attributes.push(multi_valued_typed("photos"));
    attributes.push(multi_valued_typed("roles"));
    attributes.push(multi_valued_typed("entitlements"));
    attributes.push(
        AttributeDefinition::complex(
            "addresses",
            vec![
                AttributeDefinition::string("formatted"),
                AttributeDefinition::string("streetAddress"),
                AttributeDefinition::string("locality"),
                AttributeDefinition::string("region"),
                AttributeDefinition::string("postalCode"),
                AttributeDefinition::string("country"),
                AttributeDefinition::string("type"),
                AttributeDefinition::boolean("primary"),
            ],
        )
        .multi_valued(),
    );
    attributes.push(
        AttributeDefinition::complex(
            "groups",
            vec![
                AttributeDefinition::string("value").read_only(),
                AttributeDefinition::reference("$ref").read_only(),
                AttributeDefinition::string("display").read_only(),
                AttributeDefinition::string("type").read_only(),
            ],
        )
        .multi_valued()
        .read_only(),
    );
    attributes.push(meta_attribute());

    Schema::new(identifiers::CORE_USER, "User", "User Account", attributes)
}

fn enterprise_user_schema() -> Schema {
    let mut attributes: Vec<AttributeDefinition> = [
        "employeeNumber",
        "costCenter",
        "organization",
        "division",
        "department",
    ]
    .into_iter()
    .map(AttributeDefinition::string)
    .collect();
    attributes.push(AttributeDefinition::complex(
        "manager",
        vec![
            AttributeDefinition::string("value"),
            AttributeDefinition::reference("$ref"),
            AttributeDefinition::string("displayName").read_only(),
        ],
    ));

    Schema::new(
        identifiers::ENTERPRISE_USER,
        "EnterpriseUser",
        "Enterprise User",
        attributes,
    )
}

fn core_group_schema() -> Schema {
    Schema::new(
        identifiers::CORE_GROUP,
        "Group",
        "Group",
        vec![
            id_attribute(),
            AttributeDefinition::string(attributes::EXTERNAL_ID).case_exact(),
            AttributeDefinition::string(attributes::DISPLAY_NAME).required(),
            AttributeDefinition::complex(
                attributes::MEMBERS,
                vec![
                    AttributeDefinition::string("value").immutable(),
                    AttributeDefinition::reference("$ref").immutable(),
                    AttributeDefinition::string("display"),
                    AttributeDefinition::string("type").immutable(),
                ],
            )
            .multi_valued(),
            meta_attribute(),
        ],
    )
}
