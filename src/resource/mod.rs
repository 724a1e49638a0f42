//! Resource model.
//!
//! A [`Resource`] is a schema set, an optional server-assigned identifier, an
//! optional `meta` block and a JSON attribute map. Attributes of schema
//! extensions live under their schema URN inside that map, as they do on the
//! wire. Resources implement [`AttributeReader`] so filters can be evaluated
//! against them directly.
//!
//! # Key Types
//!
//! - [`Resource`] - A user, group or other SCIM resource
//! - [`ResourceKind`] - The resource types with built-in handling
//! - [`ResourceIdentity`] - Case-insensitive (schema, identifier) pair
//! - [`Projection`] - Attribute inclusion or exclusion for responses
//! - [`PatchApplier`] - Applies a patch request to a resource

pub mod meta;
pub mod patch;
pub mod projection;

pub use meta::Meta;
pub use patch::PatchApplier;
pub use projection::Projection;

use crate::error::{ScimError, ScimResult};
use crate::protocol::filter::{json_attribute_values, AttributeReader};
use crate::protocol::path::AttributePath;
use crate::schema::identifiers::{self, attributes, endpoints};
use crate::schema::SchemaSet;

use serde_json::{Map, Value};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Resource types with built-in handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    User,
    /// A User that also carries the Enterprise User extension
    EnterpriseUser,
    Group,
}

impl ResourceKind {
    /// The `meta.resourceType` value.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::User | ResourceKind::EnterpriseUser => "User",
            ResourceKind::Group => "Group",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ResourceKind::User | ResourceKind::EnterpriseUser => endpoints::USERS,
            ResourceKind::Group => endpoints::GROUPS,
        }
    }

    pub fn core_schema(&self) -> &'static str {
        match self {
            ResourceKind::User | ResourceKind::EnterpriseUser => identifiers::CORE_USER,
            ResourceKind::Group => identifiers::CORE_GROUP,
        }
    }

    /// Attribute whose value must be unique among resources of this type.
    pub fn natural_key(&self) -> &'static str {
        match self {
            ResourceKind::User | ResourceKind::EnterpriseUser => attributes::USER_NAME,
            ResourceKind::Group => attributes::DISPLAY_NAME,
        }
    }

    /// The kind served at an endpoint such as `/Users`.
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        let endpoint = endpoint.trim_end_matches('/');
        if endpoint.eq_ignore_ascii_case(endpoints::USERS) {
            Some(ResourceKind::User)
        } else if endpoint.eq_ignore_ascii_case(endpoints::GROUPS) {
            Some(ResourceKind::Group)
        } else {
            None
        }
    }

    /// User and Enterprise User share a store.
    pub fn same_store(&self, other: ResourceKind) -> bool {
        self.type_name() == other.type_name()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Identifies a stored resource; both parts compare ignoring case.
#[derive(Debug, Clone)]
pub struct ResourceIdentity {
    pub schema_identifier: String,
    pub identifier: String,
}

impl ResourceIdentity {
    pub fn new(schema_identifier: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            schema_identifier: schema_identifier.into(),
            identifier: identifier.into(),
        }
    }
}

impl PartialEq for ResourceIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.schema_identifier.eq_ignore_ascii_case(&other.schema_identifier)
            && self.identifier.eq_ignore_ascii_case(&other.identifier)
    }
}

impl Eq for ResourceIdentity {}

impl Hash for ResourceIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema_identifier.to_ascii_lowercase().hash(state);
        self.identifier.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schema_identifier, self.identifier)
    }
}

/// A SCIM resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub schemas: SchemaSet,
    pub id: Option<String>,
    pub meta: Option<Meta>,
    pub attributes: Map<String, Value>,
}

impl Resource {
    /// An empty resource declaring the given schemas.
    pub fn new<S: Into<String>>(schemas: impl IntoIterator<Item = S>) -> Self {
        Self {
            schemas: schemas.into_iter().collect(),
            id: None,
            meta: None,
            attributes: Map::new(),
        }
    }

    /// Build from a JSON object, separating `schemas`, `id` and `meta`.
    pub fn from_json(body: Value) -> ScimResult<Self> {
        let Value::Object(mut members) = body else {
            return Err(ScimError::invalid_request("resource must be a JSON object"));
        };

        let schemas = match take_member(&mut members, attributes::SCHEMAS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|identifier| !identifier.is_empty())
                .collect(),
            Some(_) | None => return Err(ScimError::UnidentifiableSchema),
        };

        let id = match take_member(&mut members, attributes::ID) {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) => Some(id),
            Some(other) => {
                return Err(ScimError::invalid_request(format!(
                    "'id' must be a string, got {}",
                    other
                )));
            }
        };

        let meta = match take_member(&mut members, attributes::META) {
            None | Some(Value::Null) => None,
            Some(meta) => Some(serde_json::from_value(meta)?),
        };

        Ok(Self {
            schemas,
            id,
            meta,
            attributes: members,
        })
    }

    /// Render as a JSON object in wire form.
    pub fn to_json(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            attributes::SCHEMAS.to_string(),
            Value::Array(self.schemas.to_vec().into_iter().map(Value::String).collect()),
        );
        if let Some(id) = &self.id {
            body.insert(attributes::ID.to_string(), Value::String(id.clone()));
        }
        for (name, value) in &self.attributes {
            body.insert(name.clone(), value.clone());
        }
        if let Some(meta) = &self.meta {
            if let Ok(meta) = serde_json::to_value(meta) {
                body.insert(attributes::META.to_string(), meta);
            }
        }
        Value::Object(body)
    }

    /// The resource kind its schemas declare, if any.
    pub fn kind(&self) -> Option<ResourceKind> {
        if self.schemas.contains(identifiers::CORE_USER) {
            if self.schemas.contains(identifiers::ENTERPRISE_USER) {
                Some(ResourceKind::EnterpriseUser)
            } else {
                Some(ResourceKind::User)
            }
        } else if self.schemas.contains(identifiers::CORE_GROUP) {
            Some(ResourceKind::Group)
        } else {
            None
        }
    }

    /// Case-insensitive top-level attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name).or_else(|| {
            self.attributes
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
    }

    /// A top-level string attribute.
    pub fn string_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Set a top-level attribute, replacing any entry that differs only in case.
    pub fn set_attribute(&mut self, name: &str, value: Value) {
        self.remove_attribute(name);
        self.attributes.insert(name.to_string(), value);
    }

    pub fn remove_attribute(&mut self, name: &str) -> Option<Value> {
        take_member(&mut self.attributes, name)
    }

    /// The value of this resource's natural key, if present and non-blank.
    pub fn natural_key_value(&self, kind: ResourceKind) -> Option<&str> {
        self.string_attribute(kind.natural_key())
            .filter(|value| !value.trim().is_empty())
    }

    pub fn identity(&self) -> Option<ResourceIdentity> {
        let schema = self
            .kind()
            .map(|kind| kind.core_schema().to_string())
            .or_else(|| self.schemas.to_vec().into_iter().next())?;
        self.id
            .as_ref()
            .map(|id| ResourceIdentity::new(schema, id.clone()))
    }
}

impl AttributeReader for Resource {
    fn attribute_values(&self, path: &AttributePath) -> Vec<String> {
        json_attribute_values(&self.to_json(), path)
    }
}

/// Remove a member, matching its name ignoring case.
pub(crate) fn take_member(members: &mut Map<String, Value>, name: &str) -> Option<Value> {
    if let Some(value) = members.remove(name) {
        return Some(value);
    }
    let key = members.keys().find(|key| key.eq_ignore_ascii_case(name)).cloned()?;
    members.remove(&key)
}
