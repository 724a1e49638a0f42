//! Schema type definitions for SCIM resources.
//!
//! These structures describe the attribute graph of each resource type: the
//! patch applier consults them for cardinality, mutability and value coercion,
//! and the discovery endpoints serialize them as RFC 7643 schema documents.

use serde::{Deserialize, Serialize};

/// A SCIM schema definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    /// Unique schema identifier (URI)
    pub id: String,
    /// Human-readable schema name
    pub name: String,
    pub description: String,
    pub attributes: Vec<AttributeDefinition>,
}

impl Schema {
    pub fn new(id: &str, name: &str, description: &str, attributes: Vec<AttributeDefinition>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            attributes,
        }
    }

    /// Look up a top-level attribute by name, ignoring case.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }
}

/// Definition of a SCIM attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: AttributeType,
    pub multi_valued: bool,
    pub required: bool,
    /// Whether string comparison is case-sensitive
    pub case_exact: bool,
    pub mutability: Mutability,
    pub uniqueness: Uniqueness,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub canonical_values: Vec<String>,
    /// Sub-attributes for complex types
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_attributes: Vec<AttributeDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returned: Option<String>,
}

impl Default for AttributeDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            data_type: AttributeType::String,
            multi_valued: false,
            required: false,
            case_exact: false,
            mutability: Mutability::ReadWrite,
            uniqueness: Uniqueness::None,
            canonical_values: Vec::new(),
            sub_attributes: Vec::new(),
            returned: None,
        }
    }
}

impl AttributeDefinition {
    pub fn of_type(name: &str, data_type: AttributeType) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            ..Default::default()
        }
    }

    pub fn string(name: &str) -> Self {
        Self::of_type(name, AttributeType::String)
    }

    pub fn boolean(name: &str) -> Self {
        Self::of_type(name, AttributeType::Boolean)
    }

    pub fn reference(name: &str) -> Self {
        Self::of_type(name, AttributeType::Reference)
    }

    pub fn date_time(name: &str) -> Self {
        Self::of_type(name, AttributeType::DateTime)
    }

    pub fn complex(name: &str, sub_attributes: Vec<AttributeDefinition>) -> Self {
        Self {
            sub_attributes,
            ..Self::of_type(name, AttributeType::Complex)
        }
    }

    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn case_exact(mut self) -> Self {
        self.case_exact = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.mutability = Mutability::ReadOnly;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.mutability = Mutability::Immutable;
        self
    }

    pub fn unique(mut self) -> Self {
        self.uniqueness = Uniqueness::Server;
        self
    }

    pub fn returned(mut self, returned: &str) -> Self {
        self.returned = Some(returned.to_string());
        self
    }

    /// Look up a sub-attribute by name, ignoring case.
    pub fn sub_attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.sub_attributes
            .iter()
            .find(|attribute| attribute.name.eq_ignore_ascii_case(name))
    }

    pub fn is_read_only(&self) -> bool {
        self.mutability == Mutability::ReadOnly
    }
}

/// SCIM attribute data types.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AttributeType {
    #[default]
    String,
    Boolean,
    Decimal,
    Integer,
    /// DateTime in RFC3339 format
    DateTime,
    /// Binary data (base64 encoded)
    Binary,
    Reference,
    Complex,
}

/// Attribute mutability characteristics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mutability {
    /// Managed by the server
    ReadOnly,
    #[default]
    ReadWrite,
    /// Set once, never modified
    Immutable,
    WriteOnly,
}

/// Attribute uniqueness constraints.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Uniqueness {
    #[default]
    None,
    Server,
    Global,
}

/// A resource type: its endpoint, core schema and the extensions it accepts.
#[derive(Debug, Clone)]
pub struct ResourceTypeDefinition {
    pub name: String,
    pub endpoint: String,
    pub description: String,
    pub schema: Schema,
    pub extensions: Vec<Schema>,
}

impl ResourceTypeDefinition {
    /// Resolve an attribute, optionally qualified by a schema identifier.
    ///
    /// Unqualified names are looked up in the core schema first, then in each
    /// extension in declaration order.
    pub fn resolve(
        &self,
        schema_identifier: Option<&str>,
        attribute_name: &str,
    ) -> Option<(&Schema, &AttributeDefinition)> {
        match schema_identifier {
            Some(identifier) => self
                .schemas()
                .find(|schema| schema.id.eq_ignore_ascii_case(identifier))
                .and_then(|schema| schema.attribute(attribute_name).map(|a| (schema, a))),
            None => self
                .schemas()
                .find_map(|schema| schema.attribute(attribute_name).map(|a| (schema, a))),
        }
    }

    /// True when `identifier` names one of this type's extension schemas.
    pub fn is_extension(&self, identifier: &str) -> bool {
        self.extensions
            .iter()
            .any(|schema| schema.id.eq_ignore_ascii_case(identifier))
    }

    pub fn schemas(&self) -> impl Iterator<Item = &Schema> {
        std::iter::once(&self.schema).chain(self.extensions.iter())
    }
}
