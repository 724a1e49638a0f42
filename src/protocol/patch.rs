//! PATCH request model.
//!
//! A patch request is an ordered list of operations, each an [`OperationName`]
//! applied at an [`AttributePath`]. The operation's value is classified at
//! parse time into one of three shapes: a single string value, a list of
//! [`OperationValue`] elements, or an opaque JSON value that fits neither.
//!
//! Two parsing strategies exist. [`MultiValuedPatchStrategy`] accepts only
//! the list-of-objects value shape used by older clients;
//! [`CompliantPatchStrategy`] accepts every RFC 7644 shape. The dispatcher
//! tries the first and falls back to the second.

use super::path::AttributePath;
use crate::error::{ScimError, ScimResult};
use crate::protocol::filter::{lookup, ComparisonOperator};
use crate::schema::identifiers::{self, attributes};
use crate::schema::SchemaSet;

use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// The three PATCH operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    Add,
    Remove,
    Replace,
}

impl OperationName {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationName::Add => "add",
            OperationName::Remove => "remove",
            OperationName::Replace => "replace",
        }
    }
}

impl FromStr for OperationName {
    type Err = ScimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(OperationName::Add),
            "remove" => Ok(OperationName::Remove),
            "replace" => Ok(OperationName::Replace),
            other => Err(ScimError::invalid_request(format!(
                "unknown patch operation '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One element of a multi-valued operation value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OperationValue {
    /// The element's `value` member, or the element itself when it is a scalar.
    pub value: Option<Value>,
    /// Remaining members of a complex element.
    pub attributes: Map<String, Value>,
}

impl OperationValue {
    pub fn from_json(element: &Value) -> Self {
        match element {
            Value::Object(members) => {
                let mut attributes = members.clone();
                let value = attributes
                    .keys()
                    .find(|key| key.eq_ignore_ascii_case(attributes::VALUE))
                    .cloned()
                    .and_then(|key| attributes.remove(&key));
                Self { value, attributes }
            }
            scalar => Self {
                value: Some(scalar.clone()),
                attributes: Map::new(),
            },
        }
    }

    /// Render as an element of a complex multi-valued attribute.
    pub fn to_complex_element(&self) -> Value {
        let mut element = self.attributes.clone();
        if let Some(value) = &self.value {
            element.insert(attributes::VALUE.to_string(), value.clone());
        }
        Value::Object(element)
    }

    /// Render as an element of a simple multi-valued attribute.
    pub fn to_simple_element(&self) -> Value {
        match (&self.value, self.attributes.is_empty()) {
            (Some(value), true) => value.clone(),
            _ => self.to_complex_element(),
        }
    }

    /// The element's `value` member as a string, if it is a scalar.
    pub fn value_text(&self) -> Option<String> {
        self.value.as_ref().and_then(crate::protocol::filter::render_scalar)
    }
}

/// A single PATCH operation, classified by the shape of its value.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    SingleValued {
        name: OperationName,
        path: AttributePath,
        value: String,
    },
    Multi {
        name: OperationName,
        path: AttributePath,
        values: Vec<OperationValue>,
    },
    Combined {
        name: OperationName,
        path: AttributePath,
        raw_value: Option<Value>,
    },
}

impl PatchOperation {
    pub fn name(&self) -> OperationName {
        match self {
            PatchOperation::SingleValued { name, .. }
            | PatchOperation::Multi { name, .. }
            | PatchOperation::Combined { name, .. } => *name,
        }
    }

    pub fn path(&self) -> &AttributePath {
        match self {
            PatchOperation::SingleValued { path, .. }
            | PatchOperation::Multi { path, .. }
            | PatchOperation::Combined { path, .. } => path,
        }
    }

    /// Resolve an operation whose `value` member is absent.
    ///
    /// `remove` on a membership attribute with a single `eq` predicate and
    /// no value is the compact "remove member where value eq X" form: it is
    /// rewritten to remove the value X from the bare attribute. Any other
    /// operator leaves the filter in place for the applier to reject.
    pub fn without_value(
        name: OperationName,
        path: AttributePath,
        membership_attributes: &[String],
    ) -> Option<Self> {
        let is_membership = membership_attributes
            .iter()
            .any(|attribute| attribute.eq_ignore_ascii_case(path.attribute_name()));
        let filter = path
            .sub_attribute_filter()
            .filter(|filter| filter.len() == 1 && filter.operator() == ComparisonOperator::Equals)?;
        if name != OperationName::Remove || !is_membership {
            return None;
        }

        let mut bare = AttributePath::named(path.attribute_name());
        if let Some(schema) = path.schema_identifier() {
            bare = bare.with_schema(schema);
        }
        Some(PatchOperation::SingleValued {
            name,
            value: filter.comparison_value().to_string(),
            path: bare,
        })
    }

    pub fn to_json(&self) -> Value {
        let mut operation = json!({
            "op": self.name().as_str(),
            "path": self.path().to_string(),
        });
        let value = match self {
            PatchOperation::SingleValued { value, .. } => Some(Value::String(value.clone())),
            PatchOperation::Multi { values, .. } => Some(Value::Array(
                values.iter().map(OperationValue::to_simple_element).collect(),
            )),
            PatchOperation::Combined { raw_value, .. } => raw_value.clone(),
        };
        if let (Some(value), Some(object)) = (value, operation.as_object_mut()) {
            object.insert(attributes::VALUE.to_string(), value);
        }
        operation
    }
}

/// An ordered sequence of patch operations.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchRequest {
    pub schemas: SchemaSet,
    pub operations: Vec<PatchOperation>,
}

impl PatchRequest {
    pub fn new(operations: Vec<PatchOperation>) -> Self {
        Self {
            schemas: [identifiers::PATCH_OP].into_iter().collect(),
            operations,
        }
    }

    /// Parse a request body with the given value-shape strategy.
    pub fn from_json_with(
        strategy: &dyn PatchRequestStrategy,
        body: &Value,
        membership_attributes: &[String],
    ) -> ScimResult<Self> {
        let schemas = match lookup(body, attributes::SCHEMAS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .collect::<SchemaSet>(),
            _ => return Err(ScimError::UnidentifiableSchema),
        };

        let operations = match lookup(body, attributes::OPERATIONS) {
            Some(Value::Array(operations)) => operations,
            Some(_) => {
                return Err(ScimError::invalid_request(
                    "'Operations' must be an array",
                ));
            }
            None => return Err(ScimError::invalid_request("missing 'Operations'")),
        };

        let operations = operations
            .iter()
            .map(|operation| {
                let (name, path, value) = operation_parts(operation)?;
                strategy.operation(name, path, value, membership_attributes)
            })
            .collect::<ScimResult<Vec<_>>>()?;

        Ok(Self {
            schemas,
            operations,
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "schemas": self.schemas,
            "Operations": self.operations.iter().map(PatchOperation::to_json).collect::<Vec<_>>(),
        })
    }
}

fn operation_parts(operation: &Value) -> ScimResult<(OperationName, AttributePath, Option<&Value>)> {
    if !operation.is_object() {
        return Err(ScimError::invalid_request("patch operation must be an object"));
    }
    let name = lookup(operation, "op")
        .and_then(Value::as_str)
        .ok_or_else(|| ScimError::invalid_request("patch operation is missing 'op'"))?
        .parse::<OperationName>()?;
    let path = lookup(operation, "path")
        .and_then(Value::as_str)
        .filter(|path| !path.trim().is_empty())
        .ok_or_else(|| ScimError::invalid_request("patch operation is missing 'path'"))?;
    let path = AttributePath::parse(path)?;
    let value = lookup(operation, attributes::VALUE).filter(|value| !value.is_null());
    Ok((name, path, value))
}

/// Classifies an operation's value into a [`PatchOperation`] shape.
pub trait PatchRequestStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn operation(
        &self,
        name: OperationName,
        path: AttributePath,
        value: Option<&Value>,
        membership_attributes: &[String],
    ) -> ScimResult<PatchOperation>;
}

/// Accepts only an absent value or an array of objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiValuedPatchStrategy;

impl PatchRequestStrategy for MultiValuedPatchStrategy {
    fn name(&self) -> &'static str {
        "multi-valued"
    }

    fn operation(
        &self,
        name: OperationName,
        path: AttributePath,
        value: Option<&Value>,
        membership_attributes: &[String],
    ) -> ScimResult<PatchOperation> {
        match value {
            None => Ok(
                PatchOperation::without_value(name, path.clone(), membership_attributes)
                    .unwrap_or(PatchOperation::Multi {
                        name,
                        path,
                        values: Vec::new(),
                    }),
            ),
            Some(Value::Array(elements)) if elements.iter().all(Value::is_object) => {
                Ok(PatchOperation::Multi {
                    name,
                    path,
                    values: elements.iter().map(OperationValue::from_json).collect(),
                })
            }
            Some(other) => Err(ScimError::invalid_request(format!(
                "value of '{}' operation on '{}' is not a list of objects: {}",
                name, path, other
            ))),
        }
    }
}

/// Accepts every RFC 7644 value shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompliantPatchStrategy;

impl PatchRequestStrategy for CompliantPatchStrategy {
    fn name(&self) -> &'static str {
        "compliant"
    }

    fn operation(
        &self,
        name: OperationName,
        path: AttributePath,
        value: Option<&Value>,
        membership_attributes: &[String],
    ) -> ScimResult<PatchOperation> {
        let operation = match value {
            None => PatchOperation::without_value(name, path.clone(), membership_attributes)
                .unwrap_or(PatchOperation::Combined {
                    name,
                    path,
                    raw_value: None,
                }),
            Some(Value::String(value)) => PatchOperation::SingleValued {
                name,
                path,
                value: value.clone(),
            },
            Some(scalar @ (Value::Bool(_) | Value::Number(_))) => PatchOperation::SingleValued {
                name,
                path,
                value: scalar.to_string(),
            },
            Some(Value::Array(elements)) => PatchOperation::Multi {
                name,
                path,
                values: elements.iter().map(OperationValue::from_json).collect(),
            },
            Some(other) => PatchOperation::Combined {
                name,
                path,
                raw_value: Some(other.clone()),
            },
        };
        Ok(operation)
    }
}
