//! PATCH application.
//!
//! [`PatchApplier`] applies the operations of a [`PatchRequest`] in order to a
//! copy of a resource. Each operation sees the effects of the ones before it.
//! Any failure discards the copy, so the caller's resource is only ever
//! replaced by a fully patched one.

use super::{Resource, take_member};
use crate::error::{ScimError, ScimResult};
use crate::protocol::filter::{render_scalar, CaseMode, ComparisonOperator, FilterError, FilterPredicate};
use crate::protocol::patch::{OperationName, OperationValue, PatchOperation, PatchRequest};
use crate::schema::identifiers::attributes;
use crate::schema::{AttributeDefinition, AttributeType, ResourceTypeDefinition};

use log::trace;
use serde_json::{Map, Value};

/// Applies patch requests against one resource type's schemas.
#[derive(Debug, Clone, Copy)]
pub struct PatchApplier<'a> {
    definition: &'a ResourceTypeDefinition,
}

/// What an operation addresses once its path is resolved.
struct Target<'a> {
    attribute: &'a AttributeDefinition,
    sub_attribute: Option<&'a AttributeDefinition>,
    filter: Option<&'a FilterPredicate>,
}

impl<'a> PatchApplier<'a> {
    pub fn new(definition: &'a ResourceTypeDefinition) -> Self {
        Self { definition }
    }

    /// Apply every operation in order, returning the patched resource.
    pub fn apply(&self, resource: &Resource, request: &PatchRequest) -> ScimResult<Resource> {
        let mut working = resource.clone();
        for (index, operation) in request.operations.iter().enumerate() {
            trace!(
                "Applying patch operation {} '{}' on '{}'",
                index,
                operation.name(),
                operation.path()
            );
            self.apply_operation(&mut working, operation)?;
        }
        Ok(working)
    }

    fn apply_operation(&self, working: &mut Resource, operation: &PatchOperation) -> ScimResult<()> {
        let path = operation.path();
        let unknown = || ScimError::unknown_attribute(path.to_string(), &self.definition.name);

        let (schema, attribute) = self
            .definition
            .resolve(path.schema_identifier(), path.attribute_name())
            .ok_or_else(unknown)?;
        let sub_attribute = match path.trailing_sub_attribute() {
            Some(name) => Some(attribute.sub_attribute(name).ok_or_else(unknown)?),
            None => None,
        };
        if let Some(read_only) = std::iter::once(attribute)
            .chain(sub_attribute)
            .find(|definition| definition.is_read_only())
        {
            return Err(ScimError::ReadOnlyAttribute {
                attribute: read_only.name.clone(),
            });
        }
        if path.sub_attribute_filter().is_some() && !attribute.multi_valued {
            return Err(ScimError::invalid_request(format!(
                "'{}' is single-valued and cannot be filtered",
                attribute.name
            )));
        }

        if let Some(unsupported) = path
            .sub_attribute_filter()
            .and_then(|filter| filter.iter().find(|p| p.operator() != ComparisonOperator::Equals))
        {
            return Err(FilterError::UnsupportedOperator {
                operator: unsupported.operator().keyword().to_string(),
            }
            .into());
        }

        let target = Target {
            attribute,
            sub_attribute,
            filter: path.sub_attribute_filter(),
        };
        let values = supplied_values(operation);
        let extension = self
            .definition
            .is_extension(&schema.id)
            .then(|| schema.id.clone());
        let name = operation.name();

        let Some(container) = container_mut(&mut working.attributes, extension.as_deref(), name != OperationName::Remove)
        else {
            return Ok(());
        };
        match name {
            OperationName::Add | OperationName::Replace => set(container, &target, name, values)?,
            OperationName::Remove => remove(container, &target, &values)?,
        }

        if let Some(extension) = extension {
            let emptied = matches!(
                working.attributes.get(&extension),
                Some(Value::Object(members)) if members.is_empty()
            );
            if emptied {
                working.attributes.remove(&extension);
            } else if name != OperationName::Remove {
                working.schemas.add(extension);
            }
        }
        Ok(())
    }
}

/// Raw values carried by an operation, in order. Empty when none were given.
fn supplied_values(operation: &PatchOperation) -> Vec<Value> {
    match operation {
        PatchOperation::SingleValued { value, .. } => vec![Value::String(value.clone())],
        PatchOperation::Multi { values, .. } => values.iter().map(OperationValue::to_simple_element).collect(),
        PatchOperation::Combined { raw_value, .. } => match raw_value {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(elements)) => elements.clone(),
            Some(other) => vec![other.clone()],
        },
    }
}

fn container_mut<'m>(
    attributes: &'m mut Map<String, Value>,
    extension: Option<&str>,
    create: bool,
) -> Option<&'m mut Map<String, Value>> {
    let Some(extension) = extension else {
        return Some(attributes);
    };
    let key = key_of(attributes, extension).unwrap_or_else(|| extension.to_string());
    if create {
        let entry = attributes
            .entry(key)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        entry.as_object_mut()
    } else {
        attributes.get_mut(&key).and_then(Value::as_object_mut)
    }
}

fn key_of(map: &Map<String, Value>, name: &str) -> Option<String> {
    map.keys().find(|key| key.eq_ignore_ascii_case(name)).cloned()
}

fn set(
    container: &mut Map<String, Value>,
    target: &Target<'_>,
    name: OperationName,
    values: Vec<Value>,
) -> ScimResult<()> {
    let attribute = target.attribute;
    if values.is_empty() {
        return Err(ScimError::invalid_request(format!(
            "'{}' on '{}' requires a value",
            name, attribute.name
        )));
    }
    let key = key_of(container, &attribute.name).unwrap_or_else(|| attribute.name.clone());

    if !attribute.multi_valued {
        match target.sub_attribute {
            Some(sub) => {
                let value = coerce(sub, single(values, &attribute.name)?)?;
                let entry = container.entry(key).or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Some(members) = entry.as_object_mut() {
                    let sub_key = key_of(members, &sub.name).unwrap_or_else(|| sub.name.clone());
                    members.insert(sub_key, value);
                }
            }
            None if attribute.data_type == AttributeType::Complex => {
                let value = single(values, &attribute.name)?;
                let entry = container.entry(key).or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                if let Some(members) = entry.as_object_mut() {
                    merge_complex(members, attribute, &value)?;
                }
            }
            None => {
                let value = coerce(attribute, unwrap_value_member(single(values, &attribute.name)?))?;
                container.insert(key, value);
            }
        }
        return Ok(());
    }

    match (target.filter, target.sub_attribute) {
        (Some(filter), sub) => {
            let value = single(values, &attribute.name)?;
            let Some(Value::Array(items)) = container.get_mut(&key) else {
                return Ok(());
            };
            let flags = match_flags(items, filter, attribute)?;
            for (element, _) in items.iter_mut().zip(flags).filter(|(_, matched)| *matched) {
                let Some(members) = element.as_object_mut() else {
                    continue;
                };
                match sub {
                    Some(sub) => {
                        let sub_key = key_of(members, &sub.name).unwrap_or_else(|| sub.name.clone());
                        members.insert(sub_key, coerce(sub, value.clone())?);
                    }
                    None if value.is_object() => merge_complex(members, attribute, &value)?,
                    None => {
                        let value_definition = attribute.sub_attribute(attributes::VALUE);
                        let coerced = match value_definition {
                            Some(definition) => coerce(definition, value.clone())?,
                            None => value.clone(),
                        };
                        members.insert(attributes::VALUE.to_string(), coerced);
                    }
                }
            }
        }
        (None, Some(sub)) => {
            let value = coerce(sub, single(values, &attribute.name)?)?;
            if let Some(Value::Array(items)) = container.get_mut(&key) {
                for members in items.iter_mut().filter_map(Value::as_object_mut) {
                    let sub_key = key_of(members, &sub.name).unwrap_or_else(|| sub.name.clone());
                    members.insert(sub_key, value.clone());
                }
            }
        }
        (None, None) => {
            let elements = values
                .into_iter()
                .map(|value| element(attribute, value))
                .collect::<ScimResult<Vec<_>>>()?;
            match name {
                OperationName::Replace => {
                    container.insert(key, Value::Array(elements));
                }
                _ => match container.get_mut(&key) {
                    Some(Value::Array(items)) => items.extend(elements),
                    _ => {
                        container.insert(key, Value::Array(elements));
                    }
                },
            }
        }
    }
    Ok(())
}

fn remove(container: &mut Map<String, Value>, target: &Target<'_>, values: &[Value]) -> ScimResult<()> {
    let attribute = target.attribute;
    let Some(key) = key_of(container, &attribute.name) else {
        return Ok(());
    };

    if !attribute.multi_valued {
        match target.sub_attribute {
            Some(sub) => {
                if let Some(Value::Object(members)) = container.get_mut(&key) {
                    take_member(members, &sub.name);
                    if members.is_empty() {
                        container.remove(&key);
                    }
                }
            }
            None => {
                container.remove(&key);
            }
        }
        return Ok(());
    }

    let Some(Value::Array(items)) = container.get_mut(&key) else {
        container.remove(&key);
        return Ok(());
    };

    match (target.filter, target.sub_attribute) {
        (Some(filter), Some(sub)) => {
            let flags = match_flags(items, filter, attribute)?;
            for (element, _) in items.iter_mut().zip(flags).filter(|(_, matched)| *matched) {
                if let Some(members) = element.as_object_mut() {
                    take_member(members, &sub.name);
                }
            }
        }
        (Some(filter), None) => {
            let flags = match_flags(items, filter, attribute)?;
            let mut flags = flags.into_iter();
            items.retain(|_| !flags.next().unwrap_or(false));
        }
        (None, Some(sub)) => {
            for members in items.iter_mut().filter_map(Value::as_object_mut) {
                take_member(members, &sub.name);
            }
        }
        (None, None) if !values.is_empty() => {
            let doomed: Vec<String> = values.iter().filter_map(value_text).collect();
            items.retain(|element| {
                value_text(element)
                    .is_none_or(|text| !doomed.iter().any(|gone| gone.eq_ignore_ascii_case(&text)))
            });
        }
        (None, None) => {
            container.remove(&key);
            return Ok(());
        }
    }

    if matches!(container.get(&key), Some(Value::Array(items)) if items.is_empty()) {
        container.remove(&key);
    }
    Ok(())
}

fn match_flags(items: &[Value], filter: &FilterPredicate, attribute: &AttributeDefinition) -> ScimResult<Vec<bool>> {
    let case_exact = attribute
        .sub_attribute(filter.attribute_path().attribute_name())
        .is_some_and(|definition| definition.case_exact);
    let mode = if case_exact {
        CaseMode::Exact
    } else {
        CaseMode::IgnoreCase
    };
    items
        .iter()
        .map(|item| filter.matches(item, mode).map_err(ScimError::from))
        .collect()
}

fn single(values: Vec<Value>, attribute: &str) -> ScimResult<Value> {
    let mut values = values.into_iter();
    match (values.next(), values.next()) {
        (Some(value), None) => Ok(value),
        _ => Err(ScimError::invalid_request(format!(
            "'{}' expects exactly one value",
            attribute
        ))),
    }
}

/// `{"value": x}` stands for `x` when a scalar is expected.
fn unwrap_value_member(value: Value) -> Value {
    match value {
        Value::Object(mut members) if members.len() == 1 => {
            take_member(&mut members, attributes::VALUE).unwrap_or(Value::Object(members))
        }
        other => other,
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(members) => members
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(attributes::VALUE))
            .and_then(|(_, value)| render_scalar(value)),
        scalar => render_scalar(scalar),
    }
}

/// Render one element of a multi-valued attribute.
fn element(attribute: &AttributeDefinition, value: Value) -> ScimResult<Value> {
    if attribute.data_type != AttributeType::Complex {
        return coerce(attribute, value);
    }
    let mut members = Map::new();
    match value {
        Value::Object(_) => merge_complex(&mut members, attribute, &value)?,
        scalar => {
            let coerced = match attribute.sub_attribute(attributes::VALUE) {
                Some(definition) => coerce(definition, scalar)?,
                None => scalar,
            };
            members.insert(attributes::VALUE.to_string(), coerced);
        }
    }
    Ok(Value::Object(members))
}

/// Merge the members of `value` into a complex attribute value.
fn merge_complex(
    members: &mut Map<String, Value>,
    attribute: &AttributeDefinition,
    value: &Value,
) -> ScimResult<()> {
    let Value::Object(incoming) = value else {
        return Err(ScimError::invalid_request(format!(
            "'{}' is complex and requires an object value",
            attribute.name
        )));
    };
    for (name, sub_value) in incoming {
        let definition = attribute.sub_attribute(name).ok_or_else(|| {
            ScimError::unknown_attribute(format!("{}.{}", attribute.name, name), &attribute.name)
        })?;
        take_member(members, &definition.name);
        members.insert(definition.name.clone(), coerce(definition, sub_value.clone())?);
    }
    Ok(())
}

/// Convert a supplied value to the attribute's declared type.
fn coerce(definition: &AttributeDefinition, value: Value) -> ScimResult<Value> {
    let mismatch = |value: &Value| {
        ScimError::invalid_request(format!(
            "value {} is not valid for '{}' of type {:?}",
            value, definition.name, definition.data_type
        ))
    };
    match (definition.data_type, value) {
        (AttributeType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
        (AttributeType::Boolean, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch(&Value::String(text))),
        },
        (AttributeType::Integer, Value::Number(n)) if n.is_i64() => Ok(Value::Number(n)),
        (AttributeType::Integer, Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| mismatch(&Value::String(text))),
        (AttributeType::Decimal, Value::Number(n)) => Ok(Value::Number(n)),
        (AttributeType::Decimal, Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch(&Value::String(text))),
        (AttributeType::Complex, value @ Value::Object(_)) => Ok(value),
        (
            AttributeType::String
            | AttributeType::Reference
            | AttributeType::DateTime
            | AttributeType::Binary,
            value,
        ) => match value {
            Value::String(_) => Ok(value),
            Value::Bool(_) | Value::Number(_) => Ok(Value::String(value.to_string())),
            other => Err(mismatch(&other)),
        },
        (_, other) => Err(mismatch(&other)),
    }
}
