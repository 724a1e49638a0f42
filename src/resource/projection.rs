//! Attribute projection (`attributes` / `excludedAttributes`).

use crate::error::{ScimError, ScimResult};
use crate::protocol::path::AttributePath;
use crate::schema::identifiers::attributes;

use serde_json::{Map, Value};

/// Which attributes a response carries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    #[default]
    All,
    /// Only these attributes, plus `id`, `schemas` and `meta`.
    Include(Vec<AttributePath>),
    /// Everything except these attributes.
    Exclude(Vec<AttributePath>),
}

impl Projection {
    /// Build from the two query lists. Supplying both is rejected.
    pub fn from_lists(include: Vec<String>, exclude: Vec<String>) -> ScimResult<Self> {
        let parse = |names: Vec<String>| -> ScimResult<Vec<AttributePath>> {
            names
                .iter()
                .map(|name| AttributePath::parse(name).map_err(ScimError::from))
                .collect()
        };
        match (include.is_empty(), exclude.is_empty()) {
            (true, true) => Ok(Projection::All),
            (false, true) => Ok(Projection::Include(parse(include)?)),
            (true, false) => Ok(Projection::Exclude(parse(exclude)?)),
            (false, false) => Err(ScimError::invalid_request(
                "'attributes' and 'excludedAttributes' cannot be combined",
            )),
        }
    }

    /// True when `attribute` would be suppressed by an exclusion.
    pub fn excludes(&self, attribute: &str) -> bool {
        match self {
            Projection::Exclude(paths) => paths.iter().any(|path| path.is_simple(attribute)),
            _ => false,
        }
    }

    /// Apply to a rendered resource.
    pub fn apply(&self, body: &mut Value) {
        let Some(object) = body.as_object_mut() else {
            return;
        };
        match self {
            Projection::All => {}
            Projection::Exclude(paths) => {
                for path in paths {
                    remove_path(object, path);
                }
            }
            Projection::Include(paths) => retain_paths(object, paths),
        }
    }
}

fn always_returned(name: &str) -> bool {
    [attributes::ID, attributes::SCHEMAS, attributes::META]
        .iter()
        .any(|always| always.eq_ignore_ascii_case(name))
}

fn key_of(map: &Map<String, Value>, name: &str) -> Option<String> {
    map.keys().find(|key| key.eq_ignore_ascii_case(name)).cloned()
}

fn scope_mut<'a>(
    object: &'a mut Map<String, Value>,
    path: &AttributePath,
) -> Option<&'a mut Map<String, Value>> {
    match path.schema_identifier() {
        None => Some(object),
        Some(schema) => {
            let key = key_of(object, schema)?;
            object.get_mut(&key).and_then(Value::as_object_mut)
        }
    }
}

fn remove_path(object: &mut Map<String, Value>, path: &AttributePath) {
    if path.schema_identifier().is_none() && always_returned(path.attribute_name()) {
        return;
    }
    let Some(scope) = scope_mut(object, path) else {
        return;
    };
    let Some(key) = key_of(scope, path.attribute_name()) else {
        return;
    };
    match (path.trailing_sub_attribute(), scope.get_mut(&key)) {
        (None, _) => {
            scope.remove(&key);
        }
        (Some(sub), Some(Value::Object(inner))) => {
            if let Some(sub_key) = key_of(inner, sub) {
                inner.remove(&sub_key);
            }
        }
        (Some(sub), Some(Value::Array(items))) => {
            for inner in items.iter_mut().filter_map(Value::as_object_mut) {
                if let Some(sub_key) = key_of(inner, sub) {
                    inner.remove(&sub_key);
                }
            }
        }
        _ => {}
    }
}

fn retain_paths(object: &mut Map<String, Value>, paths: &[AttributePath]) {
    let original = std::mem::take(object);
    for (key, value) in original {
        if always_returned(&key) {
            object.insert(key, value);
            continue;
        }

        if key.to_ascii_lowercase().starts_with("urn:") {
            let wanted: Vec<AttributePath> = paths
                .iter()
                .filter(|path| path.schema_identifier().is_some_and(|s| s.eq_ignore_ascii_case(&key)))
                .map(|path| {
                    let bare = AttributePath::named(path.attribute_name());
                    match path.trailing_sub_attribute() {
                        Some(sub) => bare.with_sub_attribute(sub),
                        None => bare,
                    }
                })
                .collect();
            if let Value::Object(mut inner) = value {
                if !wanted.is_empty() {
                    retain_paths(&mut inner, &wanted);
                    if !inner.is_empty() {
                        object.insert(key, Value::Object(inner));
                    }
                }
            }
            continue;
        }

        let matching: Vec<&AttributePath> = paths
            .iter()
            .filter(|path| path.attribute_name().eq_ignore_ascii_case(&key))
            .collect();
        if matching.is_empty() {
            continue;
        }
        if matching.iter().any(|path| path.trailing_sub_attribute().is_none()) {
            object.insert(key, value);
            continue;
        }

        let keep = |inner: &mut Map<String, Value>| {
            inner.retain(|sub, _| {
                matching
                    .iter()
                    .filter_map(|path| path.trailing_sub_attribute())
                    .any(|wanted| wanted.eq_ignore_ascii_case(sub))
            })
        };
        let mut value = value;
        match &mut value {
            Value::Object(inner) => keep(inner),
            Value::Array(items) => items.iter_mut().filter_map(Value::as_object_mut).for_each(keep),
            _ => {}
        }
        object.insert(key, value);
    }
}
