//! Query parameters and list responses.

use super::filter::FilterPredicate;
use crate::error::{ScimError, ScimResult};
use crate::resource::Projection;
use crate::schema::{identifiers, SchemaSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Paging window requested by a client.
///
/// `startIndex` is 1-based; values below 1 are treated as 1 and negative
/// counts as 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationParameters {
    start_index: Option<usize>,
    count: Option<usize>,
}

impl PaginationParameters {
    pub fn new(start_index: Option<i64>, count: Option<i64>) -> Self {
        Self {
            start_index: start_index.map(|index| index.max(1) as usize),
            count: count.map(|count| count.max(0) as usize),
        }
    }

    pub fn start_index(&self) -> usize {
        self.start_index.unwrap_or(1)
    }

    pub fn count(&self) -> Option<usize> {
        self.count
    }

    /// Slice `items` to this window, never returning more than `max_results`.
    pub fn window<T>(&self, items: Vec<T>, max_results: usize) -> Vec<T> {
        let limit = self.count.unwrap_or(max_results).min(max_results);
        items
            .into_iter()
            .skip(self.start_index() - 1)
            .take(limit)
            .collect()
    }
}

/// Decoded query-string parameters of a list or retrieve request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceQuery {
    /// Each `filter` parameter, parsed independently.
    pub filters: Vec<FilterPredicate>,
    pub projection: Projection,
    pub pagination: PaginationParameters,
}

impl ResourceQuery {
    /// Decode `filter`, `attributes`, `excludedAttributes`, `startIndex` and
    /// `count` from a URL query string. Unknown parameters are ignored.
    pub fn from_query_str(query: &str) -> ScimResult<Self> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.trim_start_matches('?'))
            .map_err(|e| ScimError::invalid_request(format!("invalid query string: {}", e)))?;

        let mut filters = Vec::new();
        let mut attributes = Vec::new();
        let mut excluded_attributes = Vec::new();
        let mut start_index = None;
        let mut count = None;

        for (key, value) in &pairs {
            match key.to_ascii_lowercase().as_str() {
                "filter" => filters.push(FilterPredicate::parse(value)?),
                "attributes" => attributes.extend(split_attribute_list(value)),
                "excludedattributes" => excluded_attributes.extend(split_attribute_list(value)),
                "startindex" => start_index = Some(parse_integer(key, value)?),
                "count" => count = Some(parse_integer(key, value)?),
                _ => {}
            }
        }

        Ok(Self {
            filters,
            projection: Projection::from_lists(attributes, excluded_attributes)?,
            pagination: PaginationParameters::new(start_index, count),
        })
    }

    /// The single filter this query carries, failing if there are several.
    pub fn single_filter(&self) -> ScimResult<Option<&FilterPredicate>> {
        match self.filters.as_slice() {
            [] => Ok(None),
            [filter] => Ok(Some(filter)),
            _ => Err(ScimError::invalid_request(format!(
                "expected at most one filter, found {}",
                self.filters.len()
            ))),
        }
    }
}

fn split_attribute_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn parse_integer(key: &str, value: &str) -> ScimResult<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ScimError::invalid_request(format!("'{}' must be an integer, got '{}'", key, value)))
}

/// RFC 7644 §3.4.2 list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub schemas: SchemaSet,
    pub total_results: usize,
    pub start_index: usize,
    pub items_per_page: usize,
    #[serde(rename = "Resources", default)]
    pub resources: Vec<Value>,
}

impl QueryResponse {
    pub fn new(resources: Vec<Value>, total_results: usize, start_index: usize) -> Self {
        Self {
            schemas: [identifiers::LIST_RESPONSE].into_iter().collect(),
            total_results,
            start_index,
            items_per_page: resources.len(),
            resources,
        }
    }
}
