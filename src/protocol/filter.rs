//! Query filters.
//!
//! A filter is a linear conjunction of comparisons, `path op value [and ...]`,
//! represented as a chain of [`FilterPredicate`] nodes linked through `next`.
//! Logical `or`, `not` and parenthesized grouping are rejected as unsupported
//! grammar. Every RFC 7644 comparison operator is recognized, but only `eq` is
//! evaluated: a filter that parses but uses another operator fails with
//! [`FilterError::UnsupportedOperator`] so callers can tell "not implemented"
//! apart from "malformed".
//!
//! ```rust
//! use scim_protocol::protocol::FilterPredicate;
//!
//! let filter = FilterPredicate::parse(r#"userName eq "alice" and active eq true"#).unwrap();
//! assert_eq!(filter.len(), 2);
//! assert_eq!(filter.to_string(), r#"userName eq "alice" and active eq "true""#);
//! ```

use super::lexer::{quote, Cursor};
use super::path::AttributePath;
use crate::schema::identifiers::attributes;

use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Failure to parse or evaluate a filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("malformed filter: {message}")]
    Malformed { message: String },

    #[error("malformed comparison value: {message}")]
    MalformedValue { message: String },

    #[error("unsupported filter grammar: {construct}")]
    UnsupportedGrammar { construct: String },

    #[error("unsupported comparison operator '{operator}'")]
    UnsupportedOperator { operator: String },
}

impl FilterError {
    fn malformed(message: impl Into<String>) -> Self {
        FilterError::Malformed {
            message: message.into(),
        }
    }

    fn grammar(construct: &str) -> Self {
        FilterError::UnsupportedGrammar {
            construct: construct.to_string(),
        }
    }
}

/// RFC 7644 comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Present,
}

impl ComparisonOperator {
    /// Look up an operator keyword, ignoring case.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let operator = match keyword.to_ascii_lowercase().as_str() {
            "eq" => Self::Equals,
            "ne" => Self::NotEquals,
            "co" => Self::Contains,
            "sw" => Self::StartsWith,
            "ew" => Self::EndsWith,
            "gt" => Self::GreaterThan,
            "ge" => Self::GreaterThanOrEqual,
            "lt" => Self::LessThan,
            "le" => Self::LessThanOrEqual,
            "pr" => Self::Present,
            _ => return None,
        };
        Some(operator)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Equals => "eq",
            Self::NotEquals => "ne",
            Self::Contains => "co",
            Self::StartsWith => "sw",
            Self::EndsWith => "ew",
            Self::GreaterThan => "gt",
            Self::GreaterThanOrEqual => "ge",
            Self::LessThan => "lt",
            Self::LessThanOrEqual => "le",
            Self::Present => "pr",
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// How string values are compared during evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseMode {
    Exact,
    #[default]
    IgnoreCase,
}

impl CaseMode {
    fn equals(self, left: &str, right: &str) -> bool {
        match self {
            CaseMode::Exact => left == right,
            CaseMode::IgnoreCase => left.eq_ignore_ascii_case(right),
        }
    }
}

/// Read access to attribute values for filter evaluation.
pub trait AttributeReader {
    /// String renderings of the values found at `path`; empty when absent.
    fn attribute_values(&self, path: &AttributePath) -> Vec<String>;
}

/// One comparison in a conjunctive filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    attribute_path: AttributePath,
    operator: ComparisonOperator,
    comparison_value: String,
    next: Option<Box<FilterPredicate>>,
}

impl FilterPredicate {
    /// Parse a top-level filter, rejecting operators other than `eq`.
    pub fn parse(text: &str) -> Result<Self, FilterError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FilterError::malformed("filter is empty"));
        }
        let mut cursor = Cursor::new(text);
        let chain = parse_chain(&mut cursor, false)?;
        if let Some(unsupported) = chain
            .iter()
            .find(|predicate| predicate.operator != ComparisonOperator::Equals)
        {
            return Err(FilterError::UnsupportedOperator {
                operator: unsupported.operator.keyword().to_string(),
            });
        }
        Ok(chain)
    }

    pub fn new(
        attribute_path: AttributePath,
        operator: ComparisonOperator,
        comparison_value: impl Into<String>,
    ) -> Self {
        Self {
            attribute_path,
            operator,
            comparison_value: comparison_value.into(),
            next: None,
        }
    }

    /// An equality predicate on a bare attribute.
    pub fn equals(attribute_name: &str, comparison_value: impl Into<String>) -> Self {
        Self::new(
            AttributePath::named(attribute_name),
            ComparisonOperator::Equals,
            comparison_value,
        )
    }

    /// The filter for "resource `identifier` within `existing`": identifier
    /// equality first, with the existing chain still required after it.
    pub fn identifier_within(identifier: &str, existing: Option<FilterPredicate>) -> Self {
        Self {
            next: existing.map(Box::new),
            ..Self::equals(attributes::ID, identifier)
        }
    }

    pub fn attribute_path(&self) -> &AttributePath {
        &self.attribute_path
    }

    pub fn operator(&self) -> ComparisonOperator {
        self.operator
    }

    pub fn comparison_value(&self) -> &str {
        &self.comparison_value
    }

    pub fn next(&self) -> Option<&FilterPredicate> {
        self.next.as_deref()
    }

    /// Iterate the chain starting at this node.
    pub fn iter(&self) -> impl Iterator<Item = &FilterPredicate> {
        std::iter::successors(Some(self), |predicate| predicate.next())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// A chain always holds at least one predicate.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// True iff every predicate in the chain matches.
    pub fn matches(&self, reader: &dyn AttributeReader, mode: CaseMode) -> Result<bool, FilterError> {
        for predicate in self.iter() {
            if !predicate.matches_single(reader, mode)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn matches_single(&self, reader: &dyn AttributeReader, mode: CaseMode) -> Result<bool, FilterError> {
        if self.operator != ComparisonOperator::Equals {
            return Err(FilterError::UnsupportedOperator {
                operator: self.operator.keyword().to_string(),
            });
        }
        let mode = if self.attribute_path.is_simple(attributes::ID) {
            CaseMode::IgnoreCase
        } else {
            mode
        };
        Ok(reader
            .attribute_values(&self.attribute_path)
            .iter()
            .any(|value| mode.equals(value, &self.comparison_value)))
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, predicate) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(" and ")?;
            }
            write!(f, "{} {}", predicate.attribute_path, predicate.operator)?;
            if predicate.operator != ComparisonOperator::Present {
                write!(f, " {}", quote(&predicate.comparison_value))?;
            }
        }
        Ok(())
    }
}

impl FromStr for FilterPredicate {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse a conjunction chain. Inside brackets (`nested`) the chain ends at `]`
/// and attribute paths may not carry their own filters.
pub(crate) fn parse_chain(cursor: &mut Cursor<'_>, nested: bool) -> Result<FilterPredicate, FilterError> {
    let mut predicates = vec![parse_predicate(cursor)?];

    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => break,
            Some(']') if nested => break,
            Some('(') | Some(')') => return Err(FilterError::grammar("grouping")),
            Some('[') => return Err(FilterError::grammar("nested attribute filter")),
            _ => {}
        }

        let position = cursor.position();
        let keyword = cursor.take_while(|c| c.is_ascii_alphanumeric());
        match keyword.to_ascii_lowercase().as_str() {
            "and" if cursor.skip_whitespace() => predicates.push(parse_predicate(cursor)?),
            "or" => return Err(FilterError::grammar("or")),
            "" => {
                return Err(FilterError::malformed(format!(
                    "unexpected character at position {}",
                    position
                )));
            }
            _ => {
                return Err(FilterError::malformed(format!(
                    "expected 'and' at position {}, found '{}'",
                    position, keyword
                )));
            }
        }
    }

    let mut chain: Option<Box<FilterPredicate>> = None;
    while let Some(mut predicate) = predicates.pop() {
        predicate.next = chain;
        chain = Some(Box::new(predicate));
    }
    chain
        .map(|head| *head)
        .ok_or_else(|| FilterError::malformed("filter is empty"))
}

fn parse_predicate(cursor: &mut Cursor<'_>) -> Result<FilterPredicate, FilterError> {
    cursor.skip_whitespace();
    if cursor.peek() == Some('(') {
        return Err(FilterError::grammar("grouping"));
    }
    let head = cursor.rest();
    let leading = head
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();
    if leading.eq_ignore_ascii_case("not") && negation_follows(&head[leading.len()..]) {
        return Err(FilterError::grammar("not"));
    }

    let attribute_path = AttributePath::parse_at(cursor, false)
        .map_err(|error| FilterError::malformed(error.to_string()))?;
    if cursor.peek() == Some('[') {
        return Err(FilterError::grammar("complex attribute filter grouping"));
    }

    if !cursor.skip_whitespace() {
        return Err(FilterError::malformed(format!(
            "expected an operator after '{}'",
            attribute_path
        )));
    }
    let keyword = cursor.take_while(|c| c.is_ascii_alphabetic());
    let operator = ComparisonOperator::from_keyword(keyword)
        .ok_or_else(|| FilterError::malformed(format!("unknown operator '{}'", keyword)))?;

    if operator == ComparisonOperator::Present {
        return Ok(FilterPredicate::new(attribute_path, operator, String::new()));
    }

    if !cursor.skip_whitespace() {
        return Err(FilterError::malformed(format!(
            "expected a value after '{} {}'",
            attribute_path, operator
        )));
    }
    let comparison_value = cursor
        .value_literal()
        .map_err(|message| FilterError::MalformedValue { message })?;

    Ok(FilterPredicate::new(attribute_path, operator, comparison_value))
}

/// Values found at `path` inside a JSON object.
///
/// Multi-valued attributes yield every element; complex elements contribute
/// their trailing sub-attribute, or `value` when none is named.
pub fn json_attribute_values(object: &Value, path: &AttributePath) -> Vec<String> {
    let scope = match path.schema_identifier() {
        Some(schema) => match lookup(object, schema) {
            Some(extension) => extension,
            None => return Vec::new(),
        },
        None => object,
    };
    let Some(found) = lookup(scope, path.attribute_name()) else {
        return Vec::new();
    };

    let elements: Vec<&Value> = match found {
        Value::Array(items) => items
            .iter()
            .filter(|item| match path.sub_attribute_filter() {
                Some(filter) => filter.matches(*item, CaseMode::IgnoreCase).unwrap_or(false),
                None => true,
            })
            .collect(),
        single => vec![single],
    };

    elements
        .into_iter()
        .filter_map(|element| match (element, path.trailing_sub_attribute()) {
            (Value::Object(_), Some(sub)) => lookup(element, sub),
            (Value::Object(_), None) => lookup(element, attributes::VALUE),
            (_, Some(_)) => None,
            (scalar, None) => Some(scalar),
        })
        .filter_map(render_scalar)
        .collect()
}

/// `not` negates when a group or another path follows it. Followed by an
/// operator it is an attribute name.
fn negation_follows(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.starts_with('(') {
        return true;
    }
    rest.split(|c: char| c.is_whitespace() || c == '"')
        .next()
        .is_some_and(|word| !word.is_empty() && ComparisonOperator::from_keyword(word).is_none())
}

/// Case-insensitive key lookup in a JSON object.
pub(crate) fn lookup<'a>(object: &'a Value, key: &str) -> Option<&'a Value> {
    let map = object.as_object()?;
    map.get(key).or_else(|| {
        map.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

pub(crate) fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl AttributeReader for Value {
    fn attribute_values(&self, path: &AttributePath) -> Vec<String> {
        json_attribute_values(self, path)
    }
}
