//! Attribute paths.
//!
//! An attribute path addresses a resource attribute, optionally qualified by a
//! schema URN, narrowed to elements of a multi-valued attribute by a bracketed
//! filter, and followed by a sub-attribute name:
//!
//! ```text
//! [urn ":"] name ["[" subfilter "]"] ["." subname]
//! ```
//!
//! Parsed paths are immutable and their `Display` form is canonical, so
//! `AttributePath::parse(&path.to_string())` yields an equal path.
//!
//! ```rust
//! use scim_protocol::protocol::AttributePath;
//!
//! let path = AttributePath::parse(r#"emails[type eq "work"].value"#).unwrap();
//! assert_eq!(path.attribute_name(), "emails");
//! assert_eq!(path.trailing_sub_attribute(), Some("value"));
//! assert_eq!(path.to_string(), r#"emails[type eq "work"].value"#);
//! ```

use super::filter::{self, FilterError, FilterPredicate};
use super::lexer::{is_name_char, Cursor};

use std::fmt;
use std::str::FromStr;

/// Failure to parse attribute path text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("attribute name is empty at position {position}")]
    EmptyName { position: usize },

    #[error("unterminated '[' opened at position {position}")]
    UnterminatedBracket { position: usize },

    #[error("malformed value: {message}")]
    MalformedValue { message: String },

    #[error("invalid sub-attribute filter: {message}")]
    InvalidSubFilter { message: String },

    #[error("unexpected '{character}' at position {position}")]
    UnexpectedCharacter { character: char, position: usize },
}

/// A parsed reference to a resource attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePath {
    schema_identifier: Option<String>,
    attribute_name: String,
    sub_attribute_filter: Option<Box<FilterPredicate>>,
    trailing_sub_attribute: Option<String>,
}

impl AttributePath {
    /// Parse a complete attribute path.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let mut cursor = Cursor::new(text.trim());
        let path = Self::parse_at(&mut cursor, true)?;
        match cursor.peek() {
            None => Ok(path),
            Some(character) => Err(PathError::UnexpectedCharacter {
                character,
                position: cursor.position(),
            }),
        }
    }

    /// A bare attribute reference.
    pub fn named(attribute_name: impl Into<String>) -> Self {
        Self {
            schema_identifier: None,
            attribute_name: attribute_name.into(),
            sub_attribute_filter: None,
            trailing_sub_attribute: None,
        }
    }

    pub fn with_schema(mut self, schema_identifier: impl Into<String>) -> Self {
        self.schema_identifier = Some(schema_identifier.into());
        self
    }

    pub fn with_sub_attribute(mut self, sub_attribute: impl Into<String>) -> Self {
        self.trailing_sub_attribute = Some(sub_attribute.into());
        self
    }

    pub fn with_filter(mut self, filter: FilterPredicate) -> Self {
        self.sub_attribute_filter = Some(Box::new(filter));
        self
    }

    pub fn schema_identifier(&self) -> Option<&str> {
        self.schema_identifier.as_deref()
    }

    pub fn attribute_name(&self) -> &str {
        &self.attribute_name
    }

    pub fn sub_attribute_filter(&self) -> Option<&FilterPredicate> {
        self.sub_attribute_filter.as_deref()
    }

    pub fn trailing_sub_attribute(&self) -> Option<&str> {
        self.trailing_sub_attribute.as_deref()
    }

    /// The same attribute with the sub-attribute filter dropped.
    pub fn without_filter(&self) -> Self {
        Self {
            sub_attribute_filter: None,
            ..self.clone()
        }
    }

    /// True when this path names `name` (ignoring case) with nothing after it.
    pub fn is_simple(&self, name: &str) -> bool {
        self.attribute_name.eq_ignore_ascii_case(name)
            && self.sub_attribute_filter.is_none()
            && self.trailing_sub_attribute.is_none()
    }

    pub(crate) fn parse_at(cursor: &mut Cursor<'_>, allow_filter: bool) -> Result<Self, PathError> {
        let schema_identifier = Self::schema_prefix(cursor);

        let start = cursor.position();
        let attribute_name = cursor.take_while(is_name_char);
        if attribute_name.is_empty() {
            return Err(PathError::EmptyName { position: start });
        }

        let mut path = Self {
            schema_identifier,
            attribute_name: attribute_name.to_string(),
            sub_attribute_filter: None,
            trailing_sub_attribute: None,
        };

        if allow_filter && cursor.peek() == Some('[') {
            let opened_at = cursor.position();
            cursor.bump();
            let filter = filter::parse_chain(cursor, true).map_err(|error| match error {
                FilterError::MalformedValue { message } => PathError::MalformedValue { message },
                other => PathError::InvalidSubFilter {
                    message: other.to_string(),
                },
            })?;
            cursor.skip_whitespace();
            if !cursor.eat(']') {
                return Err(PathError::UnterminatedBracket {
                    position: opened_at,
                });
            }
            path.sub_attribute_filter = Some(Box::new(filter));
        }

        if cursor.eat('.') {
            let start = cursor.position();
            let sub_attribute = cursor.take_while(is_name_char);
            if sub_attribute.is_empty() {
                return Err(PathError::EmptyName { position: start });
            }
            path.trailing_sub_attribute = Some(sub_attribute.to_string());
        }

        Ok(path)
    }

    // A `urn:` token runs to the last ':' before any bracket or whitespace,
    // and names a schema only when that ':' is not the one after `urn`.
    fn schema_prefix(cursor: &mut Cursor<'_>) -> Option<String> {
        let rest = cursor.rest();
        if !rest.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("urn:")) {
            return None;
        }
        let token_end = rest
            .find(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')'))
            .unwrap_or(rest.len());
        let separator = rest[..token_end]
            .rfind(':')
            .filter(|separator| *separator > 3)?;
        cursor.advance(separator + 1);
        Some(rest[..separator].to_string())
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(schema) = &self.schema_identifier {
            write!(f, "{}:", schema)?;
        }
        f.write_str(&self.attribute_name)?;
        if let Some(filter) = &self.sub_attribute_filter {
            write!(f, "[{}]", filter)?;
        }
        if let Some(sub_attribute) = &self.trailing_sub_attribute {
            write!(f, ".{}", sub_attribute)?;
        }
        Ok(())
    }
}

impl FromStr for AttributePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
