//! Error types for SCIM protocol processing.
//!
//! Every failure the engine can produce is a [`ScimError`]. The transport layer
//! does not need to inspect individual variants: [`ScimError::kind`] collapses
//! them into the small set of outcomes a SCIM service reports ([`ErrorKind`]),
//! and [`ErrorKind::status_code`] gives the conventional HTTP status for each.

use crate::protocol::filter::FilterError;
use crate::protocol::path::PathError;
use crate::providers::ProviderError;

/// Main error type for SCIM protocol operations.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Attribute path text could not be parsed
    #[error("Invalid attribute path: {0}")]
    Path(#[from] PathError),

    /// Filter text is malformed or uses an unsupported construct
    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    /// The addressed resource does not exist
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// A uniqueness constraint would be violated
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Invalid request format or parameters
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// A patch operation targets an attribute the resource type does not define
    #[error("Unknown attribute '{attribute}' for resource type '{resource_type}'")]
    UnknownAttribute {
        attribute: String,
        resource_type: String,
    },

    /// A patch operation targets a server-managed attribute
    #[error("Attribute '{attribute}' is read-only and cannot be modified")]
    ReadOnlyAttribute { attribute: String },

    /// The payload carries no usable `schemas` array
    #[error("Unidentifiable schema: payload has no 'schemas' array")]
    UnidentifiableSchema,

    /// The schema identifiers select zero or several candidate objects
    #[error("Ambiguous schema identifiers: {message}")]
    DispatchAmbiguity { message: String },

    /// None of the dispatch steps recognizes the schema identifiers
    #[error("Unsupported schema identifiers: {}", .schemas.join(", "))]
    UnsupportedSchema { schemas: Vec<String> },

    /// An update was attempted with something other than a patch request
    #[error("Unsupported patch type: {0}")]
    UnsupportedPatchType(String),

    /// The active provider does not implement the operation
    #[error("Operation '{operation}' is not implemented for {resource_type}")]
    NotImplemented {
        resource_type: String,
        operation: String,
    },

    /// Errors from the backing store that carry no protocol meaning
    #[error("Resource provider error: {0}")]
    Provider(#[source] ProviderError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

/// The outcome classes surfaced to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    BadRequest,
    NotAcceptable,
    NotImplemented,
    InternalError,
}

impl ErrorKind {
    /// Conventional HTTP status code for this kind.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::BadRequest => 400,
            ErrorKind::NotAcceptable => 406,
            ErrorKind::NotImplemented => 501,
            ErrorKind::InternalError => 500,
        }
    }
}

impl ScimError {
    /// Classify this error into the kind the transport layer reports.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScimError::Filter(FilterError::UnsupportedOperator { .. }) => ErrorKind::NotImplemented,
            ScimError::Filter(_) => ErrorKind::NotAcceptable,
            ScimError::ResourceNotFound { .. } => ErrorKind::NotFound,
            ScimError::Conflict { .. } => ErrorKind::Conflict,
            ScimError::Path(_)
            | ScimError::InvalidRequest { .. }
            | ScimError::UnknownAttribute { .. }
            | ScimError::ReadOnlyAttribute { .. }
            | ScimError::UnidentifiableSchema
            | ScimError::DispatchAmbiguity { .. }
            | ScimError::Json(_) => ErrorKind::BadRequest,
            ScimError::UnsupportedSchema { .. }
            | ScimError::UnsupportedPatchType(_)
            | ScimError::NotImplemented { .. } => ErrorKind::NotImplemented,
            ScimError::Provider(_) | ScimError::Internal { .. } => ErrorKind::InternalError,
        }
    }

    /// RFC 7644 `scimType` keyword for errors that have one.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            ScimError::Filter(_) => Some("invalidFilter"),
            ScimError::Path(_) | ScimError::UnknownAttribute { .. } => Some("invalidPath"),
            ScimError::ReadOnlyAttribute { .. } => Some("mutability"),
            ScimError::Conflict { .. } => Some("uniqueness"),
            ScimError::Json(_) | ScimError::UnidentifiableSchema => Some("invalidSyntax"),
            ScimError::InvalidRequest { .. } | ScimError::DispatchAmbiguity { .. } => {
                Some("invalidValue")
            }
            _ => None,
        }
    }

    /// Create a resource not found error
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented(resource_type: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::NotImplemented {
            resource_type: resource_type.into(),
            operation: operation.into(),
        }
    }

    /// Create an unknown attribute error
    pub fn unknown_attribute(attribute: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            attribute: attribute.into(),
            resource_type: resource_type.into(),
        }
    }
}

impl From<ProviderError> for ScimError {
    fn from(error: ProviderError) -> Self {
        match error {
            ProviderError::NotFound { resource_type, id } => {
                ScimError::ResourceNotFound { resource_type, id }
            }
            ProviderError::Conflict { .. } => ScimError::Conflict {
                message: error.to_string(),
            },
            ProviderError::InvalidInput { message } => ScimError::InvalidRequest { message },
            ProviderError::UnsupportedOperator { operator } => {
                ScimError::Filter(FilterError::UnsupportedOperator { operator })
            }
            ProviderError::Patch(inner) => *inner,
            other => ScimError::Provider(other),
        }
    }
}

// Result type alias for convenience
pub type ScimResult<T> = Result<T, ScimError>;
