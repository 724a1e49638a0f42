//! Errors reported by backing-store providers.
//!
//! Not-found and conflict are kept distinct from generic storage failures so
//! the adapter layer can surface them unchanged.

use crate::error::ScimError;
use thiserror::Error;

/// Errors that can occur during provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound { resource_type: String, id: String },

    #[error("Duplicate attribute '{attribute}' with value '{value}' for {resource_type}")]
    Conflict {
        resource_type: String,
        attribute: String,
        value: String,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Unsupported filter operator: {operator}")]
    UnsupportedOperator { operator: String },

    /// The patch could not be applied; the stored resource is unchanged.
    #[error("Patch failed: {0}")]
    Patch(Box<ScimError>),

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ProviderError {
    pub fn not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    pub fn conflict(
        resource_type: impl Into<String>,
        attribute: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::Conflict {
            resource_type: resource_type.into(),
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

impl From<ScimError> for ProviderError {
    fn from(error: ScimError) -> Self {
        ProviderError::Patch(Box::new(error))
    }
}
