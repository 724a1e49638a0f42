//! SCIM error response message.

use crate::error::ScimError;
use crate::schema::{identifiers, SchemaSet};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// RFC 7644 §3.12 error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub schemas: SchemaSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(serialize_with = "status_as_string", deserialize_with = "status_from_any")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scim_type: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        Self {
            schemas: [identifiers::ERROR].into_iter().collect(),
            detail: Some(detail.into()),
            status,
            scim_type: None,
        }
    }

    pub fn with_scim_type(mut self, scim_type: impl Into<String>) -> Self {
        self.scim_type = Some(scim_type.into());
        self
    }
}

impl From<&ScimError> for ErrorResponse {
    fn from(error: &ScimError) -> Self {
        let response = ErrorResponse::new(error.kind().status_code(), error.to_string());
        match error.scim_type() {
            Some(scim_type) => response.with_scim_type(scim_type),
            None => response,
        }
    }
}

fn status_as_string<S: Serializer>(status: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&status.to_string())
}

fn status_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u16, D::Error> {
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(number) => number
            .as_u64()
            .and_then(|n| u16::try_from(n).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid status {}", number))),
        Value::String(text) => text
            .trim()
            .parse::<u16>()
            .map_err(|_| D::Error::custom(format!("invalid status '{}'", text))),
        other => Err(D::Error::custom(format!("invalid status {}", other))),
    }
}
