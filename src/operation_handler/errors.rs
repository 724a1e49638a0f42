//! Error rendering for the operation handler.

use super::core::ScimResponse;
use crate::error::ScimError;
use crate::protocol::ErrorResponse;

use serde_json::Value;

/// Render `error` as an RFC 7644 error response.
pub fn error_response(error: &ScimError) -> ScimResponse {
    let body = ErrorResponse::from(error);
    ScimResponse {
        status: body.status,
        body: Some(serde_json::to_value(&body).unwrap_or(Value::Null)),
        location: None,
    }
}
