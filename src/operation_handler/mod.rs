//! Framework-agnostic SCIM operation handler.
//!
//! Takes a method, path, query string and JSON body, routes them to the
//! adapter for the addressed resource type and returns a status and body.
//! Failures are rendered as RFC 7644 error responses.
//!
//! # Key Types
//!
//! - [`ScimOperationHandler`] - Routes requests to adapters and discovery documents
//! - [`ScimRequest`] - Transport-agnostic request
//! - [`ScimResponse`] - Status, body and `Location`
//!
//! # Examples
//!
//! ```rust
//! use scim_protocol::operation_handler::{ScimOperationHandler, ScimRequest};
//! use scim_protocol::providers::InMemoryProvider;
//! use scim_protocol::EngineConfig;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let handler = ScimOperationHandler::new(Arc::new(InMemoryProvider::default()), EngineConfig::default());
//!
//! let request = ScimRequest::post(
//!     "/Users",
//!     json!({"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "alice"}),
//! );
//! let response = handler.handle(request).await;
//! assert_eq!(response.status, 201);
//! # });
//! ```

mod core;
mod errors;
mod handlers;

pub use core::{ScimMethod, ScimOperationHandler, ScimRequest, ScimResponse};
pub use errors::error_response;
