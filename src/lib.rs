//! SCIM 2.0 protocol engine for Rust.
//!
//! Parses attribute paths and filters, applies PATCH requests to resources,
//! resolves JSON payloads into protocol objects by their declared schemas,
//! and exposes a uniform adapter surface over pluggable providers.
//!
//! # Core Components
//!
//! - [`AttributePath`] / [`FilterPredicate`] - Attribute references and conjunctive filters
//! - [`PatchRequest`] / [`PatchApplier`] - PATCH request model and application
//! - [`SchemaDispatcher`] - Schema-driven payload dispatch
//! - [`providers::ProviderAdapter`] - CRUD and query over a [`providers::Provider`]
//! - [`ScimOperationHandler`] - Transport-agnostic request handling
//!
//! # Quick Start
//!
//! ```rust
//! use scim_protocol::{PatchApplier, PatchRequest, ProtocolObject, SchemaDispatcher};
//! use scim_protocol::{EngineConfig, SchemaRegistry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(SchemaRegistry::new());
//! let dispatcher = SchemaDispatcher::new(Arc::clone(&registry), &EngineConfig::default());
//!
//! let ProtocolObject::Resource(user) = dispatcher
//!     .create(&json!({"schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"], "userName": "alice"}))
//!     .unwrap()
//! else {
//!     panic!("expected a resource");
//! };
//!
//! let ProtocolObject::PatchRequest(patch) = dispatcher
//!     .create(&json!({
//!         "schemas": ["urn:ietf:params:scim:api:messages:2.0:PatchOp"],
//!         "Operations": [{"op": "add", "path": "displayName", "value": "Alice A"}]
//!     }))
//!     .unwrap()
//! else {
//!     panic!("expected a patch request");
//! };
//!
//! let patched = PatchApplier::new(registry.user_type()).apply(&user, &patch).unwrap();
//! assert_eq!(patched.string_attribute("displayName"), Some("Alice A"));
//! ```

pub mod config;
pub mod error;
pub mod operation_handler;
pub mod protocol;
pub mod providers;
pub mod resource;
pub mod schema;
pub mod schema_discovery;

pub use config::EngineConfig;
pub use error::{ErrorKind, ScimError, ScimResult};
pub use operation_handler::{ScimMethod, ScimOperationHandler, ScimRequest, ScimResponse};
pub use protocol::{
    AttributePath, ErrorResponse, FilterPredicate, PatchOperation, PatchRequest, ProtocolObject,
    QueryResponse, ResourceQuery, SchemaDispatcher,
};
pub use resource::{PatchApplier, Resource, ResourceIdentity, ResourceKind};
pub use schema::{SchemaRegistry, SchemaSet};
pub use schema_discovery::SchemaDiscovery;
