//! Schema identifiers, definitions and the schema registry.
//!
//! # Key Types
//!
//! - [`SchemaSet`] - Concurrent, case-insensitive, append-only identifier set
//! - [`SchemaRegistry`] - Known identifiers, resource types and protocol extensions
//! - [`AttributeDefinition`] - Attribute type, cardinality and mutability
//!
//! # Examples
//!
//! ```rust
//! use scim_protocol::schema::{identifiers, SchemaRegistry};
//!
//! let registry = SchemaRegistry::new();
//! assert!(registry.is_known(identifiers::CORE_USER));
//! assert!(registry.user_type().schema.attribute("userName").is_some());
//! ```

pub mod identifiers;
pub mod registry;
pub mod schema_set;
pub mod types;

pub use registry::{ProtocolExtension, SchemaRegistry};
pub use schema_set::SchemaSet;
pub use types::{
    AttributeDefinition, AttributeType, Mutability, ResourceTypeDefinition, Schema, Uniqueness,
};
