//! Provider contract, adapters and the reference in-memory provider.
//!
//! # Key Types
//!
//! - [`Provider`] - Capability contract a backing store implements
//! - [`ProviderAdapter`] - Uniform CRUD and query surface per resource type
//! - [`ResourceProviderAdapter`] - Adapter for users and groups over a [`Provider`]
//! - [`RootProviderAdapter`] - Catch-all adapter for unrecognized resource paths
//! - [`InMemoryProvider`] - Thread-safe in-memory [`Provider`]

pub mod adapter;
pub mod error;
pub mod in_memory;
pub mod provider;

pub use adapter::{ProviderAdapter, ResourceProviderAdapter, RootProviderAdapter};
pub use error::ProviderError;
pub use in_memory::InMemoryProvider;
pub use provider::{Provider, RequestContext};
