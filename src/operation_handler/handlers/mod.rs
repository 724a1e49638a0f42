//! Operation handlers, grouped by the kind of request they serve.

pub mod crud;
pub mod query;
pub mod schema;
