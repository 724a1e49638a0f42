//! Protocol interpretation: attribute paths, filters, PATCH requests, query
//! parameters and schema-driven dispatch.
//!
//! # Key Types
//!
//! - [`AttributePath`] - Parsed attribute reference
//! - [`FilterPredicate`] - Conjunctive filter chain
//! - [`PatchRequest`] / [`PatchOperation`] - PATCH request model
//! - [`SchemaDispatcher`] - Resolves JSON payloads into [`ProtocolObject`]s
//! - [`ResourceQuery`] - Decoded query-string parameters

pub mod dispatcher;
pub mod error_response;
pub mod filter;
mod lexer;
pub mod patch;
pub mod path;
pub mod query;

pub use dispatcher::{ExtensionObject, ProtocolObject, ResourceFactory, SchemaDispatcher};
pub use error_response::ErrorResponse;
pub use filter::{AttributeReader, CaseMode, ComparisonOperator, FilterError, FilterPredicate};
pub use patch::{
    CompliantPatchStrategy, MultiValuedPatchStrategy, OperationName, OperationValue,
    PatchOperation, PatchRequest, PatchRequestStrategy,
};
pub use path::{AttributePath, PathError};
pub use query::{PaginationParameters, QueryResponse, ResourceQuery};
