//! Integration tests for the SCIM protocol engine.
//!
//! Every scenario drives the engine through its public API only. Handler-level
//! tests go through [`scim_protocol::ScimOperationHandler`] with an in-memory
//! provider; lower-level tests use the dispatcher and patch applier directly.

pub mod concurrency;
pub mod dispatch;
pub mod end_to_end;
pub mod patch_semantics;
pub mod properties;
pub mod query;
