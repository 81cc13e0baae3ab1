//! Shared domain types for Ristobot.
//!
//! Collection schemas, entities, search/query requests and results, and the
//! error types every other crate returns.
//!
//! Zero infrastructure dependencies -- only serde, serde_json, thiserror.

pub mod entity;
pub mod error;
pub mod schema;
pub mod search;
