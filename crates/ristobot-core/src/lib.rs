//! Pipeline logic and backend trait definitions for Ristobot.
//!
//! This crate defines the "ports" (`VectorDatabase`, `Embedder`) that the
//! infrastructure layer implements, plus the ingest and search pipelines
//! built on top of them. It depends only on `ristobot-types` -- never on
//! `ristobot-infra` or any network/ML crate.

pub mod box_vectordb;
pub mod collection;
pub mod embedder;
pub mod filter;
pub mod ingest;
pub mod pipeline;
pub mod vectordb;
