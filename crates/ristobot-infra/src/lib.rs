//! Infrastructure implementations for Ristobot.
//!
//! Provides the Milvus REST client and the in-memory store (both implementing
//! `VectorDatabase`), the fastembed sentence embedder, INI configuration
//! loading, and the local data directory layout.

pub mod config;
pub mod embed;
pub mod filesystem;
pub mod milvus;
pub mod vectordb;
