//! Milvus / Zilliz Cloud vector database client.
//!
//! This module provides the [`MilvusClient`] which implements the
//! [`VectorDatabase`](ristobot_core::vectordb::VectorDatabase) trait over
//! the Milvus RESTful API v2.

pub mod client;
pub mod types;

pub use client::{MilvusClient, MilvusOptions};
