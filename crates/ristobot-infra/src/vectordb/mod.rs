//! Backend-agnostic vector database wiring.
//!
//! [`connect_backend`] turns a backend choice plus a connection profile into
//! a [`BoxVectorDatabase`] the pipelines can run against.

pub mod memory;

use std::fmt;
use std::str::FromStr;

use ristobot_core::box_vectordb::BoxVectorDatabase;
use ristobot_types::error::VectorDbError;

use crate::config::ConnectionProfile;
use crate::milvus::{MilvusClient, MilvusOptions};

pub use memory::InMemoryVectorDb;

/// Which vector database implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Milvus or Zilliz Cloud over REST.
    #[default]
    Milvus,
    /// Process-local store, lost on exit.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Milvus => write!(f, "milvus"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "milvus" | "zilliz" => Ok(BackendKind::Milvus),
            "memory" | "mem" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{other}' (expected milvus or memory)")),
        }
    }
}

/// Open a session on the chosen backend.
///
/// The memory backend ignores `profile`; the Milvus backend verifies the
/// endpoint and token before returning.
pub async fn connect_backend(
    kind: BackendKind,
    profile: Option<ConnectionProfile>,
    options: MilvusOptions,
) -> Result<BoxVectorDatabase, VectorDbError> {
    match kind {
        BackendKind::Memory => Ok(BoxVectorDatabase::new(InMemoryVectorDb::new())),
        BackendKind::Milvus => {
            let profile = profile.ok_or_else(|| {
                VectorDbError::Connection("no Milvus endpoint configured".to_string())
            })?;
            let client = MilvusClient::connect(profile, options).await?;
            Ok(BoxVectorDatabase::new(client))
        }
    }
}
