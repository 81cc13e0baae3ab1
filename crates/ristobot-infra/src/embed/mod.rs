//! Sentence embedding backends.

pub mod onnx;

use std::path::PathBuf;

use crate::filesystem::resolve_data_dir;

pub use onnx::FastEmbedder;

/// Where the bundled model is cached (`~/.ristobot/models`).
pub fn default_model_cache_dir() -> PathBuf {
    resolve_data_dir().join("models")
}
