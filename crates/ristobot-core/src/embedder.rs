//! Embedder trait for text-to-vector conversion.
//!
//! Defines the interface for encoding sentences into fixed-length vectors.
//! Implementations (fastembed with a local ONNX model) live in ristobot-infra.

use ristobot_types::error::EmbedError;

/// Trait for converting text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in ristobot-infra.
pub trait Embedder: Send + Sync {
    /// Embed one or more texts into vectors.
    ///
    /// Returns one vector per input text, in input order, each exactly
    /// [`dimension`](Embedder::dimension) long.
    fn embed(
        &self,
        texts: &[String],
    ) -> impl std::future::Future<Output = Result<Vec<Vec<f32>>, EmbedError>> + Send;

    /// The model name used for embeddings (e.g., "all-MiniLM-L6-v2").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}

/// Embed a single string, returning its vector.
pub async fn embed_one<E: Embedder>(embedder: &E, text: &str) -> Result<Vec<f32>, EmbedError> {
    let mut vectors = embedder.embed(&[text.to_string()]).await?;
    if vectors.len() != 1 {
        return Err(EmbedError::CountMismatch {
            expected: 1,
            actual: vectors.len(),
        });
    }
    Ok(vectors.remove(0))
}

/// Check that `vectors` holds one `dimension`-long vector per input.
pub fn check_embeddings(
    vectors: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<(), EmbedError> {
    if vectors.len() != expected_count {
        return Err(EmbedError::CountMismatch {
            expected: expected_count,
            actual: vectors.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbedError::DimensionMismatch {
            expected: dimension,
            actual: bad.len(),
        });
    }
    Ok(())
}
