//! FastEmbed-based local sentence embedder.
//!
//! Implements the `Embedder` trait from `ristobot-core` with ONNX runtime
//! inference. Two model sources are supported:
//!
//! - a local sentence-transformers export (`model.onnx` plus tokenizer
//!   files), mean-pooled, e.g. `multi-qa-MiniLM-L6-cos-v1`;
//! - fastembed's bundled `all-MiniLM-L6-v2`, downloaded on first use into a
//!   cache directory.
//!
//! Both produce 384-dimensional vectors.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fastembed::{
    EmbeddingModel, InitOptions, InitOptionsUserDefined, Pooling, TextEmbedding, TokenizerFiles,
    UserDefinedEmbeddingModel,
};

use ristobot_core::embedder::{check_embeddings, Embedder};
use ristobot_types::error::EmbedError;
use ristobot_types::schema::EMBEDDING_DIMENSION;

/// Name reported for the bundled model.
pub const BUILTIN_MODEL_NAME: &str = "all-MiniLM-L6-v2";

/// Local ONNX sentence embedder.
///
/// `TextEmbedding::embed` needs exclusive access, so the model sits behind
/// a mutex. Inference is CPU-bound and runs on tokio's blocking pool.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: String,
    dimension: usize,
}

impl FastEmbedder {
    /// Load a sentence-transformers export from `dir`.
    ///
    /// The directory must contain `model.onnx` (or `onnx/model.onnx`),
    /// `tokenizer.json`, `config.json`, `special_tokens_map.json` and
    /// `tokenizer_config.json`.
    pub fn from_dir(dir: &Path) -> Result<Self, EmbedError> {
        if !dir.is_dir() {
            return Err(EmbedError::ModelNotFound(dir.to_path_buf()));
        }

        let onnx_path = [dir.join("model.onnx"), dir.join("onnx").join("model.onnx")]
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| EmbedError::ModelNotFound(dir.join("model.onnx")))?;

        let onnx_file = read_model_file(&onnx_path)?;
        let config_file = read_model_file(&dir.join("config.json"))?;
        let tokenizer_files = TokenizerFiles {
            tokenizer_file: read_model_file(&dir.join("tokenizer.json"))?,
            config_file: config_file.clone(),
            special_tokens_map_file: read_model_file(&dir.join("special_tokens_map.json"))?,
            tokenizer_config_file: read_model_file(&dir.join("tokenizer_config.json"))?,
        };

        let dimension = hidden_size(&config_file).unwrap_or(EMBEDDING_DIMENSION);
        let model_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let user_model =
            UserDefinedEmbeddingModel::new(onnx_file, tokenizer_files).with_pooling(Pooling::Mean);
        let model =
            TextEmbedding::try_new_from_user_defined(user_model, InitOptionsUserDefined::default())
                .map_err(|e| EmbedError::ModelLoad(format!("{}: {e}", dir.display())))?;

        tracing::info!(model = %model_name, dimension, "loaded local embedding model");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name,
            dimension,
        })
    }

    /// Load the bundled `all-MiniLM-L6-v2`, downloading it into `cache_dir`
    /// if it is not there yet.
    pub fn builtin(cache_dir: PathBuf, show_download_progress: bool) -> Result<Self, EmbedError> {
        let options = InitOptions::new(EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(cache_dir.clone())
            .with_show_download_progress(show_download_progress);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| EmbedError::ModelLoad(format!("{BUILTIN_MODEL_NAME}: {e}")))?;

        tracing::info!(
            model = BUILTIN_MODEL_NAME,
            cache = %cache_dir.display(),
            "loaded bundled embedding model"
        );

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            model_name: BUILTIN_MODEL_NAME.to_string(),
            dimension: EMBEDDING_DIMENSION,
        })
    }
}

fn read_model_file(path: &Path) -> Result<Vec<u8>, EmbedError> {
    std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => EmbedError::ModelNotFound(path.to_path_buf()),
        _ => EmbedError::ModelLoad(format!("{}: {e}", path.display())),
    })
}

/// Run `f` on the blocking pool so inference does not stall async workers.
async fn run_blocking<T, F>(f: F) -> Result<T, EmbedError>
where
    F: FnOnce() -> Result<T, EmbedError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EmbedError::Inference(format!("embedding task failed: {e}")))?
}

/// `hidden_size` from a transformers `config.json`.
fn hidden_size(config: &[u8]) -> Option<usize> {
    let value: serde_json::Value = serde_json::from_slice(config).ok()?;
    value
        .get("hidden_size")
        .and_then(serde_json::Value::as_u64)
        .map(|n| n as usize)
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let batch = texts.to_vec();
        let vectors = run_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| EmbedError::Inference("embedding model lock poisoned".to_string()))?;
            model
                .embed(batch, None)
                .map_err(|e| EmbedError::Inference(e.to_string()))
        })
        .await?;

        check_embeddings(&vectors, texts.len(), self.dimension)?;
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
