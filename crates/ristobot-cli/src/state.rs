//! Application state: the connected vector database plus where the
//! embedding model comes from.
//!
//! Endpoint resolution order: `--uri/--token` (or `RISTOBOT_URI` /
//! `RISTOBOT_TOKEN`), then the config file section. The memory backend needs
//! neither.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use ristobot_core::box_vectordb::BoxVectorDatabase;
use ristobot_infra::config::{load_config, ConnectionProfile, RistobotConfig};
use ristobot_infra::embed::onnx::BUILTIN_MODEL_NAME;
use ristobot_infra::embed::{default_model_cache_dir, FastEmbedder};
use ristobot_infra::milvus::MilvusOptions;
use ristobot_infra::vectordb::{connect_backend, BackendKind};
use ristobot_types::error::ConfigError;

use crate::cli::Cli;

/// Where sentence embeddings come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Local sentence-transformers ONNX export.
    Dir(PathBuf),
    /// fastembed's bundled model, cached in this directory.
    Builtin(PathBuf),
}

impl std::fmt::Display for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelSource::Dir(dir) => write!(f, "{}", dir.display()),
            ModelSource::Builtin(_) => write!(f, "{BUILTIN_MODEL_NAME}"),
        }
    }
}

/// Connected state shared by every command.
pub struct AppState {
    pub db: BoxVectorDatabase,
    pub backend: BackendKind,
    /// Endpoint shown to the user (`memory` for the in-process store).
    pub endpoint: String,
    pub model_source: ModelSource,
}

impl AppState {
    /// Resolve the endpoint and connect.
    ///
    /// `default_section` is used when `--section` is not given.
    pub async fn init(cli: &Cli, default_section: &str) -> Result<Self> {
        let config = read_config(cli).await?;
        let section = cli.section.as_deref().unwrap_or(default_section);

        let profile = match cli.backend {
            BackendKind::Memory => None,
            BackendKind::Milvus => Some(resolve_profile(cli, config.as_ref(), section)?),
        };
        let endpoint = profile
            .as_ref()
            .map(|p| p.uri.clone())
            .unwrap_or_else(|| cli.backend.to_string());

        let options = MilvusOptions {
            load_timeout: Duration::from_secs(cli.load_timeout),
            ..MilvusOptions::default()
        };
        let db = connect_backend(cli.backend, profile, options)
            .await
            .with_context(|| format!("Failed to connect to {endpoint}"))?;

        let model_source = resolve_model_source(cli, config.as_ref());

        Ok(Self {
            db,
            backend: cli.backend,
            endpoint,
            model_source,
        })
    }

    /// Load the embedding model. Blocking work runs off the async runtime.
    pub async fn load_embedder(&self, show_download_progress: bool) -> Result<FastEmbedder> {
        let source = self.model_source.clone();
        let embedder = tokio::task::spawn_blocking(move || match source {
            ModelSource::Dir(dir) => FastEmbedder::from_dir(&dir),
            ModelSource::Builtin(cache) => FastEmbedder::builtin(cache, show_download_progress),
        })
        .await
        .context("Embedding model loader panicked")?
        .with_context(|| format!("Failed to load embedding model {}", self.model_source))?;
        Ok(embedder)
    }
}

/// Read the config file. A missing file is only fatal when the endpoint must
/// come from it.
async fn read_config(cli: &Cli) -> Result<Option<RistobotConfig>> {
    match load_config(&cli.config).await {
        Ok(config) => Ok(Some(config)),
        Err(ConfigError::NotFound(path)) => {
            tracing::debug!("No config file at {}", path.display());
            Ok(None)
        }
        Err(err) => Err(err).context("Failed to read configuration"),
    }
}

/// Flags win over the config section, field by field.
fn resolve_profile(
    cli: &Cli,
    config: Option<&RistobotConfig>,
    section: &str,
) -> Result<ConnectionProfile> {
    if let (Some(uri), Some(token)) = (&cli.uri, &cli.token) {
        return Ok(ConnectionProfile::new(uri.clone(), token.clone()));
    }

    let config = config.ok_or_else(|| {
        anyhow::anyhow!(
            "{} (pass --uri and --token, or create the file)",
            ConfigError::NotFound(cli.config.clone())
        )
    })?;
    let mut profile = config
        .profile(section)
        .with_context(|| format!("Failed to read endpoint from {}", config.path().display()))?;

    if let Some(uri) = &cli.uri {
        profile.uri = uri.clone();
    }
    if let Some(token) = &cli.token {
        profile.token = token.clone().into();
    }
    Ok(profile)
}

fn resolve_model_source(cli: &Cli, config: Option<&RistobotConfig>) -> ModelSource {
    cli.model_dir
        .clone()
        .or_else(|| config.and_then(RistobotConfig::embedding_model_dir))
        .map(ModelSource::Dir)
        .unwrap_or_else(|| ModelSource::Builtin(default_model_cache_dir()))
}
