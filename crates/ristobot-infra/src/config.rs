//! INI configuration loader for Ristobot.
//!
//! Reads `config.ini` (path overridable) and exposes per-section connection
//! profiles. Sections look like:
//!
//! ```ini
//! [milvus_ristobot]
//! uri = https://in03-xxxx.api.gcp-us-west1.zillizcloud.com
//! token = db_admin:secret
//!
//! [embedding]
//! model_dir = /pyapp/models/multi-qa-MiniLM-L6-cos-v1/
//! ```
//!
//! Unlike the global defaults elsewhere, a missing file, section, or key is
//! fatal: the pipelines cannot do anything without an endpoint.

use std::path::{Path, PathBuf};

use ini::Ini;
use secrecy::SecretString;

use ristobot_types::error::ConfigError;

/// Default config file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.ini";

/// Section read by `ristobot ingest`.
pub const INGEST_SECTION: &str = "example";

/// Section read by `ristobot book` and the inspection commands.
pub const BOOK_SECTION: &str = "milvus_ristobot";

/// Section holding embedding model settings.
pub const EMBEDDING_SECTION: &str = "embedding";

/// Endpoint and credentials for one vector database.
///
/// The token is a [`SecretString`]; it never appears in `Debug` output.
#[derive(Debug)]
pub struct ConnectionProfile {
    pub uri: String,
    pub token: SecretString,
}

impl ConnectionProfile {
    pub fn new(uri: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            token: SecretString::from(token.into()),
        }
    }
}

/// Parsed configuration file.
pub struct RistobotConfig {
    ini: Ini,
    path: PathBuf,
}

impl RistobotConfig {
    /// Parse INI text; `path` is only used in error messages.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self {
            ini,
            path: path.to_path_buf(),
        })
    }

    /// Path the configuration was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get(&self, section: &str, key: &str) -> Result<&str, ConfigError> {
        let props = self
            .ini
            .section(Some(section))
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        props
            .get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    /// Read `uri` and `token` from `section`.
    pub fn profile(&self, section: &str) -> Result<ConnectionProfile, ConfigError> {
        let uri = self.get(section, "uri")?;
        let token = self.get(section, "token")?;
        Ok(ConnectionProfile::new(uri, token))
    }

    /// `[embedding] model_dir`, if configured.
    pub fn embedding_model_dir(&self) -> Option<PathBuf> {
        self.get(EMBEDDING_SECTION, "model_dir").ok().map(PathBuf::from)
    }
}

/// Load and parse the configuration file at `path`.
pub async fn load_config(path: &Path) -> Result<RistobotConfig, ConfigError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(err) => {
            return Err(ConfigError::Parse {
                path: path.to_path_buf(),
                message: err.to_string(),
            });
        }
    };

    tracing::debug!("Loaded configuration from {}", path.display());
    RistobotConfig::parse(&content, path)
}
