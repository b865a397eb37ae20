use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StratusError};

/// Key id used when a caller does not name one.
pub const DEFAULT_KEY_ID: &str = "alias/stratus";

/// Page size of the local object store, matching the S3 `ListObjectsV2` maximum.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Which backend a facade talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Aws,
    Local,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Aws => write!(f, "aws"),
            BackendKind::Local => write!(f, "local"),
        }
    }
}

/// Top-level Stratus configuration stored as TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StratusConfig {
    #[serde(default)]
    pub kms: KmsSettings,
    #[serde(default)]
    pub s3: S3Settings,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct KmsSettings {
    #[serde(default)]
    pub backend: BackendKind,
    /// Key id or ARN used by `encrypt` when none is given.
    #[serde(default = "default_key_id")]
    pub default_key_id: String,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL (e.g. a LocalStack container).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Explicit access key. If None, uses env/profile credentials.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Explicit secret key. If None, uses env/profile credentials.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl Default for KmsSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            default_key_id: default_key_id(),
            region: None,
            endpoint_url: None,
            access_key: None,
            secret_key: None,
        }
    }
}

impl fmt::Debug for KmsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmsSettings")
            .field("backend", &self.backend)
            .field("default_key_id", &self.default_key_id)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_key_id() -> String {
    DEFAULT_KEY_ID.to_string()
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct S3Settings {
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub region: Option<String>,
    /// Custom endpoint URL for S3-compatible servers (MinIO, Garage, etc.)
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Use path-style addressing. Defaults to true when `endpoint_url` is set.
    #[serde(default)]
    pub path_style: Option<bool>,
    /// Explicit access key. If None, uses env/profile credentials.
    #[serde(default)]
    pub access_key: Option<String>,
    /// Explicit secret key. If None, uses env/profile credentials.
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Root directory for `backend = "local"`.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
    /// Listing page size for `backend = "local"`.
    #[serde(default)]
    pub page_size: Option<usize>,
}

impl S3Settings {
    pub fn path_style(&self) -> bool {
        self.path_style.unwrap_or(self.endpoint_url.is_some())
    }

    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1)
    }
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("backend", &self.backend)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("path_style", &self.path_style)
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("local_root", &self.local_root)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl StratusConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(StratusError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| StratusError::TomlDe(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| StratusError::TomlSer(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Resolve the config file path: `<base_dir>/stratus.toml`
    pub fn default_path(base_dir: &Path) -> PathBuf {
        base_dir.join("stratus.toml")
    }

    /// Resolve the default stratus home directory: `~/.stratus`
    pub fn default_base_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|h| h.join(".stratus"))
            .ok_or_else(|| StratusError::Config("Cannot determine home directory".to_string()))
    }
}
