use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StratusError {
    // IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Input
    #[error("Invalid storage URI: {0}")]
    InvalidUri(String),

    // Object store
    #[error("The file is already downloaded: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("No object matches s3://{bucket}/{prefix}; check that the URI is valid")]
    NotFound { bucket: String, prefix: String },

    #[error("Pagination error: {0}")]
    Pagination(String),

    // Key service
    #[error("Invalid base64 ciphertext: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Decrypted value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    // Config
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration file not found at {0}")]
    ConfigNotFound(String),

    #[error("TOML deserialization error: {0}")]
    TomlDe(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(String),

    // Remote services
    #[error(transparent)]
    Remote(#[from] anyhow::Error),
}

impl StratusError {
    /// True for the listing "prefix has no objects" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StratusError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, StratusError>;
