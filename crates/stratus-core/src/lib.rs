pub mod config;
pub mod error;
pub mod uri;

pub use error::{Result, StratusError};
pub use uri::{IntoStorageUri, StorageUri, parse_uri};
