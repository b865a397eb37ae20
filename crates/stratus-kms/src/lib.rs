pub mod factory;
pub mod local;
pub mod provider;
pub mod vault;

#[cfg(feature = "aws")]
pub mod aws_kms;

pub use provider::KeyService;
pub use vault::KeyVault;
