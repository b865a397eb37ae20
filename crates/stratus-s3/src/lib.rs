mod download;
pub mod facade;
pub mod factory;
pub mod local;
pub mod provider;
pub mod types;

#[cfg(feature = "aws")]
pub mod s3;

pub use facade::ObjectStoreFacade;
pub use provider::ObjectStore;
pub use types::{AclAck, CannedAcl, ListPage, ObjectAcl, ObjectEntry};
