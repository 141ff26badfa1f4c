//! Object storage backends and remote file sources for document intake.
//!
//! Uploaded faxes land in an [`ObjectStore`] (S3 or Azure Blob). Files can
//! also be pulled from a user's Dropbox or SharePoint before storage.

pub mod azure;
pub mod dropbox;
pub mod error;
pub mod memory;
pub mod naming;
pub mod s3;
pub mod sharepoint;
pub mod store;

pub use error::{SourceError, StorageError};
pub use store::{ObjectStore, DEFAULT_PRESIGN_EXPIRY};
