//! Error types for storage backends and remote sources.

/// Errors from an [`ObjectStore`](crate::ObjectStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The AWS SDK rejected or failed a request.
    #[error("S3 request failed: {0}")]
    S3(String),

    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The storage service returned a non-2xx status code.
    #[error("Storage API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// The URL does not point into this store.
    #[error("Object URL is not valid for this store: {0}")]
    InvalidUrl(String),

    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Errors from pulling a file out of Dropbox or SharePoint.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider refused the access token.
    #[error("Invalid {provider} access token.")]
    InvalidToken { provider: &'static str },

    /// The provider returned a non-2xx status code.
    #[error("{provider} API error ({status}): {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("The selected item is a folder, not a file.")]
    IsFolder,

    /// The provider answered with metadata we could not interpret.
    #[error("Unexpected {provider} response: {detail}")]
    Malformed {
        provider: &'static str,
        detail: String,
    },
}
