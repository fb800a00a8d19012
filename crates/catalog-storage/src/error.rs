use thiserror::Error;

/// Errors returned by the storage bucket client.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No storage base URL is configured.
    #[error("storage is not configured (set CATALOG_STORAGE_URL)")]
    NotConfigured,

    /// The configured base URL does not parse.
    #[error("invalid storage base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storage API answered with a non-2xx status.
    #[error("storage API returned {status}: {message}")]
    Rejected { status: u16, message: String },
}
