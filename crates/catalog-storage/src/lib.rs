//! HTTP client for the product image bucket.

pub mod client;
pub mod error;

pub use client::StorageClient;
pub use error::StorageError;
