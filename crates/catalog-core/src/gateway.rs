//! Seams between the import pipeline and the systems it writes to.
//!
//! The Postgres store and the storage bucket implement these traits; the
//! import crate only ever sees the traits, which keeps it testable against
//! in-memory fakes.

use std::future::Future;

use thiserror::Error;

use crate::products::{NewProduct, Product, ProductChanges};

/// Failure reported by an external collaborator (database or storage).
#[derive(Debug, Error)]
#[error("{context}: {message}")]
pub struct GatewayError {
    pub context: String,
    pub message: String,
}

impl GatewayError {
    pub fn new(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            context: context.into(),
            message: message.to_string(),
        }
    }
}

/// Write access to the product catalog.
pub trait CatalogWriter: Sync {
    /// Applies a sparse update. Returns `Ok(None)` when no live product has `id`.
    fn update_product(
        &self,
        id: i64,
        changes: &ProductChanges,
    ) -> impl Future<Output = Result<Option<Product>, GatewayError>> + Send;

    /// Inserts a new product and returns the stored row.
    fn create_product(
        &self,
        product: &NewProduct,
    ) -> impl Future<Output = Result<Product, GatewayError>> + Send;
}

/// Upload access to the product image bucket.
pub trait ImageUploader: Sync {
    /// Stores `bytes` at `object_path` (overwriting) and returns its public URL.
    fn upload_image(
        &self,
        object_path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}
