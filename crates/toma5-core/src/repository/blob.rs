//! Blob store port for evidence images.

use toma5_types::error::BlobError;

/// Stores a raw image reference and returns its public URL.
pub trait BlobStore: Send + Sync {
    fn store_image(
        &self,
        raw: &str,
    ) -> impl std::future::Future<Output = Result<String, BlobError>> + Send;

    /// Remove a previously stored image by its public URL. Deleting an image
    /// that is already gone succeeds.
    fn delete_image(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = Result<(), BlobError>> + Send;
}
