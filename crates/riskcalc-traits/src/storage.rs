//! File storage traits.
//!
//! The engine downloads source exposure files and stores its result
//! documents through [`FileStorage`]. Storage implementations are
//! EXTENSIONS (local filesystem, object stores).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use riskcalc_core::BatchId;

use crate::error::TraitError;

/// Source and result file storage.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Fetches the raw content at `uri`.
    async fn download_file_content(&self, uri: &str) -> Result<Bytes, TraitError>;

    /// Stores the serialized result document of a batch, returning its URI.
    async fn store_calculation_results(
        &self,
        batch_id: &BatchId,
        json_content: &str,
    ) -> Result<String, TraitError>;
}

#[async_trait]
impl<T: FileStorage + ?Sized> FileStorage for Arc<T> {
    async fn download_file_content(&self, uri: &str) -> Result<Bytes, TraitError> {
        (**self).download_file_content(uri).await
    }

    async fn store_calculation_results(
        &self,
        batch_id: &BatchId,
        json_content: &str,
    ) -> Result<String, TraitError> {
        (**self).store_calculation_results(batch_id, json_content).await
    }
}
