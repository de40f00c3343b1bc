//! Local filesystem storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use riskcalc_core::BatchId;
use riskcalc_traits::{FileStorage, TraitError};

/// File name of a stored result document inside its batch directory.
pub const RESULT_FILE_NAME: &str = "calculation-results.json";

const FILE_SCHEME: &str = "file://";

/// [`FileStorage`] over a local directory.
///
/// Source URIs are `file://` URIs or plain paths; relative paths resolve
/// against the base directory. Results are written to
/// `<base>/<batch_id>/calculation-results.json` and returned as `file://` URIs.
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    base_dir: PathBuf,
}

impl LocalFileStorage {
    /// Creates storage rooted at `base_dir`. The directory is created on first write.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Filesystem path for a source URI.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf, TraitError> {
        let raw = uri.strip_prefix(FILE_SCHEME).unwrap_or(uri);
        if raw.trim().is_empty() {
            return Err(TraitError::InvalidInput(format!("empty file URI '{uri}'")));
        }
        if raw.contains("://") {
            return Err(TraitError::InvalidInput(format!(
                "unsupported URI scheme in '{uri}'"
            )));
        }
        let path = Path::new(raw);
        Ok(if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        })
    }

    /// Path where the results of `batch_id` are stored.
    pub fn result_path(&self, batch_id: &BatchId) -> Result<PathBuf, TraitError> {
        let id = batch_id.as_str();
        let mut components = Path::new(id).components();
        let single_normal = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single_normal || id.contains(['/', '\\']) {
            return Err(TraitError::InvalidInput(format!(
                "batch id '{id}' cannot be used as a directory name"
            )));
        }
        Ok(self.base_dir.join(id).join(RESULT_FILE_NAME))
    }
}

fn file_uri(path: &Path) -> String {
    format!("{FILE_SCHEME}{}", path.display())
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn download_file_content(&self, uri: &str) -> Result<Bytes, TraitError> {
        let path = self.resolve(uri)?;
        let content = tokio::fs::read(&path).await?;
        debug!(path = %path.display(), bytes = content.len(), "Read source file");
        Ok(Bytes::from(content))
    }

    async fn store_calculation_results(
        &self,
        batch_id: &BatchId,
        json_content: &str,
    ) -> Result<String, TraitError> {
        let path = self.result_path(batch_id)?;
        let dir = path
            .parent()
            .ok_or_else(|| TraitError::Internal(format!("no parent for {}", path.display())))?;
        tokio::fs::create_dir_all(dir).await?;

        // write then rename so readers never see a partial document
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, json_content).await?;
        tokio::fs::rename(&staging, &path).await?;

        let absolute = tokio::fs::canonicalize(&path).await.unwrap_or(path);
        debug!(path = %absolute.display(), bytes = json_content.len(), "Stored calculation results");
        Ok(file_uri(&absolute))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_download_plain_relative_and_file_uri() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("exposures.json"), b"{\"exposures\": []}").unwrap();
        let storage = LocalFileStorage::new(dir.path());

        let relative = storage.download_file_content("exposures.json").await.unwrap();
        assert_eq!(&relative[..], b"{\"exposures\": []}");

        let uri = file_uri(&dir.path().join("exposures.json"));
        let absolute = storage.download_file_content(&uri).await.unwrap();
        assert_eq!(relative, absolute);
    }

    #[tokio::test]
    async fn test_download_errors() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path());

        assert!(matches!(
            storage.download_file_content("missing.json").await,
            Err(TraitError::NotFound(_))
        ));
        assert!(matches!(
            storage.download_file_content("s3://bucket/key.json").await,
            Err(TraitError::InvalidInput(_))
        ));
        assert!(matches!(
            storage.download_file_content("file://").await,
            Err(TraitError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_store_results_under_batch_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().join("results"));
        let batch = BatchId::new("B-2024-06");

        let uri = storage
            .store_calculation_results(&batch, "{\"formatVersion\":1}")
            .await
            .unwrap();

        assert!(uri.starts_with("file://"));
        assert!(uri.ends_with("B-2024-06/calculation-results.json"));
        let stored = storage.download_file_content(&uri).await.unwrap();
        assert_eq!(&stored[..], b"{\"formatVersion\":1}");

        // overwriting keeps a single document
        storage.store_calculation_results(&batch, "{}").await.unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("results/B-2024-06"))
            .unwrap()
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_batch_id_must_be_a_plain_name() {
        let storage = LocalFileStorage::new("/tmp/riskcalc");
        for bad in ["../escape", "a/b", "..", "", "/abs"] {
            assert!(
                storage.result_path(&BatchId::new(bad)).is_err(),
                "{bad} should be rejected"
            );
        }
        assert!(storage.result_path(&BatchId::new("B1")).is_ok());
    }
}
