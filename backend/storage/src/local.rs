//! Directory-backed asset store.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use parcelscan_core::{AssetStore, StoreError};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Writes uploads into a directory that is served at `base_url`.
pub struct LocalAssetStore {
    dir: PathBuf,
    base_url: String,
}

impl LocalAssetStore {
    pub fn new(dir: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        if filename.is_empty() || filename.contains('/') || filename.contains("..") {
            return Err(StoreError::Rejected(filename.to_string()));
        }
        fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(filename);
        // create_new: an existing asset is never overwritten
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::Rejected(filename.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&data).await?;
        file.flush().await?;

        info!(path = %path.display(), bytes = data.len(), content_type, "Stored asset locally");
        Ok(self.public_url(filename))
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url, filename)
    }
}
