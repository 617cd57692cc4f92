use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use parcelscan_core::{AssetStore, StoreError};

/// In-memory asset store for demos and tests. Contents die with the process.
#[derive(Clone, Default)]
pub struct InMemoryAssetStore {
    objects: Arc<RwLock<HashMap<String, (String, Bytes)>>>,
    base_url: String,
}

impl InMemoryAssetStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: Arc::default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Content type and bytes of a stored object.
    pub fn get(&self, filename: &str) -> Option<(String, Bytes)> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(filename)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AssetStore for InMemoryAssetStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let mut objects = self.objects.write().unwrap_or_else(|e| e.into_inner());
        if objects.contains_key(filename) {
            return Err(StoreError::Rejected(filename.to_string()));
        }
        objects.insert(filename.to_string(), (content_type.to_string(), data));
        Ok(self.public_url(filename))
    }

    fn public_url(&self, filename: &str) -> String {
        format!("{}/{}", self.base_url, filename)
    }
}
