use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{CaptureError, RecognitionError, StoreError};
use crate::types::{CaptureOptions, CapturedImage, RecognitionResult};

/// Source of parcel-label photos (device camera, drop folder, fixed file).
#[async_trait]
pub trait CaptureProvider: Send + Sync {
    /// Provider name used in logs (e.g., "inbox", "file").
    fn name(&self) -> &str;

    /// Take one picture. Denial, cancellation and missing hardware all surface
    /// as a [`CaptureError`].
    async fn capture(&self, options: &CaptureOptions) -> Result<CapturedImage, CaptureError>;
}

/// Reads a what3words address off an image.
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Service name (e.g., "mock", "openai").
    fn name(&self) -> &str;

    /// Recognize the address printed in `image`.
    async fn recognize(&self, image: &[u8]) -> Result<RecognitionResult, RecognitionError>;
}

/// Durable object storage for captured images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store name (e.g., "local", "http").
    fn name(&self) -> &str;

    /// Create `filename` with the given bytes and return its public URL.
    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError>;

    /// Public retrieval URL for `filename`, whether or not it exists yet.
    fn public_url(&self, filename: &str) -> String;
}
