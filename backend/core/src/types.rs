use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Largest valid confidence percentage.
pub const MAX_CONFIDENCE: u8 = 100;

/// Last id handed out, in milliseconds since the epoch.
static LAST_ID_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Identifier of a scan, derived from the capture time.
///
/// Ids are strictly increasing within a process: two captures landing in the
/// same millisecond get consecutive values instead of the same one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanId(String);

impl ScanId {
    /// Allocate the next id for a capture taken at `at`.
    pub fn generate(at: DateTime<Utc>) -> Self {
        let wanted = at.timestamp_millis();
        let mut last = LAST_ID_MILLIS.load(Ordering::Relaxed);
        loop {
            let next = wanted.max(last + 1);
            match LAST_ID_MILLIS.compare_exchange_weak(
                last,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(next.to_string()),
                Err(current) => last = current,
            }
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ScanId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ScanId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ScanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image handed over by a capture provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub data: Bytes,
    pub mime_type: String,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            captured_at: Utc::now(),
        }
    }

    pub fn with_captured_at(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at = at;
        self
    }

    /// Displayable inline form: `data:<mime>;base64,<payload>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }

    /// File extension matching the MIME type, used for stored filenames.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/heic" => "heic",
            _ => "bin",
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What the recognition service read off the label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecognitionResult {
    pub address: String,
    pub confidence: u8,
}

impl RecognitionResult {
    /// Confidence above 100 is clamped.
    pub fn new(address: impl Into<String>, confidence: u32) -> Self {
        Self {
            address: address.into(),
            confidence: confidence.min(MAX_CONFIDENCE as u32) as u8,
        }
    }
}

/// Where the image of a scan can be fetched from.
///
/// Serialized as the bare locator string; `data:` URLs read back as `Local`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ImageReference {
    /// Public URL returned by the asset store.
    Remote { url: String },
    /// Inline data URL kept when the upload did not go through.
    Local { data_url: String },
}

impl From<ImageReference> for String {
    fn from(reference: ImageReference) -> Self {
        match reference {
            ImageReference::Remote { url } => url,
            ImageReference::Local { data_url } => data_url,
        }
    }
}

impl From<String> for ImageReference {
    fn from(locator: String) -> Self {
        if locator.starts_with("data:") {
            ImageReference::Local { data_url: locator }
        } else {
            ImageReference::Remote { url: locator }
        }
    }
}

impl ImageReference {
    pub fn locator(&self) -> &str {
        match self {
            ImageReference::Remote { url } => url,
            ImageReference::Local { data_url } => data_url,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ImageReference::Remote { .. })
    }
}

/// One completed scan. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: ScanId,
    pub captured_at: DateTime<Utc>,
    pub image_reference: ImageReference,
    pub address: String,
    pub confidence: u8,
    pub remote_stored: bool,
}

impl ScanRecord {
    /// Merge a recognition result with the image reference the upload produced.
    pub fn merge(
        id: ScanId,
        captured_at: DateTime<Utc>,
        recognition: RecognitionResult,
        image_reference: ImageReference,
    ) -> Self {
        let remote_stored = image_reference.is_remote();
        Self {
            id,
            captured_at,
            image_reference,
            address: recognition.address,
            confidence: recognition.confidence,
            remote_stored,
        }
    }

    /// The address the way it is printed on labels, e.g. `///daring.lion.race`.
    pub fn display_address(&self) -> String {
        format!("///{}", self.address.trim_start_matches('/'))
    }
}

/// Encoding the capture provider should hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultType {
    #[default]
    DataUrl,
    Base64,
    Uri,
}

/// Where the capture provider should take the image from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureSource {
    #[default]
    Camera,
    Gallery,
}

/// Options passed to [`crate::CaptureProvider::capture`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    /// JPEG quality, 0-100.
    pub quality: u8,
    pub allow_editing: bool,
    pub result_type: ResultType,
    pub source: CaptureSource,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 90,
            allow_editing: false,
            result_type: ResultType::DataUrl,
            source: CaptureSource::Camera,
        }
    }
}
