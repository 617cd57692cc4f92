use std::time::Duration;

use thiserror::Error;

use crate::types::ScanId;

/// Failure to obtain an image from the capture provider.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("capture cancelled by user")]
    Cancelled,

    #[error("capture device unavailable: {0}")]
    Unavailable(String),

    #[error("capture timed out after {0:?}")]
    Timeout(Duration),
}

impl CaptureError {
    /// Wording shown to the user; every capture failure is retryable.
    pub fn user_message(&self) -> &'static str {
        "Camera access failed. Please check permissions."
    }
}

/// Failure of the recognition service to produce an address.
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognition service error ({service}): {message}")]
    Service { service: String, message: String },

    #[error("no address found in image")]
    NoAddress,

    #[error("recognition timed out after {0:?}")]
    Timeout(Duration),
}

impl RecognitionError {
    pub fn user_message(&self) -> &'static str {
        "Failed to scan image. Please try again."
    }
}

/// Failure to persist an image in the asset store. Never fatal to a scan.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("upload rejected ({status}): {message}")]
    Upload { status: u16, message: String },

    #[error("asset store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("asset already exists: {0}")]
    Rejected(String),

    #[error("upload timed out after {0:?}")]
    Timeout(Duration),

    #[error("asset store unreachable: {0}")]
    Transport(String),
}

/// Outcome of a scan controller operation that did not produce a result.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("a scan is already in progress")]
    Busy,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("no scan with id {0} in history")]
    NotFound(ScanId),

    #[error("scan result discarded after retake")]
    Superseded,

    #[error("scan {0} is already in history")]
    Duplicate(ScanId),
}

impl ScanError {
    pub fn user_message(&self) -> String {
        match self {
            ScanError::Busy => "A scan is already running.".to_string(),
            ScanError::Capture(e) => e.user_message().to_string(),
            ScanError::Recognition(e) => e.user_message().to_string(),
            ScanError::NotFound(id) => format!("Scan {id} is no longer available."),
            ScanError::Superseded => "Scan was cancelled.".to_string(),
            ScanError::Duplicate(_) => "Scan could not be saved. Please try again.".to_string(),
        }
    }
}
