use std::time::Duration;

use parcelscan_core::CaptureOptions;
use parcelscan_storage::DEFAULT_PREFIX;
use serde::{Deserialize, Serialize};

/// Default limit for waiting on the capture provider.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit for each of recognition and upload.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Knobs of one scan controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    pub capture: CaptureOptions,
    pub capture_timeout: Duration,
    pub recognition_timeout: Duration,
    pub upload_timeout: Duration,
    /// Prefix of uploaded filenames, `<prefix>_<stamp>.<ext>`.
    pub filename_prefix: String,
    /// Capacity of the event broadcast channel.
    pub event_buffer: usize,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            capture: CaptureOptions::default(),
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
            recognition_timeout: DEFAULT_CALL_TIMEOUT,
            upload_timeout: DEFAULT_CALL_TIMEOUT,
            filename_prefix: DEFAULT_PREFIX.to_string(),
            event_buffer: 64,
        }
    }
}
