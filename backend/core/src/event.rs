use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user-facing notification emitted by the scan workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: Uuid,
    /// Generation of the capture cycle the event belongs to.
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ScanEventKind,
    pub payload: serde_json::Value,
}

/// Categories of things that happen during a scan cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScanEventKind {
    /// The capture provider was asked for an image
    CaptureStarted,
    /// The capture provider failed or was denied
    CaptureFailed,
    /// An image arrived; recognition and upload are running
    ScanStarted,
    /// A scan record was merged into history
    AddressFound,
    /// The upload failed and the scan kept a local image
    UploadDegraded,
    /// Recognition failed; no record was created
    ScanFailed,
    /// A result arrived for a cycle that was already abandoned
    ResultDiscarded,
    /// A history entry became the current display
    HistorySelected,
    /// The user cleared the preview and current result
    Retake,
}

impl ScanEvent {
    pub fn new(generation: u64, kind: ScanEventKind, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }

    /// Failures the user should see as an error toast rather than info.
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ScanEventKind::CaptureFailed | ScanEventKind::ScanFailed)
    }
}

impl std::fmt::Display for ScanEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_else(|| format!("{:?}", self));
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = ScanEvent::new(
            3,
            ScanEventKind::AddressFound,
            serde_json::json!({"address": "daring.lion.race", "confidence": 91}),
        );
        assert_eq!(event.generation, 3);
        assert_eq!(event.kind, ScanEventKind::AddressFound);
        assert!(!event.is_error());
    }

    #[test]
    fn test_event_serialization() {
        let event = ScanEvent::new(1, ScanEventKind::ScanFailed, serde_json::json!({}));
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ScanEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.kind, ScanEventKind::ScanFailed);
        assert!(deserialized.is_error());
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(ScanEventKind::UploadDegraded.to_string(), "upload_degraded");
        assert_eq!(ScanEventKind::CaptureFailed.to_string(), "capture_failed");
    }
}
