//! Scan event journal
//!
//! Every `ScanEvent` the workflow broadcasts is written as one redacted
//! NDJSON line under the `scan_events` target.

use chrono::{DateTime, Utc};
use parcelscan_core::{ScanEvent, ScanEventKind};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::redact::redact_json;

#[derive(Debug, Serialize)]
pub struct JournalEntry {
    pub event_id: String,
    pub generation: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ScanEventKind,
    pub payload: serde_json::Value,
}

impl From<&ScanEvent> for JournalEntry {
    fn from(event: &ScanEvent) -> Self {
        Self {
            event_id: event.id.to_string(),
            generation: event.generation,
            timestamp: event.timestamp,
            kind: event.kind.clone(),
            payload: redact_json(&event.payload),
        }
    }
}

/// Write one event to the journal.
pub fn log_scan_event(event: &ScanEvent) {
    let entry = JournalEntry::from(event);
    let line = serde_json::to_string(&entry).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"));
    if event.is_error() {
        warn!(target: "scan_events", kind = %event.kind, entry = %line, "Scan event");
    } else {
        info!(target: "scan_events", kind = %event.kind, entry = %line, "Scan event");
    }
}

/// Drain a workflow event subscription into the journal until the sender
/// side is dropped. Returns the number of events written.
pub fn spawn_journal(mut rx: broadcast::Receiver<ScanEvent>) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut written = 0u64;
        loop {
            match rx.recv().await {
                Ok(event) => {
                    log_scan_event(&event);
                    written += 1;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "scan_events", skipped, "Journal fell behind; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        written
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_redacts_payload() {
        let event = ScanEvent::new(
            2,
            ScanEventKind::UploadDegraded,
            json!({"error": "401 for Bearer abc123", "preview": "data:image/png;base64,AAAA"}),
        );
        let entry = JournalEntry::from(&event);
        assert_eq!(entry.generation, 2);
        assert_eq!(entry.payload["error"], "401 for [REDACTED_TOKEN]");
        assert_eq!(entry.payload["preview"], "data:image/png;base64,[4 chars]");
    }

    #[tokio::test]
    async fn journal_drains_until_closed() {
        let (tx, rx) = broadcast::channel(8);
        let handle = spawn_journal(rx);
        tx.send(ScanEvent::new(1, ScanEventKind::CaptureStarted, json!({}))).unwrap();
        tx.send(ScanEvent::new(1, ScanEventKind::ScanFailed, json!({"message": "x"})))
            .unwrap();
        drop(tx);
        assert_eq!(handle.await.unwrap(), 2);
    }
}
