//! The scan workflow controller.
//!
//! One capture cycle: ask the capture provider for an image, then run
//! recognition and upload side by side, and merge both outcomes into a
//! [`ScanRecord`] once both have settled. State changes go through the
//! reducer in `parcelscan_core::state`; every cycle carries the generation it
//! started under, so results that arrive after a retake are dropped.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parcelscan_core::{
    Action, AssetStore, CaptureError, CaptureProvider, ImageReference, RecognitionError,
    RecognitionService, ScanError, ScanEvent, ScanEventKind, ScanId, ScanRecord, ScanSnapshot,
    ScanState, StoreError, Transition,
};
use parcelscan_storage::scan_filename;
use serde_json::json;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use crate::settings::WorkflowSettings;

/// Await `fut`, turning expiry of `limit` into the branch's own error.
async fn within<T, E>(
    limit: Duration,
    fut: impl Future<Output = Result<T, E>>,
    on_timeout: impl FnOnce(Duration) -> E,
) -> Result<T, E> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout(limit)),
    }
}

#[derive(Clone)]
pub struct ScanController {
    capture: Arc<dyn CaptureProvider>,
    recognizer: Arc<dyn RecognitionService>,
    store: Arc<dyn AssetStore>,
    settings: Arc<WorkflowSettings>,
    state: Arc<Mutex<ScanState>>,
    events: broadcast::Sender<ScanEvent>,
}

impl ScanController {
    pub fn new(
        capture: Arc<dyn CaptureProvider>,
        recognizer: Arc<dyn RecognitionService>,
        store: Arc<dyn AssetStore>,
        settings: WorkflowSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(settings.event_buffer.max(1));
        Self {
            capture,
            recognizer,
            store,
            settings: Arc::new(settings),
            state: Arc::new(Mutex::new(ScanState::new())),
            events,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Subscribe to user-facing notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ScanSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Full history, most recent first.
    pub async fn history(&self) -> Vec<ScanRecord> {
        self.state.lock().await.history.clone()
    }

    pub async fn current(&self) -> Option<ScanRecord> {
        self.state.lock().await.current.clone()
    }

    pub async fn is_scanning(&self) -> bool {
        self.state.lock().await.scanning
    }

    /// Run one capture cycle.
    ///
    /// Fails with [`ScanError::Busy`] while another cycle is running and with
    /// [`ScanError::Superseded`] if a retake happened before the result landed.
    /// Upload failures do not fail the cycle; the record keeps the image inline.
    pub async fn start_capture(&self) -> Result<ScanRecord, ScanError> {
        let generation = match self.dispatch(Action::CaptureRequested).await {
            Transition::Started { generation } => generation,
            _ => {
                warn!("Capture requested while a scan is in progress");
                return Err(ScanError::Busy);
            }
        };
        self.emit(
            generation,
            ScanEventKind::CaptureStarted,
            json!({ "provider": self.capture.name() }),
        );

        let captured = within(
            self.settings.capture_timeout,
            self.capture.capture(&self.settings.capture),
            CaptureError::Timeout,
        )
        .await;

        let image = match captured {
            Ok(image) => image,
            Err(e) => {
                warn!(generation, error = %e, "Capture failed");
                if self.dispatch(Action::CaptureFailed { generation }).await == Transition::Discarded {
                    return Err(self.discarded(generation));
                }
                self.emit(
                    generation,
                    ScanEventKind::CaptureFailed,
                    json!({ "message": e.user_message(), "error": e.to_string() }),
                );
                return Err(e.into());
            }
        };

        let transition = self
            .dispatch(Action::ImageCaptured {
                generation,
                image: image.clone(),
            })
            .await;
        if transition == Transition::Discarded {
            return Err(self.discarded(generation));
        }

        let id = ScanId::generate(image.captured_at);
        let filename = scan_filename(
            &self.settings.filename_prefix,
            id.as_str(),
            image.extension(),
        );
        info!(
            generation,
            id = %id,
            bytes = image.len(),
            recognizer = self.recognizer.name(),
            store = self.store.name(),
            "Scanning image"
        );
        self.emit(
            generation,
            ScanEventKind::ScanStarted,
            json!({ "id": id, "filename": filename }),
        );

        let (recognition, upload) = tokio::join!(
            within(
                self.settings.recognition_timeout,
                self.recognizer.recognize(&image.data),
                RecognitionError::Timeout,
            ),
            within(
                self.settings.upload_timeout,
                self.store.upload(image.data.clone(), &filename, &image.mime_type),
                StoreError::Timeout,
            ),
        );

        let recognition = match recognition {
            Ok(result) => result,
            Err(e) => {
                error!(generation, id = %id, error = %e, "Recognition failed");
                if self.dispatch(Action::RecognitionFailed { generation }).await
                    == Transition::Discarded
                {
                    return Err(self.discarded(generation));
                }
                self.emit(
                    generation,
                    ScanEventKind::ScanFailed,
                    json!({ "message": e.user_message(), "error": e.to_string() }),
                );
                return Err(e.into());
            }
        };

        let (image_reference, degraded) = match upload {
            Ok(url) => (ImageReference::Remote { url }, None),
            Err(e) => {
                warn!(generation, filename = %filename, error = %e, "Upload failed; keeping image locally");
                (
                    ImageReference::Local {
                        data_url: image.to_data_url(),
                    },
                    Some(e),
                )
            }
        };

        let record = ScanRecord::merge(id, image.captured_at, recognition, image_reference);
        match self
            .dispatch(Action::ScanMerged {
                generation,
                record: record.clone(),
            })
            .await
        {
            Transition::Applied => {}
            Transition::Discarded => return Err(self.discarded(generation)),
            other => {
                error!(generation, id = %record.id, transition = ?other, "Merge refused");
                let err = ScanError::Duplicate(record.id);
                self.emit(
                    generation,
                    ScanEventKind::ScanFailed,
                    json!({ "message": err.user_message(), "error": err.to_string() }),
                );
                return Err(err);
            }
        }

        if let Some(e) = degraded {
            self.emit(
                generation,
                ScanEventKind::UploadDegraded,
                json!({ "id": record.id, "error": e.to_string() }),
            );
        }
        info!(
            generation,
            id = %record.id,
            address = %record.address,
            confidence = record.confidence,
            remote_stored = record.remote_stored,
            "Address found"
        );
        self.emit(
            generation,
            ScanEventKind::AddressFound,
            json!({
                "id": record.id,
                "address": record.address,
                "confidence": record.confidence,
                "remoteStored": record.remote_stored,
            }),
        );
        Ok(record)
    }

    /// Make the history entry `id` the current display.
    pub async fn select_history_entry(&self, id: &ScanId) -> Result<ScanRecord, ScanError> {
        let mut state = self.state.lock().await;
        let (next, transition) = state.apply(Action::Select { id: id.clone() });
        *state = next;
        let generation = state.generation;
        let current = state.current.clone();
        drop(state);

        match (transition, current) {
            (Transition::Applied, Some(record)) => {
                debug!(id = %id, "History entry selected");
                self.emit(generation, ScanEventKind::HistorySelected, json!({ "id": id }));
                Ok(record)
            }
            _ => Err(ScanError::NotFound(id.clone())),
        }
    }

    /// Clear the preview and current result, abandoning any in-flight cycle.
    pub async fn retake(&self) {
        let mut state = self.state.lock().await;
        let was_scanning = state.scanning;
        let (next, _) = state.apply(Action::Retake);
        *state = next;
        let generation = state.generation;
        drop(state);

        info!(generation, was_scanning, "Retake");
        self.emit(generation, ScanEventKind::Retake, json!({ "abandoned": was_scanning }));
    }

    async fn dispatch(&self, action: Action) -> Transition {
        let mut state = self.state.lock().await;
        let (next, transition) = state.apply(action);
        *state = next;
        transition
    }

    fn discarded(&self, generation: u64) -> ScanError {
        debug!(generation, "Dropping result of abandoned scan");
        self.emit(generation, ScanEventKind::ResultDiscarded, json!({}));
        ScanError::Superseded
    }

    fn emit(&self, generation: u64, kind: ScanEventKind, payload: serde_json::Value) {
        // no subscribers is fine
        let _ = self.events.send(ScanEvent::new(generation, kind, payload));
    }
}
