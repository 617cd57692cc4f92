//! Scan workflow state and its reducer.
//!
//! All mutation of the scanner's state goes through [`ScanState::apply`], which
//! returns the next state together with a [`Transition`] describing what
//! happened. Results of a capture cycle carry the generation they were started
//! under; once a retake (or a newer cycle) has bumped the live generation those
//! results are discarded instead of applied.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{CapturedImage, ScanId, ScanRecord};

/// Number of history entries shown on the results panel.
pub const HISTORY_VIEW_LIMIT: usize = 5;

/// Where the current capture cycle is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting on the capture provider.
    Capturing,
    /// Recognition and upload are in flight.
    Processing,
}

/// Inputs to the reducer.
#[derive(Debug, Clone)]
pub enum Action {
    CaptureRequested,
    CaptureFailed { generation: u64 },
    ImageCaptured { generation: u64, image: CapturedImage },
    ScanMerged { generation: u64, record: ScanRecord },
    RecognitionFailed { generation: u64 },
    Select { id: ScanId },
    Retake,
}

/// What the reducer did with an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new capture cycle began under this generation.
    Started { generation: u64 },
    /// The action was applied.
    Applied,
    /// The action was refused because a cycle is already running.
    Rejected,
    /// The action belonged to a stale cycle and was dropped.
    Discarded,
    /// `Select` named an id that is not in history.
    NotFound,
}

#[derive(Debug, Clone, Default)]
pub struct ScanState {
    pub captured_image: Option<CapturedImage>,
    pub scanning: bool,
    /// Most recent first.
    pub history: Vec<ScanRecord>,
    pub current: Option<ScanRecord>,
    pub generation: u64,
    pub phase: Phase,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the state that follows `action`. `self` is left untouched.
    pub fn apply(&self, action: Action) -> (ScanState, Transition) {
        match action {
            Action::CaptureRequested => {
                if self.phase != Phase::Idle || self.scanning {
                    debug!(phase = ?self.phase, "capture rejected: cycle already running");
                    return (self.clone(), Transition::Rejected);
                }
                let generation = self.generation + 1;
                let next = ScanState {
                    generation,
                    phase: Phase::Capturing,
                    ..self.clone()
                };
                (next, Transition::Started { generation })
            }
            Action::CaptureFailed { generation } => {
                if !self.is_live(generation) {
                    return (self.clone(), Transition::Discarded);
                }
                let next = ScanState {
                    phase: Phase::Idle,
                    ..self.clone()
                };
                (next, Transition::Applied)
            }
            Action::ImageCaptured { generation, image } => {
                if !self.is_live(generation) {
                    return (self.clone(), Transition::Discarded);
                }
                let next = ScanState {
                    captured_image: Some(image),
                    scanning: true,
                    phase: Phase::Processing,
                    ..self.clone()
                };
                (next, Transition::Applied)
            }
            Action::ScanMerged { generation, record } => {
                if !self.is_live(generation) {
                    return (self.clone(), Transition::Discarded);
                }
                if self.history.iter().any(|r| r.id == record.id) {
                    debug!(id = %record.id, "merge rejected: duplicate scan id");
                    // The cycle still ends; history stays as it was.
                    let next = ScanState {
                        scanning: false,
                        phase: Phase::Idle,
                        ..self.clone()
                    };
                    return (next, Transition::Rejected);
                }
                let mut history = Vec::with_capacity(self.history.len() + 1);
                history.push(record.clone());
                history.extend(self.history.iter().cloned());
                let next = ScanState {
                    captured_image: self.captured_image.clone(),
                    scanning: false,
                    history,
                    current: Some(record),
                    generation: self.generation,
                    phase: Phase::Idle,
                };
                (next, Transition::Applied)
            }
            Action::RecognitionFailed { generation } => {
                if !self.is_live(generation) {
                    return (self.clone(), Transition::Discarded);
                }
                let next = ScanState {
                    captured_image: None,
                    scanning: false,
                    phase: Phase::Idle,
                    ..self.clone()
                };
                (next, Transition::Applied)
            }
            Action::Select { id } => match self.history.iter().find(|r| r.id == id) {
                Some(record) => {
                    let next = ScanState {
                        current: Some(record.clone()),
                        ..self.clone()
                    };
                    (next, Transition::Applied)
                }
                None => (self.clone(), Transition::NotFound),
            },
            Action::Retake => {
                let next = ScanState {
                    captured_image: None,
                    scanning: false,
                    history: self.history.clone(),
                    current: None,
                    generation: self.generation + 1,
                    phase: Phase::Idle,
                };
                (next, Transition::Applied)
            }
        }
    }

    /// Whether results tagged with `generation` may still touch this state.
    pub fn is_live(&self, generation: u64) -> bool {
        generation == self.generation && self.phase != Phase::Idle
    }

    /// Read-only view for the presentation layer.
    pub fn snapshot(&self) -> ScanSnapshot {
        ScanSnapshot {
            preview: self.captured_image.as_ref().map(CapturedImage::to_data_url),
            scanning: self.scanning,
            phase: self.phase,
            current: self.current.clone(),
            recent: self.history.iter().take(HISTORY_VIEW_LIMIT).cloned().collect(),
            total_scans: self.history.len(),
        }
    }
}

/// What a single screen needs to render the scanner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub preview: Option<String>,
    pub scanning: bool,
    pub phase: Phase,
    pub current: Option<ScanRecord>,
    pub recent: Vec<ScanRecord>,
    pub total_scans: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ImageReference, RecognitionResult};
    use chrono::Utc;

    fn record(id: &str, address: &str) -> ScanRecord {
        ScanRecord::merge(
            ScanId::from(id),
            Utc::now(),
            RecognitionResult::new(address, 90),
            ImageReference::Remote { url: format!("https://store/{id}.jpg") },
        )
    }

    fn image() -> CapturedImage {
        CapturedImage::new(vec![0xFF, 0xD8], "image/jpeg")
    }

    /// Drive one full successful cycle and return the resulting state.
    fn complete_cycle(state: &ScanState, rec: ScanRecord) -> ScanState {
        let (state, t) = state.apply(Action::CaptureRequested);
        let Transition::Started { generation } = t else { panic!("expected start, got {t:?}") };
        let (state, _) = state.apply(Action::ImageCaptured { generation, image: image() });
        let (state, t) = state.apply(Action::ScanMerged { generation, record: rec });
        assert_eq!(t, Transition::Applied);
        state
    }

    #[test]
    fn capture_request_is_rejected_while_cycle_runs() {
        let (state, t) = ScanState::new().apply(Action::CaptureRequested);
        assert!(matches!(t, Transition::Started { generation: 1 }));
        let (again, t) = state.apply(Action::CaptureRequested);
        assert_eq!(t, Transition::Rejected);
        assert_eq!(again.generation, 1);
    }

    #[test]
    fn merge_prepends_and_sets_current() {
        let state = complete_cycle(&ScanState::new(), record("1", "filled.count.soap"));
        let state = complete_cycle(&state, record("2", "index.home.raft"));
        let state = complete_cycle(&state, record("3", "daring.lion.race"));

        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history[0].id.as_str(), "3");
        assert_eq!(state.history[2].id.as_str(), "1");
        assert_eq!(state.current.as_ref().unwrap().id.as_str(), "3");
        assert!(!state.scanning);
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn capture_failure_leaves_state_unchanged() {
        let base = complete_cycle(&ScanState::new(), record("1", "filled.count.soap"));
        let (state, t) = base.apply(Action::CaptureRequested);
        let Transition::Started { generation } = t else { unreachable!() };
        let (state, t) = state.apply(Action::CaptureFailed { generation });
        assert_eq!(t, Transition::Applied);
        assert_eq!(state.history, base.history);
        assert_eq!(state.current, base.current);
        assert_eq!(state.captured_image, base.captured_image);
        assert!(!state.scanning);
    }

    #[test]
    fn recognition_failure_discards_image_but_keeps_history() {
        let base = complete_cycle(&ScanState::new(), record("1", "filled.count.soap"));
        let (state, t) = base.apply(Action::CaptureRequested);
        let Transition::Started { generation } = t else { unreachable!() };
        let (state, _) = state.apply(Action::ImageCaptured { generation, image: image() });
        assert!(state.scanning);
        let (state, _) = state.apply(Action::RecognitionFailed { generation });
        assert!(!state.scanning);
        assert!(state.captured_image.is_none());
        assert_eq!(state.history, base.history);
        assert_eq!(state.current, base.current);
    }

    #[test]
    fn retake_discards_in_flight_results() {
        let (state, t) = ScanState::new().apply(Action::CaptureRequested);
        let Transition::Started { generation } = t else { unreachable!() };
        let (state, _) = state.apply(Action::ImageCaptured { generation, image: image() });
        let (state, _) = state.apply(Action::Retake);
        assert!(state.captured_image.is_none());
        assert!(state.current.is_none());
        assert!(!state.scanning);

        let (after, t) = state.apply(Action::ScanMerged { generation, record: record("9", "a.b.c") });
        assert_eq!(t, Transition::Discarded);
        assert!(after.current.is_none());
        assert!(after.history.is_empty());
    }

    #[test]
    fn stale_result_does_not_touch_newer_cycle() {
        let (state, t) = ScanState::new().apply(Action::CaptureRequested);
        let Transition::Started { generation: old } = t else { unreachable!() };
        let (state, _) = state.apply(Action::Retake);
        let (state, t) = state.apply(Action::CaptureRequested);
        let Transition::Started { generation: new } = t else { unreachable!() };
        assert_ne!(old, new);

        let (state, t) = state.apply(Action::CaptureFailed { generation: old });
        assert_eq!(t, Transition::Discarded);
        assert_eq!(state.phase, Phase::Capturing);
    }

    #[test]
    fn duplicate_id_ends_cycle_without_touching_history() {
        let state = complete_cycle(&ScanState::new(), record("1", "filled.count.soap"));
        let (state, t) = state.apply(Action::CaptureRequested);
        let Transition::Started { generation } = t else { panic!("expected start, got {t:?}") };
        let (state, _) = state.apply(Action::ImageCaptured { generation, image: image() });
        let (state, t) = state.apply(Action::ScanMerged {
            generation,
            record: record("1", "index.home.raft"),
        });
        assert_eq!(t, Transition::Rejected);
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history[0].address, "filled.count.soap");
        assert!(!state.scanning);
        assert_eq!(state.phase, Phase::Idle);
    }

    #[test]
    fn select_sets_exact_record() {
        let state = complete_cycle(&ScanState::new(), record("1", "filled.count.soap"));
        let state = complete_cycle(&state, record("2", "index.home.raft"));
        let (selected, t) = state.apply(Action::Select { id: ScanId::from("1") });
        assert_eq!(t, Transition::Applied);
        assert_eq!(selected.current.as_ref(), Some(&state.history[1]));

        let (missing, t) = selected.apply(Action::Select { id: ScanId::from("404") });
        assert_eq!(t, Transition::NotFound);
        assert_eq!(missing.current, selected.current);
    }

    #[test]
    fn snapshot_limits_recent_history() {
        let mut state = ScanState::new();
        for i in 0..7 {
            state = complete_cycle(&state, record(&i.to_string(), "laptop.green.view"));
        }
        let snap = state.snapshot();
        assert_eq!(snap.recent.len(), HISTORY_VIEW_LIMIT);
        assert_eq!(snap.total_scans, 7);
        assert_eq!(snap.recent[0].id.as_str(), "6");
    }
}
