pub mod error;
pub mod event;
pub mod state;
pub mod traits;
pub mod types;

pub use error::{CaptureError, RecognitionError, ScanError, StoreError};
pub use event::{ScanEvent, ScanEventKind};
pub use state::{Action, Phase, ScanSnapshot, ScanState, Transition, HISTORY_VIEW_LIMIT};
pub use traits::{AssetStore, CaptureProvider, RecognitionService};
pub use types::{
    CaptureOptions, CaptureSource, CapturedImage, ImageReference, RecognitionResult,
    ResultType, ScanId, ScanRecord,
};
