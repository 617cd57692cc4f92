//! Scan workflow: capture a label photo, read its address, keep a history.

pub mod controller;
pub mod settings;

pub use controller::ScanController;
pub use settings::{WorkflowSettings, DEFAULT_CALL_TIMEOUT, DEFAULT_CAPTURE_TIMEOUT};
