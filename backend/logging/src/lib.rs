//! Structured logging for the parcel scanner.
//!
//! Console plus rolling NDJSON file output, redaction of secrets and inline
//! image data, and a journal that records every scan event.

pub mod journal;
pub mod logger;
pub mod redact;

pub use journal::{JournalEntry, log_scan_event, spawn_journal};
pub use logger::{LOG_FILE_NAME, init_logger};
pub use redact::{redact_json, redact_sensitive_data};
