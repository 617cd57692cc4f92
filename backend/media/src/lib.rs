//! Image capture for the parcel scanner: filesystem-backed capture
//! providers, quality re-encoding, and serving of stored images.

pub mod capture;
pub mod encode;
pub mod media_server;
pub mod mime_detect;

pub use capture::{FileCaptureProvider, InboxCaptureProvider};
pub use encode::apply_quality;
pub use media_server::{is_safe_filename, media_router};
pub use mime_detect::{detect_mime_type, is_image, is_inline_safe, is_reencodable};
