pub mod address;
pub mod mock;
pub mod vision;

pub use address::{extract_address, is_address};
pub use mock::{MockRecognizer, MOCK_ADDRESSES};
pub use vision::{parse_reply, VisionProvider, VisionRecognizer};
