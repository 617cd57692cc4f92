//! Asset stores for captured parcel images.
//!
//! Every store implements [`parcelscan_core::AssetStore`]: upload bytes under
//! a caller-chosen filename and get back a public URL.

pub mod filename;
pub mod http;
pub mod local;
pub mod memory;

pub use filename::{scan_filename, DEFAULT_PREFIX};
pub use http::{HttpAssetStore, HttpStoreConfig};
pub use local::LocalAssetStore;
pub use memory::InMemoryAssetStore;
