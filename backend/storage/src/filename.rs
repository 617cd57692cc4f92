/// Prefix of stored scan images.
pub const DEFAULT_PREFIX: &str = "parcel";

/// `<prefix>_<stamp>.<ext>`, the name a capture is uploaded under.
///
/// `stamp` is the scan id, so uniqueness of names follows from uniqueness of ids.
pub fn scan_filename(prefix: &str, stamp: &str, ext: &str) -> String {
    format!("{prefix}_{stamp}.{ext}")
}
