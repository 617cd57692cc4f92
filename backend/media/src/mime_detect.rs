//! MIME type detection for captured images.
//!
//! Used by the capture providers to label image bytes and by the asset
//! server to set response headers.

use std::path::Path;

/// Detect MIME type by file extension.
pub fn detect_mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png"          => "image/png",
        "gif"          => "image/gif",
        "webp"         => "image/webp",
        "heic"         => "image/heic",
        "bmp"          => "image/bmp",
        "tiff" | "tif" => "image/tiff",
        _              => "application/octet-stream",
    }
}

/// Whether a MIME type is for an image.
pub fn is_image(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Whether the image can be decoded and re-encoded at a lower quality.
pub fn is_reencodable(mime: &str) -> bool {
    matches!(mime, "image/jpeg" | "image/png")
}

/// Whether a file is safe to serve inline (not just download).
pub fn is_inline_safe(mime: &str) -> bool {
    matches!(mime, "image/jpeg" | "image/png" | "image/gif" | "image/webp")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_jpeg() {
        assert_eq!(detect_mime_type(&PathBuf::from("parcel.JPG")), "image/jpeg");
    }

    #[test]
    fn detects_heic_but_not_reencodable() {
        let mime = detect_mime_type(&PathBuf::from("IMG_0001.heic"));
        assert!(is_image(mime));
        assert!(!is_reencodable(mime));
    }

    #[test]
    fn unknown_extension_fallback() {
        let mime = detect_mime_type(&PathBuf::from("notes.txt"));
        assert_eq!(mime, "application/octet-stream");
        assert!(!is_image(mime));
    }
}
