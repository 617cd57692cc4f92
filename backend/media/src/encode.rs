//! Quality reduction for captured photos.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use parcelscan_core::{CaptureError, CapturedImage};
use tracing::debug;

use crate::mime_detect::is_reencodable;

/// Re-encode `image` as JPEG at `quality` (1-100).
///
/// Quality 100 and formats we cannot decode are passed through untouched.
pub fn apply_quality(image: CapturedImage, quality: u8) -> Result<CapturedImage, CaptureError> {
    if quality >= 100 || !is_reencodable(&image.mime_type) {
        return Ok(image);
    }
    let quality = quality.max(1);

    let decoded = image::load_from_memory(&image.data)
        .map_err(|e| CaptureError::Unavailable(format!("unreadable image: {e}")))?;
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

    let mut out = Cursor::new(Vec::with_capacity(image.data.len()));
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| CaptureError::Unavailable(format!("jpeg encoding failed: {e}")))?;
    let out = out.into_inner();

    debug!(
        before = image.data.len(),
        after = out.len(),
        quality,
        "re-encoded capture"
    );

    Ok(CapturedImage {
        data: out.into(),
        mime_type: "image/jpeg".to_string(),
        captured_at: image.captured_at,
    })
}

#[cfg(test)]
pub(crate) fn sample_png() -> Vec<u8> {
    let img = image::RgbImage::from_fn(8, 8, |x, y| image::Rgb([(x * 30) as u8, (y * 30) as u8, 128]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reencodes_png_as_jpeg() {
        let input = CapturedImage::new(sample_png(), "image/png");
        let output = apply_quality(input, 90).unwrap();
        assert_eq!(output.mime_type, "image/jpeg");
        assert_eq!(&output.data[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn full_quality_passes_through() {
        let input = CapturedImage::new(sample_png(), "image/png");
        let output = apply_quality(input.clone(), 100).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn unknown_format_passes_through() {
        let input = CapturedImage::new(vec![1, 2, 3], "image/heic");
        let output = apply_quality(input.clone(), 50).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn corrupt_jpeg_is_a_capture_error() {
        let input = CapturedImage::new(vec![0xFF, 0xD8, 0x00], "image/jpeg");
        assert!(matches!(apply_quality(input, 80), Err(CaptureError::Unavailable(_))));
    }
}
