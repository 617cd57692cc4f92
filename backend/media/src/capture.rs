//! Capture providers backed by the filesystem.
//!
//! A tablet camera app (or a scanner station) drops photos into an inbox
//! directory; [`InboxCaptureProvider`] hands out the newest one. For one-shot
//! command line use, [`FileCaptureProvider`] always returns the same file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use parcelscan_core::{CaptureError, CaptureOptions, CaptureProvider, CaptureSource, CapturedImage};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::encode::apply_quality;
use crate::mime_detect::{detect_mime_type, is_image};

/// Map filesystem errors onto the capture error taxonomy.
fn capture_error(path: &Path, err: io::Error) -> CaptureError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => CaptureError::PermissionDenied,
        io::ErrorKind::NotFound => {
            CaptureError::Unavailable(format!("{} does not exist", path.display()))
        }
        _ => CaptureError::Unavailable(format!("{}: {err}", path.display())),
    }
}

fn check_options(options: &CaptureOptions) -> Result<(), CaptureError> {
    if options.allow_editing {
        return Err(CaptureError::Unavailable(
            "in-capture editing is not supported".to_string(),
        ));
    }
    Ok(())
}

/// Read an image file and apply the requested quality in a blocking worker.
async fn load_image(path: &Path, options: &CaptureOptions) -> Result<CapturedImage, CaptureError> {
    let mime = detect_mime_type(path);
    if !is_image(mime) {
        return Err(CaptureError::Unavailable(format!(
            "{} is not an image",
            path.display()
        )));
    }

    let bytes = fs::read(path).await.map_err(|e| capture_error(path, e))?;
    if bytes.is_empty() {
        return Err(CaptureError::Unavailable(format!("{} is empty", path.display())));
    }

    // Stamped now, not with the file's mtime: a photo left in the inbox (or
    // rescanned from disk) is a new capture each time.
    let image = CapturedImage::new(bytes, mime);
    let quality = options.quality;
    tokio::task::spawn_blocking(move || apply_quality(image, quality))
        .await
        .map_err(|e| CaptureError::Unavailable(format!("encoding worker failed: {e}")))?
}

/// Always captures the same image file.
pub struct FileCaptureProvider {
    path: PathBuf,
}

impl FileCaptureProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureProvider for FileCaptureProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn capture(&self, options: &CaptureOptions) -> Result<CapturedImage, CaptureError> {
        check_options(options)?;
        let image = load_image(&self.path, options).await?;
        info!(path = %self.path.display(), bytes = image.len(), "Captured image from file");
        Ok(image)
    }
}

/// Hands out the newest photo from a camera (or gallery) drop folder.
pub struct InboxCaptureProvider {
    camera_dir: PathBuf,
    gallery_dir: Option<PathBuf>,
    /// Remove the file once captured so the next capture waits for a new photo.
    consume: bool,
}

impl InboxCaptureProvider {
    pub fn new(camera_dir: impl Into<PathBuf>) -> Self {
        Self {
            camera_dir: camera_dir.into(),
            gallery_dir: None,
            consume: false,
        }
    }

    pub fn with_gallery_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.gallery_dir = Some(dir.into());
        self
    }

    pub fn consuming(mut self, consume: bool) -> Self {
        self.consume = consume;
        self
    }

    fn dir_for(&self, source: CaptureSource) -> Result<&Path, CaptureError> {
        match source {
            CaptureSource::Camera => Ok(&self.camera_dir),
            CaptureSource::Gallery => self
                .gallery_dir
                .as_deref()
                .ok_or_else(|| CaptureError::Unavailable("no gallery configured".to_string())),
        }
    }
}

/// Newest image file in `dir`; ties on modification time go to the larger name.
async fn newest_image(dir: &Path) -> Result<Option<PathBuf>, CaptureError> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| capture_error(dir, e))?;
    let mut best: Option<(SystemTime, PathBuf)> = None;

    while let Some(entry) = entries.next_entry().await.map_err(|e| capture_error(dir, e))? {
        let path = entry.path();
        if !is_image(detect_mime_type(&path)) {
            continue;
        }
        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping unreadable inbox entry");
                continue;
            }
        };
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        let newer = match &best {
            None => true,
            Some((t, p)) => modified > *t || (modified == *t && path > *p),
        };
        if newer {
            best = Some((modified, path));
        }
    }

    Ok(best.map(|(_, path)| path))
}

#[async_trait]
impl CaptureProvider for InboxCaptureProvider {
    fn name(&self) -> &str {
        "inbox"
    }

    async fn capture(&self, options: &CaptureOptions) -> Result<CapturedImage, CaptureError> {
        check_options(options)?;
        let dir = self.dir_for(options.source)?;

        let Some(path) = newest_image(dir).await? else {
            return Err(CaptureError::Unavailable(format!(
                "no photo waiting in {}",
                dir.display()
            )));
        };
        debug!(path = %path.display(), "Selected inbox photo");

        let image = load_image(&path, options).await?;

        if self.consume {
            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to consume inbox photo");
            }
        }

        info!(
            path = %path.display(),
            bytes = image.len(),
            mime = %image.mime_type,
            "Captured image from inbox"
        );
        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::sample_png;
    use std::time::Duration;

    fn write_photo(dir: &Path, name: &str, age: Duration) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, sample_png()).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
        path
    }

    #[tokio::test]
    async fn picks_newest_photo() {
        let dir = tempfile::tempdir().unwrap();
        write_photo(dir.path(), "old.png", Duration::from_secs(60));
        let newest = write_photo(dir.path(), "new.png", Duration::from_secs(1));
        std::fs::write(dir.path().join("readme.txt"), "not a photo").unwrap();

        assert_eq!(newest_image(dir.path()).await.unwrap(), Some(newest));
    }

    #[tokio::test]
    async fn empty_inbox_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let provider = InboxCaptureProvider::new(dir.path());
        let err = provider.capture(&CaptureOptions::default()).await.unwrap_err();
        assert!(matches!(err, CaptureError::Unavailable(_)));
    }

    #[tokio::test]
    async fn consuming_inbox_removes_photo() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_photo(dir.path(), "label.png", Duration::from_secs(1));
        let provider = InboxCaptureProvider::new(dir.path()).consuming(true);

        let image = provider.capture(&CaptureOptions::default()).await.unwrap();
        assert_eq!(image.mime_type, "image/jpeg");
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn gallery_source_needs_gallery_dir() {
        let dir = tempfile::tempdir().unwrap();
        let provider = InboxCaptureProvider::new(dir.path());
        let options = CaptureOptions {
            source: CaptureSource::Gallery,
            ..Default::default()
        };
        assert!(matches!(
            provider.capture(&options).await,
            Err(CaptureError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn editing_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_photo(dir.path(), "label.png", Duration::from_secs(1));
        let options = CaptureOptions {
            allow_editing: true,
            ..Default::default()
        };
        let result = FileCaptureProvider::new(path).capture(&options).await;
        assert!(matches!(result, Err(CaptureError::Unavailable(_))));
    }

    #[tokio::test]
    async fn old_photo_is_stamped_at_capture_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_photo(dir.path(), "label.png", Duration::from_secs(86_400 * 365));
        let before = chrono::Utc::now();

        let first = FileCaptureProvider::new(&path)
            .capture(&CaptureOptions::default())
            .await
            .unwrap();
        let second = FileCaptureProvider::new(&path)
            .capture(&CaptureOptions::default())
            .await
            .unwrap();

        assert!(first.captured_at >= before);
        assert!(second.captured_at >= first.captured_at);
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let provider = FileCaptureProvider::new("/definitely/not/here.jpg");
        let result = provider.capture(&CaptureOptions::default()).await;
        assert!(matches!(result, Err(CaptureError::Unavailable(_))));
    }
}
