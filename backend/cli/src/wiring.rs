//! Builds the scan controller and its collaborators from a prepared config.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use parcelscan_config::{resolve_relative, ScannerConfig};
use parcelscan_core::{AssetStore, CaptureProvider, CaptureSource, RecognitionService};
use parcelscan_media::{FileCaptureProvider, InboxCaptureProvider};
use parcelscan_storage::{HttpAssetStore, HttpStoreConfig, InMemoryAssetStore, LocalAssetStore};
use parcelscan_understanding::{MockRecognizer, VisionProvider, VisionRecognizer};
use parcelscan_workflow::{ScanController, WorkflowSettings};

/// Everything a command needs to run scans.
pub struct Runtime {
    pub controller: ScanController,
    /// Set when images are kept in a local directory that `serve` should expose.
    pub asset_dir: Option<PathBuf>,
}

pub fn workflow_settings(config: &ScannerConfig) -> WorkflowSettings {
    let mut settings = WorkflowSettings::default();
    if let Some(capture) = &config.capture {
        if let Some(quality) = capture.quality {
            settings.capture.quality = quality.min(100);
        }
        if let Some(allow_editing) = capture.allow_editing {
            settings.capture.allow_editing = allow_editing;
        }
        if capture.source.as_deref() == Some("gallery") {
            settings.capture.source = CaptureSource::Gallery;
        }
    }
    if let Some(workflow) = &config.workflow {
        if let Some(ms) = workflow.capture_timeout_ms {
            settings.capture_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = workflow.recognition_timeout_ms {
            settings.recognition_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = workflow.upload_timeout_ms {
            settings.upload_timeout = Duration::from_millis(ms);
        }
        if let Some(prefix) = &workflow.filename_prefix {
            settings.filename_prefix = prefix.clone();
        }
    }
    settings
}

/// `image_override` replaces the configured provider with a fixed file.
pub fn build_capture(
    config: &ScannerConfig,
    config_dir: &Path,
    image_override: Option<&Path>,
) -> Result<Arc<dyn CaptureProvider>> {
    if let Some(path) = image_override {
        return Ok(Arc::new(FileCaptureProvider::new(path)));
    }
    let capture = config.capture.clone().unwrap_or_default();
    match capture.provider.as_deref().unwrap_or("inbox") {
        "file" => {
            let file = capture
                .file
                .as_deref()
                .context("capture.file is required for the 'file' provider")?;
            Ok(Arc::new(FileCaptureProvider::new(resolve_relative(config_dir, file))))
        }
        "inbox" => {
            let camera_dir = resolve_relative(
                config_dir,
                capture.camera_dir.as_deref().unwrap_or("inbox"),
            );
            let mut provider =
                InboxCaptureProvider::new(camera_dir).consuming(capture.consume.unwrap_or(false));
            if let Some(gallery) = &capture.gallery_dir {
                provider = provider.with_gallery_dir(resolve_relative(config_dir, gallery));
            }
            Ok(Arc::new(provider))
        }
        other => bail!("unknown capture provider '{other}'"),
    }
}

pub fn build_recognizer(config: &ScannerConfig) -> Result<Arc<dyn RecognitionService>> {
    let recognition = config.recognition.clone().unwrap_or_default();
    let provider = match recognition.provider.as_deref().unwrap_or("mock") {
        "mock" => {
            let mock = recognition.mock.unwrap_or_default();
            let recognizer = match mock.seed {
                Some(seed) => MockRecognizer::seeded(seed),
                None => MockRecognizer::new(),
            };
            let mut recognizer = recognizer.with_failure_rate(mock.failure_rate.unwrap_or(0.0));
            if let Some(ms) = mock.delay_ms {
                recognizer = recognizer.with_delay(Duration::from_millis(ms));
            }
            return Ok(Arc::new(recognizer));
        }
        "openai" => VisionProvider::openai(api_key(&recognition.api_key)?),
        "gemini" => VisionProvider::gemini(api_key(&recognition.api_key)?),
        other => bail!("unknown recognition provider '{other}'"),
    };
    let provider = match &recognition.model {
        Some(model) => provider.with_model(model.clone()),
        None => provider,
    };
    let provider = match &recognition.base_url {
        Some(url) => provider.with_base_url(url.clone()),
        None => provider,
    };
    Ok(Arc::new(VisionRecognizer::new(provider)))
}

fn api_key(key: &Option<String>) -> Result<String> {
    match key.as_deref().map(str::trim) {
        Some(k) if !k.is_empty() => Ok(k.to_string()),
        _ => bail!("recognition.apiKey is required for vision providers"),
    }
}

/// Returns the store plus the directory to serve when the store is local.
pub fn build_store(
    config: &ScannerConfig,
    config_dir: &Path,
) -> Result<(Arc<dyn AssetStore>, Option<PathBuf>)> {
    let storage = config.storage.clone().unwrap_or_default();
    let base_url = storage.public_base_url.clone().unwrap_or_default();
    match storage.backend.as_deref().unwrap_or("local") {
        "local" => {
            let dir = resolve_relative(config_dir, storage.dir.as_deref().unwrap_or("assets"));
            Ok((Arc::new(LocalAssetStore::new(dir.clone(), base_url)), Some(dir)))
        }
        "memory" => Ok((Arc::new(InMemoryAssetStore::new(base_url)), None)),
        "http" => {
            let field = |value: Option<String>, name: &str| {
                value
                    .filter(|v| !v.trim().is_empty())
                    .with_context(|| format!("storage.{name} is required for the 'http' backend"))
            };
            let store = HttpAssetStore::new(HttpStoreConfig {
                endpoint: field(storage.endpoint, "endpoint")?,
                bucket: field(storage.bucket, "bucket")?,
                api_key: field(storage.api_key, "apiKey")?,
            });
            Ok((Arc::new(store), None))
        }
        other => bail!("unknown storage backend '{other}'"),
    }
}

pub fn build_runtime(
    config: &ScannerConfig,
    config_dir: &Path,
    image_override: Option<&Path>,
) -> Result<Runtime> {
    let capture = build_capture(config, config_dir, image_override)?;
    let recognizer = build_recognizer(config)?;
    let (store, asset_dir) = build_store(config, config_dir)?;
    info!(
        capture = capture.name(),
        recognizer = recognizer.name(),
        store = store.name(),
        "Scanner wired"
    );
    let controller = ScanController::new(capture, recognizer, store, workflow_settings(config));
    Ok(Runtime {
        controller,
        asset_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcelscan_config::{
        apply_all_defaults, CaptureConfig, RecognitionConfig, StorageConfig, WorkflowConfig,
    };

    #[test]
    fn settings_follow_config() {
        let mut cfg = ScannerConfig::default();
        cfg.capture = Some(CaptureConfig {
            quality: Some(60),
            source: Some("gallery".into()),
            ..Default::default()
        });
        cfg.workflow = Some(WorkflowConfig {
            recognition_timeout_ms: Some(1_500),
            filename_prefix: Some("label".into()),
            ..Default::default()
        });
        let settings = workflow_settings(&apply_all_defaults(cfg));
        assert_eq!(settings.capture.quality, 60);
        assert_eq!(settings.capture.source, CaptureSource::Gallery);
        assert_eq!(settings.recognition_timeout, Duration::from_millis(1_500));
        assert_eq!(settings.upload_timeout, Duration::from_secs(20));
        assert_eq!(settings.filename_prefix, "label");
    }

    #[test]
    fn default_config_wires_inbox_mock_and_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = apply_all_defaults(ScannerConfig::default());
        let capture = build_capture(&cfg, dir.path(), None).unwrap();
        let recognizer = build_recognizer(&cfg).unwrap();
        let (store, asset_dir) = build_store(&cfg, dir.path()).unwrap();
        assert_eq!(capture.name(), "inbox");
        assert_eq!(recognizer.name(), "mock");
        assert_eq!(store.name(), "local");
        assert_eq!(asset_dir, Some(dir.path().join("assets")));
    }

    #[test]
    fn image_override_wins() {
        let cfg = apply_all_defaults(ScannerConfig::default());
        let capture = build_capture(&cfg, Path::new("/tmp"), Some(Path::new("label.jpg"))).unwrap();
        assert_eq!(capture.name(), "file");
    }

    #[test]
    fn vision_without_key_fails() {
        let mut cfg = ScannerConfig::default();
        cfg.recognition = Some(RecognitionConfig {
            provider: Some("openai".into()),
            ..Default::default()
        });
        assert!(build_recognizer(&cfg).is_err());
    }

    #[test]
    fn http_store_needs_every_field() {
        let mut cfg = ScannerConfig::default();
        cfg.storage = Some(StorageConfig {
            backend: Some("http".into()),
            endpoint: Some("https://proj.supabase.co".into()),
            bucket: Some("scans".into()),
            ..Default::default()
        });
        let err = build_store(&cfg, Path::new("/tmp")).err().unwrap().to_string();
        assert!(err.contains("apiKey"));
    }
}
