//! Config defaults: fills in every value the scanner needs at runtime.

use crate::schema::{
    CaptureConfig, LoggingConfig, MockRecognitionConfig, RecognitionConfig, ScannerConfig,
    ServerConfig, StorageConfig, WorkflowConfig,
};

pub const DEFAULT_CAPTURE_PROVIDER: &str = "inbox";
pub const DEFAULT_CAMERA_DIR: &str = "inbox";
pub const DEFAULT_QUALITY: u8 = 90;

pub const DEFAULT_RECOGNITION_PROVIDER: &str = "mock";
pub const DEFAULT_MOCK_DELAY_MS: u64 = 2_000;

pub const DEFAULT_STORAGE_BACKEND: &str = "local";
pub const DEFAULT_STORAGE_DIR: &str = "assets";
pub const DEFAULT_BUCKET: &str = "parcel-images";

pub const DEFAULT_CAPTURE_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_FILENAME_PREFIX: &str = "parcel";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8787;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

pub fn apply_all_defaults(config: ScannerConfig) -> ScannerConfig {
    let config = apply_capture_defaults(config);
    let config = apply_recognition_defaults(config);
    let config = apply_server_defaults(config);
    let config = apply_storage_defaults(config);
    let config = apply_workflow_defaults(config);
    apply_logging_defaults(config)
}

fn apply_capture_defaults(mut config: ScannerConfig) -> ScannerConfig {
    let capture = config.capture.get_or_insert_with(CaptureConfig::default);
    capture.provider.get_or_insert_with(|| DEFAULT_CAPTURE_PROVIDER.to_string());
    capture.camera_dir.get_or_insert_with(|| DEFAULT_CAMERA_DIR.to_string());
    capture.consume.get_or_insert(false);
    capture.quality.get_or_insert(DEFAULT_QUALITY);
    capture.allow_editing.get_or_insert(false);
    capture.source.get_or_insert_with(|| "camera".to_string());
    config
}

/// Only the mock gets tuning defaults; vision providers need an explicit key.
fn apply_recognition_defaults(mut config: ScannerConfig) -> ScannerConfig {
    let recognition = config.recognition.get_or_insert_with(RecognitionConfig::default);
    let is_mock = recognition
        .provider
        .get_or_insert_with(|| DEFAULT_RECOGNITION_PROVIDER.to_string())
        .as_str()
        == "mock";
    if is_mock {
        let mock = recognition.mock.get_or_insert_with(MockRecognitionConfig::default);
        mock.delay_ms.get_or_insert(DEFAULT_MOCK_DELAY_MS);
        mock.failure_rate.get_or_insert(0.0);
    }
    config
}

fn apply_server_defaults(mut config: ScannerConfig) -> ScannerConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    config
}

/// Runs after the server defaults: the local store's public URLs point at
/// the `/assets` route of `parcelscan serve`.
fn apply_storage_defaults(mut config: ScannerConfig) -> ScannerConfig {
    let (bind, port) = config
        .server
        .as_ref()
        .map(|s| {
            (
                s.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
                s.port.unwrap_or(DEFAULT_PORT),
            )
        })
        .unwrap_or_else(|| (DEFAULT_BIND.to_string(), DEFAULT_PORT));
    let host = if bind == "0.0.0.0" { "localhost".to_string() } else { bind };

    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    let backend = storage
        .backend
        .get_or_insert_with(|| DEFAULT_STORAGE_BACKEND.to_string())
        .clone();
    match backend.as_str() {
        "http" => {
            storage.bucket.get_or_insert_with(|| DEFAULT_BUCKET.to_string());
        }
        _ => {
            storage.dir.get_or_insert_with(|| DEFAULT_STORAGE_DIR.to_string());
            storage
                .public_base_url
                .get_or_insert_with(|| format!("http://{host}:{port}/assets"));
        }
    }
    config
}

fn apply_workflow_defaults(mut config: ScannerConfig) -> ScannerConfig {
    let workflow = config.workflow.get_or_insert_with(WorkflowConfig::default);
    workflow.capture_timeout_ms.get_or_insert(DEFAULT_CAPTURE_TIMEOUT_MS);
    workflow.recognition_timeout_ms.get_or_insert(DEFAULT_CALL_TIMEOUT_MS);
    workflow.upload_timeout_ms.get_or_insert(DEFAULT_CALL_TIMEOUT_MS);
    workflow
        .filename_prefix
        .get_or_insert_with(|| DEFAULT_FILENAME_PREFIX.to_string());
    config
}

fn apply_logging_defaults(mut config: ScannerConfig) -> ScannerConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_an_empty_config() {
        let cfg = apply_all_defaults(ScannerConfig::default());
        let capture = cfg.capture.unwrap();
        assert_eq!(capture.provider.as_deref(), Some("inbox"));
        assert_eq!(capture.quality, Some(DEFAULT_QUALITY));
        assert_eq!(cfg.recognition.unwrap().mock.unwrap().delay_ms, Some(DEFAULT_MOCK_DELAY_MS));
        let workflow = cfg.workflow.unwrap();
        assert_eq!(workflow.capture_timeout_ms, Some(30_000));
        assert_eq!(workflow.upload_timeout_ms, Some(20_000));
        assert_eq!(workflow.filename_prefix.as_deref(), Some("parcel"));
    }

    #[test]
    fn local_store_url_follows_server_port() {
        let mut cfg = ScannerConfig::default();
        cfg.server = Some(ServerConfig {
            bind: Some("0.0.0.0".into()),
            port: Some(9000),
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(
            cfg.storage.unwrap().public_base_url.as_deref(),
            Some("http://localhost:9000/assets")
        );
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = ScannerConfig::default();
        cfg.capture = Some(CaptureConfig {
            quality: Some(50),
            ..Default::default()
        });
        cfg.recognition = Some(RecognitionConfig {
            provider: Some("openai".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        assert_eq!(cfg.capture.unwrap().quality, Some(50));
        assert!(cfg.recognition.unwrap().mock.is_none());
    }

    #[test]
    fn http_store_gets_bucket_not_dir() {
        let mut cfg = ScannerConfig::default();
        cfg.storage = Some(StorageConfig {
            backend: Some("http".into()),
            ..Default::default()
        });
        let storage = apply_all_defaults(cfg).storage.unwrap();
        assert_eq!(storage.bucket.as_deref(), Some(DEFAULT_BUCKET));
        assert!(storage.dir.is_none());
    }
}
