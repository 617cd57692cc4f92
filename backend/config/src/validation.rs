//! Config validation: deep schema checks with user-friendly error messages.

use crate::schema::ScannerConfig;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &ScannerConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_capture(config, &mut report);
    validate_recognition(config, &mut report);
    validate_storage(config, &mut report);
    validate_workflow(config, &mut report);
    validate_server(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).map(str::is_empty).unwrap_or(true)
}

fn validate_capture(config: &ScannerConfig, report: &mut ValidationReport) {
    let Some(capture) = &config.capture else { return };
    match capture.provider.as_deref() {
        None | Some("inbox") => {
            if capture.source.as_deref() == Some("gallery") && is_blank(&capture.gallery_dir) {
                report.warn(
                    "capture.galleryDir",
                    "source is 'gallery' but no galleryDir is set; the camera inbox is used",
                );
            }
        }
        Some("file") => {
            if is_blank(&capture.file) {
                report.error("capture.file", "The 'file' capture provider needs a file path");
            }
        }
        Some(other) => report.error(
            "capture.provider",
            format!("Unknown capture provider '{other}'. Use 'inbox' or 'file'"),
        ),
    }
    if let Some(q) = capture.quality {
        if q > 100 {
            report.error("capture.quality", "quality must be between 0 and 100");
        } else if q < 30 {
            report.warn("capture.quality", format!("quality {q} may be too low to read labels"));
        }
    }
    if capture.allow_editing == Some(true) {
        report.warn(
            "capture.allowEditing",
            "No capture provider supports editing; every capture will fail",
        );
    }
    if let Some(source) = &capture.source {
        if !matches!(source.as_str(), "camera" | "gallery") {
            report.error(
                "capture.source",
                format!("Unknown capture source '{source}'. Use 'camera' or 'gallery'"),
            );
        }
    }
}

fn validate_recognition(config: &ScannerConfig, report: &mut ValidationReport) {
    let Some(recognition) = &config.recognition else { return };
    match recognition.provider.as_deref() {
        None | Some("mock") => {
            if let Some(rate) = recognition.mock.as_ref().and_then(|m| m.failure_rate) {
                if !(0.0..=1.0).contains(&rate) {
                    report.error(
                        "recognition.mock.failureRate",
                        "failureRate must be between 0.0 and 1.0",
                    );
                }
            }
        }
        Some("openai") | Some("gemini") => {
            if is_blank(&recognition.api_key) {
                report.error(
                    "recognition.apiKey",
                    "Vision providers need an apiKey (use ${OPENAI_API_KEY} style references)",
                );
            }
        }
        Some(other) => report.error(
            "recognition.provider",
            format!("Unknown recognition provider '{other}'. Use 'mock', 'openai', or 'gemini'"),
        ),
    }
}

fn validate_storage(config: &ScannerConfig, report: &mut ValidationReport) {
    let Some(storage) = &config.storage else { return };
    match storage.backend.as_deref() {
        None | Some("local") | Some("memory") => {}
        Some("http") => {
            for (field, value) in [
                ("endpoint", &storage.endpoint),
                ("bucket", &storage.bucket),
                ("apiKey", &storage.api_key),
            ] {
                if is_blank(value) {
                    report.error(
                        format!("storage.{field}"),
                        format!("The 'http' storage backend needs {field}"),
                    );
                }
            }
            if let Some(endpoint) = &storage.endpoint {
                if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                    report.error("storage.endpoint", "endpoint must be an http(s) URL");
                }
            }
        }
        Some(other) => report.error(
            "storage.backend",
            format!("Unknown storage backend '{other}'. Use 'local', 'http', or 'memory'"),
        ),
    }
    if storage.backend.as_deref() == Some("memory") {
        report.warn("storage.backend", "The memory store forgets every image on exit");
    }
}

fn validate_workflow(config: &ScannerConfig, report: &mut ValidationReport) {
    let Some(workflow) = &config.workflow else { return };
    for (field, value) in [
        ("captureTimeoutMs", workflow.capture_timeout_ms),
        ("recognitionTimeoutMs", workflow.recognition_timeout_ms),
        ("uploadTimeoutMs", workflow.upload_timeout_ms),
    ] {
        if value == Some(0) {
            report.error(format!("workflow.{field}"), format!("{field} must be > 0"));
        }
    }
    if let Some(prefix) = &workflow.filename_prefix {
        if prefix.trim().is_empty() {
            report.error("workflow.filenamePrefix", "filenamePrefix cannot be empty");
        } else if !prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            report.error(
                "workflow.filenamePrefix",
                "filenamePrefix may only contain letters, digits, '-' and '_'",
            );
        }
    }
}

fn validate_server(config: &ScannerConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if let Some(port) = server.port {
        if port == 0 {
            report.error("server.port", "port must be > 0");
        } else if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "server.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
}

fn validate_logging(config: &ScannerConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };
    if let Some(level) = &logging.level {
        if !matches!(
            level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            report.warn(
                "logging.level",
                format!("'{level}' is not a plain level; it is passed to the filter as-is"),
            );
        }
    }
}
