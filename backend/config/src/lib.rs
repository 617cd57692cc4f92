//! `parcelscan-config`: runtime configuration for the parcel scanner.
//!
//! Provides:
//! - Typed config schema (capture, recognition, storage, workflow, server, logging)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` and `${ENV_VAR:-default}` substitution
//! - Redaction for safe display
//! - Default values and validation

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, resolve_relative, write_config};
pub use redact::{collect_redacted_paths, redact, redact_url};
pub use schema::{
    CaptureConfig, LoggingConfig, MockRecognitionConfig, RecognitionConfig, ScannerConfig,
    ServerConfig, StorageConfig, WorkflowConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load a config file, substitute env vars, apply defaults, and validate.
///
/// Warnings are logged. Validation errors are logged and then returned as a
/// single error so the scanner never starts half-configured.
pub async fn load_and_prepare(path: &Path) -> Result<ScannerConfig> {
    load_and_prepare_with(path, |_| {}).await
}

/// Like [`load_and_prepare`], with `adjust` applied before defaults so
/// command line overrides (e.g. `--port`) feed into derived defaults.
pub async fn load_and_prepare_with<F>(path: &Path, adjust: F) -> Result<ScannerConfig>
where
    F: FnOnce(&mut ScannerConfig),
{
    let (config, report) = prepare(path, adjust).await?;
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("Invalid config at {}:\n  {}", path.display(), summary.join("\n  "));
    }

    Ok(config)
}

/// Load, substitute, adjust and default a config, returning the validation
/// report instead of acting on it. Used by `parcelscan config validate`.
pub async fn prepare<F>(path: &Path, adjust: F) -> Result<(ScannerConfig, ValidationReport)>
where
    F: FnOnce(&mut ScannerConfig),
{
    let raw_config = load_config(path).await?;

    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    let mut config: ScannerConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    adjust(&mut config);
    let config = apply_all_defaults(config);
    let report = validate(&config);
    Ok((config, report))
}
