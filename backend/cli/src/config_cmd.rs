//! `parcelscan config`: inspect, check or create the config file.

use std::path::Path;

use anyhow::{bail, Context, Result};

use parcelscan_config::{
    apply_all_defaults, collect_redacted_paths, prepare, redact, write_config, ScannerConfig,
};

use crate::terminal_output::{note_error, note_info, note_success, note_warn};

/// Print the effective config with secrets masked.
pub async fn show(path: &Path) -> Result<()> {
    let (config, _) = prepare(path, |_| {}).await?;
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    let masked = collect_redacted_paths(&value);
    println!("# {}", path.display());
    print!("{}", serde_yaml::to_string(&redact(&value))?);
    if !masked.is_empty() {
        note_info(&format!("Masked: {}", masked.join(", ")));
    }
    Ok(())
}

pub async fn validate(path: &Path) -> Result<()> {
    let (_, report) = prepare(path, |_| {}).await?;
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    for error in &report.errors {
        note_error(&format!("{}: {}", error.path, error.message));
    }
    if !report.is_valid() {
        bail!("{} error(s) in {}", report.errors.len(), path.display());
    }
    note_success(&format!("{} is valid", path.display()));
    Ok(())
}

/// Write a config with every default spelled out.
pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = apply_all_defaults(ScannerConfig::default());
    write_config(&config, path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
