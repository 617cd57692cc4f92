//! `parcelscan scan`: run one capture cycle and print the result.

use std::path::Path;

use anyhow::{anyhow, Result};

use parcelscan_config::ScannerConfig;
use parcelscan_logging::spawn_journal;

use crate::terminal_output::{note_error, note_info, note_success, note_warn, render_record};
use crate::wiring::build_runtime;

pub async fn run(
    config: &ScannerConfig,
    config_dir: &Path,
    image: Option<&Path>,
    json: bool,
) -> Result<()> {
    let runtime = build_runtime(config, config_dir, image)?;
    let controller = runtime.controller;
    let journal = spawn_journal(controller.subscribe());

    if !json {
        note_info("Scanning label...");
    }
    let outcome = controller.start_capture().await;

    // Closing the controller closes the event channel, which lets the
    // journal finish writing what it already received.
    drop(controller);
    let _ = journal.await;

    match outcome {
        Ok(record) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
                return Ok(());
            }
            note_success("Address found");
            print!("{}", render_record(&record));
            if !record.remote_stored {
                note_warn("Upload failed; the image was kept locally only.");
            }
            Ok(())
        }
        Err(e) => {
            note_error(&e.user_message());
            Err(anyhow!(e))
        }
    }
}
