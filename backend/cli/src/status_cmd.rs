//! `parcelscan status`: ask a running `parcelscan serve` for its state.

use anyhow::{Context, Result};
use parcelscan_core::ScanSnapshot;

use crate::terminal_output::{note_warn, render_snapshot};

pub async fn run(host: &str, port: u16) -> Result<()> {
    let url = format!("http://{host}:{port}/api/state");
    let client = reqwest::Client::new();
    let response = match client.get(&url).send().await {
        Ok(response) => response,
        Err(_) => {
            note_warn(&format!("parcelscan is not running on {host}:{port}"));
            return Ok(());
        }
    };
    let snapshot: ScanSnapshot = response
        .error_for_status()
        .with_context(|| format!("GET {url} failed"))?
        .json()
        .await
        .context("Unexpected response from /api/state")?;

    println!("\nParcel scanner at {host}:{port}\n");
    print!("{}", render_snapshot(&snapshot));
    Ok(())
}
