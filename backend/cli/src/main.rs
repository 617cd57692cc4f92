mod api;
mod config_cmd;
mod scan_cmd;
mod status_cmd;
mod terminal_output;
mod wiring;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use parcelscan_config::{
    apply_all_defaults, config_dir, config_file_path, load_and_prepare_with, load_config,
    resolve_relative, ScannerConfig, ServerConfig,
};
use parcelscan_logging::{init_logger, spawn_journal};

use api::AppState;

#[derive(Parser)]
#[command(name = "parcelscan")]
#[command(about = "Parcel label scanner: photograph a label, read its what3words address")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.parcelscan/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the scanner HTTP API
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to
        #[arg(long)]
        bind: Option<String>,
    },
    /// Capture and scan one label
    Scan {
        /// Scan this image instead of using the configured camera
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Print the scan record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the state of a running scanner
    Status {
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Check the config for errors
    Validate,
    /// Write a config file with all defaults
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(config_dir);

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => config_cmd::show(&config_path).await,
            ConfigAction::Validate => config_cmd::validate(&config_path).await,
            ConfigAction::Init { force } => config_cmd::init(&config_path, force).await,
        },
        Commands::Serve { port, bind } => {
            init_logging(&config_path, &base_dir).await?;
            let config = load_and_prepare_with(&config_path, |cfg| {
                let server = cfg.server.get_or_insert_with(ServerConfig::default);
                if port.is_some() {
                    server.port = port;
                }
                if bind.is_some() {
                    server.bind = bind;
                }
            })
            .await?;
            run_server(config, &base_dir).await
        }
        Commands::Scan { image, json } => {
            init_logging(&config_path, &base_dir).await?;
            let config = load_and_prepare_with(&config_path, |_| {}).await?;
            scan_cmd::run(&config, &base_dir, image.as_deref(), json).await
        }
        Commands::Status { port } => {
            let config = load_and_prepare_with(&config_path, |_| {}).await?;
            let server = config.server.unwrap_or_default();
            let host = match server.bind.as_deref() {
                None | Some("0.0.0.0") => "127.0.0.1".to_string(),
                Some(bind) => bind.to_string(),
            };
            let port = port
                .or(server.port)
                .unwrap_or(parcelscan_config::defaults::DEFAULT_PORT);
            status_cmd::run(&host, port).await
        }
    }
}

/// Logging has to start before the full config load so its warnings are
/// recorded, so only the logging section is read here.
async fn init_logging(config_path: &Path, base_dir: &Path) -> Result<()> {
    let raw = load_config(config_path).await.unwrap_or_default();
    let logging = apply_all_defaults(ScannerConfig {
        logging: raw.logging,
        ..Default::default()
    })
    .logging
    .unwrap_or_default();
    let dir = resolve_relative(base_dir, logging.dir.as_deref().unwrap_or("logs"));
    init_logger(&dir, logging.level.as_deref().unwrap_or("info"))
}

async fn run_server(config: ScannerConfig, base_dir: &Path) -> Result<()> {
    let runtime = wiring::build_runtime(&config, base_dir, None)?;
    let journal = spawn_journal(runtime.controller.subscribe());

    let app_state = Arc::new(AppState {
        controller: runtime.controller,
    });
    let app = api::build_router(app_state, runtime.asset_dir.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let server = config.server.clone().unwrap_or_default();
    let addr = format!(
        "{}:{}",
        server.bind.as_deref().unwrap_or("127.0.0.1"),
        server.port.unwrap_or(parcelscan_config::defaults::DEFAULT_PORT)
    );
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        addr = %addr,
        assets = ?runtime.asset_dir,
        "Parcel scanner API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    journal.abort();
    Ok(())
}
