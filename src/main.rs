use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use diagsrv::{Config, DiagServer};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Minimal diagnostic HTTP server: `/` echoes request metadata, `/payload`
/// generates synthetic JSON/NDJSON bodies for load testing.
#[derive(Parser, Debug)]
#[command(name = "diagsrv")]
#[command(about = "A minimal diagnostic HTTP server", long_about = None)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print version information about the server and exit
    #[arg(long)]
    version: bool,
}

/// Version banner: build identifier, compiler version and current date.
fn info_string() -> String {
    // The day-month order in the date is historical; operator scripts parse it.
    let date = chrono::Local::now().format("%Y-%d-%m");
    format!(
        "diagsrv git={} rustc={} date={}",
        env!("CARGO_PKG_VERSION"),
        env!("DIAGSRV_RUSTC_VERSION"),
        date
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", info_string());
        return Ok(());
    }

    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("diagsrv=info")),
        )
        .init();

    let config =
        Config::load(cli.config.as_deref()).wrap_err("Failed to load configuration")?;

    info!(
        port = config.port,
        tls = config.tls_enabled(),
        "Starting diagnostic server"
    );

    let server = DiagServer::new(config);
    server
        .run()
        .await
        .wrap_err("Failed to run diagnostic server")?;

    Ok(())
}
