#![cfg(not(tarpaulin_include))]

use brz_report::app;
use brz_report::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// Serve the delivery report over HTTP
#[derive(Debug, Parser)]
#[command(name = "website", version)]
struct Args {
    /// Path to the TOML secrets file
    #[arg(short, long, default_value = "secrets.toml")]
    config: PathBuf,

    /// Address to bind, overriding `bind_addr` from the secrets file
    #[arg(short, long)]
    bind: Option<String>,

    /// Directory holding the sheet CSV exports, overriding `data_dir`
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

/// Main entry point for the report server
///
/// Loads the configuration once, failing before the server starts when the
/// secret or the agency value is missing, and then serves until stopped.
/// Logging goes through `env_logger` and defaults to `info`.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load(&args.config).map_err(|e| {
        log::error!("Cannot start without a valid configuration: {}", e);
        e
    })?;

    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    app::run(config).await
}
