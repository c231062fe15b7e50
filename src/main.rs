use clap::Parser;
use std::path::{Path, PathBuf};
use ubridge::Connector;
use ubridge_core::config::Config;

#[derive(Parser)]
#[command(name = "ubridge", about = "Forward Cisco Umbrella activity logs to an HTTP event collector")]
struct Cli {
    /// TOML config file; defaults to ~/.config/ubridge/config.toml when present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run a single fetch cycle and exit.
    #[arg(long)]
    once: bool,
    /// Log at debug level (same as DEBUG_MODE=true).
    #[arg(long)]
    debug: bool,
    /// Append logs to this file instead of stdout.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(cli.debug || config.logging.debug, cli.log_file.as_deref())?;
    config.validate()?;

    tracing::info!("starting Cisco Umbrella connector");
    let mut connector = Connector::new(&config)?;

    if cli.once {
        let report = connector.run_cycle(chrono::Utc::now()).await;
        tracing::info!(?report, "single cycle finished");
        return Ok(());
    }

    connector
        .run(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "could not listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;
    Ok(())
}

fn init_tracing(debug: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_filter = if debug {
        "info,ubridge=debug,ubridge_core=debug,ubridge_feeds=debug"
    } else {
        "info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_env_filter(filter)
                .init();
        }
        None => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    Ok(())
}
