mod classifier;
mod cli;
mod config;
mod error;
mod kubernetes;
mod registry;
mod report;
mod scanner;
mod scheduler;
mod store;
mod types;
mod utils;

use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use cli::{Cli, OutputFormat};
use config::ScannerConfig;
use error::SchedulerError;
use kubernetes::KubeconfigConnector;
use registry::FileRegistry;
use scanner::ScanEngine;
use scheduler::Scheduler;
use store::{ResultStore, ScanStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = ScannerConfig::resolve(&cli)?;

    // Logs go to stderr so --once output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let registry = FileRegistry::new(&config.clusters_file);
    info!("Using cluster registry {}", registry.path().display());

    let store: Arc<dyn ScanStore> = Arc::new(ResultStore::new());
    let engine = Arc::new(ScanEngine::new(
        Arc::new(registry),
        Arc::new(KubeconfigConnector),
        Arc::clone(&store),
        config.scan_settings()?,
    ));

    if cli.once {
        run_once_mode(engine, cli.output).await
    } else {
        run_daemon_mode(engine, &config).await
    }
}

async fn run_once_mode(engine: Arc<ScanEngine>, output: OutputFormat) -> anyhow::Result<()> {
    let (_stop_tx, stop_rx) = watch::channel(false);
    if engine.scan_all(&stop_rx).await.is_none() {
        anyhow::bail!("Scan pass aborted: cluster registry unavailable");
    }

    let store = engine.store();
    match output {
        OutputFormat::Json => println!("{}", report::render_json(store.as_ref())?),
        OutputFormat::Text => {
            let color = std::io::stdout().is_terminal();
            print!("{}", report::render_text(store.as_ref(), color));
        }
    }
    Ok(())
}

async fn run_daemon_mode(engine: Arc<ScanEngine>, config: &ScannerConfig) -> anyhow::Result<()> {
    let scheduler = Scheduler::new(engine);
    scheduler.start(config.scan_interval()).await?;

    tokio::signal::ctrl_c().await?;
    info!("Interrupt received, shutting down");

    match scheduler.shutdown(config.shutdown_timeout()).await {
        Ok(()) => Ok(()),
        Err(e @ SchedulerError::ForcedStop(_)) => {
            error!("{} (scheduler {:?})", e, scheduler.state().await);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}
