//! Scan Controller (sctrk-sc) - Main entry point
//!
//! Loads configuration, wires the collaborators into the scan engine and
//! serves the HTTP control surface until Ctrl+C, SIGTERM or an API
//! shutdown request.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use sctrk_common::config::{resolve_config_path, CONFIG_ENV_VAR};
use sctrk_sc::api::{self, AppContext};
use sctrk_sc::bridges::http_ledger::HttpLedger;
use sctrk_sc::bridges::sim::{LogPresenter, Scene, SimCamera, SimDecoder, SimLedger, SoftTrigger};
use sctrk_sc::bridges::{LedgerCommit, LedgerLookup, TriggerInput};
use sctrk_sc::config::ControllerConfig;
use sctrk_sc::{EngineBridges, ScanEngine};
use std::time::Duration;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for sctrk-sc
#[derive(Parser, Debug)]
#[command(name = "sctrk-sc")]
#[command(about = "Batch scan controller for SCTRK")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "SCTRK_PORT")]
    port: Option<u16>,

    /// Run with the simulated camera, decoder, trigger and presenter
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), CONFIG_ENV_VAR);
    let mut config =
        ControllerConfig::load(config_path.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }

    init_tracing(&config)?;

    info!("Starting SCTRK scan controller v{}", env!("CARGO_PKG_VERSION"));
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: built-in defaults"),
    }

    if !args.simulate {
        // Camera, decoder and GPIO adapters are supplied by the deployment
        bail!("No hardware bridges are available in this build; run with --simulate");
    }

    let (lookup, commit) = ledger_bridges(&config)?;

    let scene = Arc::new(Scene::new());
    let soft_trigger = Arc::new(SoftTrigger::new());
    let bridges = EngineBridges {
        camera: Arc::new(SimCamera::new(
            config.camera.width,
            config.camera.height,
            Duration::from_millis(config.camera.frame_interval_ms),
        )),
        decoder: Arc::new(SimDecoder::new(Arc::clone(&scene))),
        lookup,
        commit,
        presenter: Arc::new(LogPresenter),
        trigger: Some(soft_trigger.clone() as Arc<dyn TriggerInput>),
    };

    let engine = Arc::new(ScanEngine::start(&config, bridges).context("Failed to start scan engine")?);
    info!("Press the button (POST /api/v1/sim/button) to start scanning");

    let shutdown = Arc::new(Notify::new());
    let ctx = AppContext {
        engine: Arc::clone(&engine),
        scene: Some(scene),
        soft_trigger: Some(soft_trigger),
        shutdown: Arc::clone(&shutdown),
    };

    let ip: std::net::IpAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_address))?;
    let addr = SocketAddr::new(ip, config.server.port);

    api::run(ctx, addr, shutdown_signal(shutdown))
        .await
        .context("HTTP server failed")?;

    engine.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// Gateway client when a URL is configured, in-memory ledger otherwise
fn ledger_bridges(config: &ControllerConfig) -> Result<(Arc<dyn LedgerLookup>, Arc<dyn LedgerCommit>)> {
    match &config.ledger.gateway_url {
        Some(url) => {
            info!("Ledger gateway: {}", url);
            let ledger = Arc::new(
                HttpLedger::new(url, config.ledger.timeout()).context("Failed to create ledger client")?,
            );
            Ok((ledger.clone() as Arc<dyn LedgerLookup>, ledger as Arc<dyn LedgerCommit>))
        }
        None => {
            warn!(
                "No ledger gateway configured, using in-memory ledger (batch size {})",
                config.ledger.sim_batch_size
            );
            let ledger = Arc::new(SimLedger::new(config.ledger.sim_batch_size));
            Ok((ledger.clone() as Arc<dyn LedgerLookup>, ledger as Arc<dyn LedgerCommit>))
        }
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. A configured log file gets a
/// second, colourless fmt layer.
fn init_tracing(config: &ControllerConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .context("Invalid log level")?;

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal(api_shutdown: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
        _ = api_shutdown.notified() => info!("Shutdown requested, shutting down"),
    }
}
