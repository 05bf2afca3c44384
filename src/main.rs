//! Gateway control plane daemon.
//!
//! Watches a declarative model file and keeps the proxy engine's routing
//! configuration in sync with it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gateway_control::reload::Reloader;
use gateway_control::store::FileStore;
use gateway_control::EngineClient;

#[derive(Debug, Parser)]
#[command(name = "gateway-control", version, about = "Declarative gateway control plane")]
struct Args {
    /// Path to the gateway model file (YAML).
    #[arg(short, long, default_value = "gateway.yaml")]
    config: PathBuf,

    /// Poll interval for model changes.
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Admin address of the proxy engine.
    #[arg(long, default_value = "http://localhost:2019")]
    engine: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gateway_control=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        config = %args.config.display(),
        interval = ?args.interval,
        engine = %args.engine,
        "gateway-control starting"
    );

    let store = Arc::new(FileStore::new(&args.config));
    let engine = EngineClient::new(&args.engine)?;
    let handle = Reloader::new(store, engine, args.interval).start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    handle.stop().await;

    tracing::info!("shutdown complete");
    Ok(())
}
