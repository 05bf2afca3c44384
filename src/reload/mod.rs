//! Periodic model reload and push loop.
//!
//! # Data Flow
//! ```text
//! Loader (model source, e.g. store::file)
//!     → compiler::compile
//!     → EngineClient (POST to the engine admin endpoint)
//! ```
//!
//! # Design Decisions
//! - One task owns the loop; the compiler holds no shared state, so no
//!   locks are needed
//! - A failed tick is logged and skipped without advancing `last_synced`,
//!   so the next tick retries from the same baseline
//! - "Not modified" is a normal skip signal, never logged as a failure
//! - Shutdown is cooperative: the stop signal is observed at the top of
//!   the select, and `stop()` waits for the loop to fully exit

pub mod engine;

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::compiler::{compile, CompileError};
use crate::model::Data;

pub use engine::{EngineClient, PushError};

/// Source of the declarative model.
///
/// Implementations should follow the If-Modified-Since style: given the
/// time of the last successful sync, return `LoadError::NotModified` when
/// there is nothing new to compile.
pub trait Loader: Send + Sync {
    fn load(&self, since: Option<SystemTime>) -> Result<Data, LoadError>;
}

#[derive(Debug, Error)]
pub enum LoadError {
    /// The model has not changed since the given time; not a failure.
    #[error("data not modified")]
    NotModified,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] serde_yaml::Error),
}

/// Everything that can go wrong in one reload tick.
#[derive(Debug, Error)]
enum TickError {
    #[error("load: {0}")]
    Load(#[from] LoadError),

    #[error("compile: {0}")]
    Compile(#[from] CompileError),

    #[error("push: {0}")]
    Push(#[from] PushError),
}

/// Polls the loader on a fixed interval and pushes freshly compiled
/// documents to the proxy engine.
pub struct Reloader {
    loader: Arc<dyn Loader>,
    engine: EngineClient,
    interval: Duration,
}

/// Handle to a running reload loop.
pub struct ReloaderHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReloaderHandle {
    /// Signals the loop to stop and waits for it to fully exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

impl Reloader {
    pub fn new(loader: Arc<dyn Loader>, engine: EngineClient, interval: Duration) -> Self {
        Self {
            loader,
            engine,
            interval,
        }
    }

    /// Starts the loop on the runtime and returns a stop handle.
    pub fn start(self) -> ReloaderHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(stop_rx));
        ReloaderHandle { stop_tx, task }
    }

    async fn run(self, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first interval tick fires immediately; skip it so the first
        // poll happens one full interval after startup.
        ticker.tick().await;

        let mut last_synced: Option<SystemTime> = None;

        loop {
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = ticker.tick() => {
                    match self.tick(last_synced).await {
                        Ok(Some(synced)) => last_synced = Some(synced),
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "reload tick failed"),
                    }
                }
            }
        }

        tracing::info!("reloader stopped");
    }

    /// Runs one load-compile-push cycle. Returns the new sync time, or
    /// `None` when the model was not modified.
    async fn tick(&self, since: Option<SystemTime>) -> Result<Option<SystemTime>, TickError> {
        let data = match self.loader.load(since) {
            Ok(data) => data,
            Err(LoadError::NotModified) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let document = compile(&data)?;

        if let Err(e) = self.engine.load(&document).await {
            // Keep the rejected document around for diagnosis.
            tracing::debug!(document = %document, "engine rejected document");
            return Err(e.into());
        }

        tracing::info!("engine configuration reloaded");
        Ok(Some(SystemTime::now()))
    }
}
