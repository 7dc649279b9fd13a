use crate::error::SchedulerError;
use crate::scanner::ScanEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Stopped,
    Running,
    Stopping,
}

struct SchedulerState {
    run: RunState,
    stop_tx: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

/// Periodic driver of full scan passes.
///
/// `start` runs one pass immediately, then one per interval. The interval is
/// measured from the end of the previous pass, so passes never overlap.
pub struct Scheduler {
    engine: Arc<ScanEngine>,
    state: Arc<Mutex<SchedulerState>>,
}

impl Scheduler {
    pub fn new(engine: Arc<ScanEngine>) -> Self {
        Self {
            engine,
            state: Arc::new(Mutex::new(SchedulerState {
                run: RunState::Stopped,
                stop_tx: None,
                handle: None,
            })),
        }
    }

    pub async fn state(&self) -> RunState {
        self.state.lock().await.run
    }

    pub async fn start(&self, interval: Duration) -> Result<(), SchedulerError> {
        let mut state = self.state.lock().await;
        if state.run != RunState::Stopped {
            return Err(SchedulerError::AlreadyRunning);
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.state);
        let handle = tokio::spawn(async move {
            run_loop(engine, interval, stop_rx).await;
            let mut state = shared.lock().await;
            state.run = RunState::Stopped;
            state.stop_tx = None;
            info!("Scanner stopped");
        });

        state.run = RunState::Running;
        state.stop_tx = Some(stop_tx);
        state.handle = Some(handle);
        info!("Scanner started, interval {:?}", interval);
        Ok(())
    }

    /// Signal the loop to stop and wait up to `deadline` for the in-flight pass.
    ///
    /// On `ForcedStop` the pass keeps running in the background; the state
    /// becomes `Stopped` once it drains. A loop task that panicked is reported
    /// as `LoopFailed`.
    pub async fn shutdown(&self, deadline: Duration) -> Result<(), SchedulerError> {
        let handle = {
            let mut state = self.state.lock().await;
            if state.run != RunState::Running {
                return Err(SchedulerError::NotRunning);
            }
            state.run = RunState::Stopping;
            if let Some(stop_tx) = &state.stop_tx {
                let _ = stop_tx.send(true);
            }
            state.handle.take()
        };
        info!("Stopping scanner, waiting up to {:?}", deadline);

        let Some(handle) = handle else {
            return Ok(());
        };
        match tokio::time::timeout(deadline, handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Scheduler loop ended abnormally: {}", e);
                let mut state = self.state.lock().await;
                state.run = RunState::Stopped;
                state.stop_tx = None;
                Err(SchedulerError::LoopFailed(e.to_string()))
            }
            Err(_) => {
                warn!(
                    "Scanner did not stop within {:?}, leaving the in-flight pass running",
                    deadline
                );
                Err(SchedulerError::ForcedStop(deadline))
            }
        }
    }
}

async fn run_loop(engine: Arc<ScanEngine>, interval: Duration, mut stop: watch::Receiver<bool>) {
    run_pass(&engine, &stop).await;
    loop {
        let stopping = *stop.borrow_and_update();
        if stopping {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                run_pass(&engine, &stop).await;
            }
            changed = stop.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Scheduler loop exited");
}

async fn run_pass(engine: &Arc<ScanEngine>, stop: &watch::Receiver<bool>) {
    let started = tokio::time::Instant::now();
    if let Some(summary) = engine.scan_all(stop).await {
        info!(
            "Scan pass finished in {:?}: {} cluster(s) scanned, {} failed; {} namespace(s) stored, {} failed, {} skipped",
            started.elapsed(),
            summary.clusters_scanned,
            summary.clusters_failed,
            summary.namespaces_stored,
            summary.namespaces_failed,
            summary.namespaces_skipped
        );
    }
}
