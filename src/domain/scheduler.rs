//! Periodic evaluation scheduler.
//!
//! A dedicated worker thread runs one engine cycle per interval. The main
//! thread talks to it over an `mpsc` channel; `recv_timeout` doubles as the
//! tick clock. Stopping sends a command and joins the thread, so an
//! in-flight tick always finishes before shutdown returns — ledger
//! mutations are never left half-committed.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

use super::engine::{CycleReport, StrategyDecisionEngine};

enum SchedulerCommand {
    Stop,
}

pub struct TickScheduler {
    tx: Sender<SchedulerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Spawn the worker. `on_cycle` receives every report; pass a no-op
    /// closure when only the ledger side effects matter.
    pub fn start<F>(
        engine: Arc<StrategyDecisionEngine>,
        interval: Duration,
        mut on_cycle: F,
    ) -> Self
    where
        F: FnMut(CycleReport) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            info!(interval_secs = interval.as_secs(), "scheduler started");
            loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let report = engine.run_cycle();
                        on_cycle(report);
                    }
                    Ok(SchedulerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => {
                        debug!("scheduler stopping");
                        break;
                    }
                }
            }
        });

        Self {
            tx,
            handle: Some(handle),
        }
    }

    /// Stop and drain: any tick already running completes first.
    pub fn stop(mut self) {
        let _ = self.tx.send(SchedulerCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        info!("scheduler stopped");
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        let _ = self.tx.send(SchedulerCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
