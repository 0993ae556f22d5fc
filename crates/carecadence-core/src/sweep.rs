//! Periodic overdue sweep.
//!
//! [`ReminderEngine::sweep`] does the work of one tick. [`SweepTask`] runs it
//! on a Tokio interval with an explicit start/stop lifecycle:
//!
//! ```text
//! start() -> tick, tick, ... -> stop().await   (graceful)
//!                            -> drop            (aborted)
//! ```
//!
//! Ticks that come due while a previous tick is still running are skipped,
//! never queued up to overlap.

use std::time::Duration;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::clock::Clock;
use crate::engine::SharedEngine;
use crate::error::ConfigError;
use crate::notify::NotificationSink;

/// One occurrence the sweep could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub occurrence_id: String,
    pub error: String,
}

/// What a single sweep tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Local wall-clock time the tick ran at.
    pub ran_at: NaiveDateTime,
    /// Occurrences created by lazy generation during the tick.
    pub generated: usize,
    /// Occurrences transitioned to missed.
    pub missed: Vec<String>,
    /// Occurrences that received a "due soon" reminder.
    pub reminded: Vec<String>,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn new(ran_at: NaiveDateTime) -> Self {
        Self {
            ran_at,
            generated: 0,
            missed: Vec::new(),
            reminded: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn has_activity(&self) -> bool {
        self.generated > 0
            || !self.missed.is_empty()
            || !self.reminded.is_empty()
            || !self.failures.is_empty()
    }
}

/// Handle to a running periodic sweep.
///
/// Dropping the handle aborts the task, so a sweep never outlives the
/// context that started it.
#[derive(Debug)]
pub struct SweepTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<u64>>,
}

impl SweepTask {
    /// Spawn the sweep loop on the current Tokio runtime. The first tick
    /// runs immediately.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for a zero interval; nothing is spawned.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start<C, N>(engine: SharedEngine<C, N>, every: Duration) -> crate::Result<Self>
    where
        C: Clock + 'static,
        N: NotificationSink + 'static,
    {
        if every.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "sweep_interval_secs".to_string(),
                message: "must be at least 1".to_string(),
            }
            .into());
        }
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = 0u64;
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        ticks += 1;
                        if !run_tick(&engine) {
                            break;
                        }
                    }
                }
            }
            tracing::debug!(ticks, "sweep task stopped");
            ticks
        });
        tracing::debug!(interval_secs = every.as_secs(), "sweep task started");
        Ok(Self {
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Start with the interval from the engine's configuration, after
    /// validating it.
    pub fn from_config<C, N>(engine: SharedEngine<C, N>) -> crate::Result<Self>
    where
        C: Clock + 'static,
        N: NotificationSink + 'static,
    {
        let every = {
            let guard = engine.lock()?;
            guard.config().validate()?;
            guard.config().sweep_interval()
        };
        Self::start(engine, every)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to stop and wait for it. Returns the number of ticks
    /// that ran.
    pub async fn stop(mut self) -> u64 {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.take() {
            Some(handle) => handle.await.unwrap_or_default(),
            None => 0,
        }
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

// Returns false when the engine is unusable and the loop should end. The
// guard never lives across an await point.
fn run_tick<C: Clock, N: NotificationSink>(engine: &SharedEngine<C, N>) -> bool {
    match engine.lock() {
        Ok(mut guard) => {
            guard.sweep();
            true
        }
        Err(_) => {
            tracing::error!("engine lock poisoned, stopping sweep task");
            false
        }
    }
}
