//! Background capture shared by every telemetry source.
//!
//! A [`Refresher`] owns the latest [`Capture`] behind a lock and a tokio task
//! that replaces it on a fixed interval. Readers never wait on the capture
//! itself, only on the lock.

use flightdeck_core::error::TelemetryError;
use flightdeck_core::snapshot::Snapshot;
use flightdeck_core::telemetry::WarningSet;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// One capture: the snapshot plus the warnings active at that instant.
#[derive(Debug, Clone)]
pub struct Capture {
    pub snapshot: Snapshot,
    pub warnings: WarningSet,
}

impl Capture {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            warnings: WarningSet::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: WarningSet) -> Self {
        self.warnings = warnings;
        self
    }
}

impl Default for Capture {
    fn default() -> Self {
        Self::new(Snapshot::empty())
    }
}

/// Produces captures for a [`Refresher`].
pub trait Sampler: Send + 'static {
    fn sample(&mut self) -> Result<Capture, TelemetryError>;
}

impl<F> Sampler for F
where
    F: FnMut() -> Result<Capture, TelemetryError> + Send + 'static,
{
    fn sample(&mut self) -> Result<Capture, TelemetryError> {
        self()
    }
}

pub struct Refresher {
    name: String,
    latest: Arc<RwLock<Capture>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Refresher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latest: Arc::new(RwLock::new(Capture::default())),
            task: Mutex::new(None),
        }
    }

    /// Take one capture immediately, then keep capturing every `interval`.
    ///
    /// The first capture runs inline so a failing sampler surfaces as a
    /// startup error. Later failures are logged and the previous capture
    /// stays current. Calling `start` again replaces the running task.
    pub fn start<S: Sampler>(&self, interval: Duration, mut sampler: S) -> Result<(), TelemetryError> {
        let first = sampler.sample()?;
        self.store(first);

        let latest = Arc::clone(&self.latest);
        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately and was already sampled above
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match sampler.sample() {
                    Ok(capture) => match latest.write() {
                        Ok(mut guard) => *guard = capture,
                        Err(poisoned) => *poisoned.into_inner() = capture,
                    },
                    Err(e) => warn!(source = %name, error = %e, "Telemetry capture failed"),
                }
            }
        });

        if let Some(previous) = self.swap_task(Some(handle)) {
            previous.abort();
        }
        debug!(source = %self.name, interval_ms = interval.as_millis() as u64, "Telemetry refresher started");
        Ok(())
    }

    /// The most recent capture.
    pub fn latest(&self) -> Capture {
        match self.latest.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        match self.task.lock() {
            Ok(guard) => guard.as_ref().is_some_and(|h| !h.is_finished()),
            Err(poisoned) => poisoned.into_inner().as_ref().is_some_and(|h| !h.is_finished()),
        }
    }

    /// Abort the background task. No-op when not running.
    pub fn stop(&self) {
        if let Some(handle) = self.swap_task(None) {
            handle.abort();
            debug!(source = %self.name, "Telemetry refresher stopped");
        }
    }

    fn store(&self, capture: Capture) {
        match self.latest.write() {
            Ok(mut guard) => *guard = capture,
            Err(poisoned) => *poisoned.into_inner() = capture,
        }
    }

    fn swap_task(&self, handle: Option<JoinHandle<()>>) -> Option<JoinHandle<()>> {
        match self.task.lock() {
            Ok(mut guard) => std::mem::replace(&mut *guard, handle),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), handle),
        }
    }
}

impl Drop for Refresher {
    fn drop(&mut self) {
        self.stop();
    }
}
