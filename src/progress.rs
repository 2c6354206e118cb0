//! Progress events and cooperative cancellation for long runs

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use log::info;
use serde::Serialize;

/// Emitted after each (frame, grain) unit completes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Frame index of the unit
    pub frame: usize,
    /// 1-based grain id of the unit
    pub grain: usize,
    /// Units finished so far
    pub completed: usize,
    /// Units in the run
    pub total: usize,
    /// completed / total
    pub fraction: f64,
}

type Callback = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Callback and cancellation flag handed to the aggregation driver.
///
/// Parallel runs call the callback from worker threads, one event at a
/// time, as units finish.
#[derive(Default)]
pub struct ProgressHandle {
    callback: Option<Callback>,
    cancelled: Arc<AtomicBool>,
    /// Message of a logging handle
    label: Option<String>,
    started: Mutex<Option<Instant>>,
    last_percent: AtomicU32,
}

impl ProgressHandle {
    /// Handle without a callback
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle calling `f` after every unit
    pub fn with_callback<F>(f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Box::new(f)),
            ..Self::default()
        }
    }

    /// Handle logging at info level: `Starting {message}` when a run
    /// begins, every whole percent, then `Finished {message}` or
    /// `Cancelled {message}` with the elapsed time when it ends
    pub fn logging(message: &str) -> Self {
        Self {
            label: Some(message.to_string()),
            ..Self::default()
        }
    }

    /// Use an externally owned cancellation flag
    pub fn with_cancel_token(mut self, token: Arc<AtomicBool>) -> Self {
        self.cancelled = token;
        self
    }

    /// Shared flag, setting it to true cancels the run between units
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn started(&self) -> MutexGuard<'_, Option<Instant>> {
        self.started.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Called by the driver before the first unit
    pub(crate) fn begin(&self) {
        self.last_percent.store(0, Ordering::Relaxed);
        *self.started() = Some(Instant::now());
        if let Some(label) = &self.label {
            info!("Starting {label}..");
        }
    }

    pub(crate) fn report(&self, event: &ProgressEvent) {
        if let Some(label) = &self.label {
            let percent = (event.fraction * 100.0).floor() as u32;
            if percent > self.last_percent.load(Ordering::Relaxed) {
                self.last_percent.store(percent, Ordering::Relaxed);
                info!("{label} {percent} %");
            }
        }
        if let Some(callback) = &self.callback {
            callback(event);
        }
    }

    /// Called by the driver once the run stops, cancelled or not
    pub(crate) fn finish(&self, completed: usize, total: usize, cancelled: bool) {
        let Some(label) = &self.label else {
            return;
        };
        let elapsed = self.started().take().map(|t| t.elapsed()).unwrap_or_default();
        if cancelled {
            info!("Cancelled {label} after {completed} of {total} units ({elapsed:.1?})");
        } else {
            info!("Finished {label} ({elapsed:.1?})");
        }
    }
}

impl fmt::Debug for ProgressHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressHandle")
            .field("callback", &self.callback.is_some())
            .field("cancelled", &self.is_cancelled())
            .field("label", &self.label)
            .finish()
    }
}
