//! Shared, observable status of the automatic collection run.
//!
//! Backed by a `tokio::sync::watch` channel: the collector is the single
//! producer, HTTP handlers and other observers read snapshots or subscribe
//! for change notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kwdb_core::{AutoCollectStatus, RunState};
use tokio::sync::watch;

use crate::error::CollectError;

#[derive(Debug, Clone)]
pub struct StatusBoard {
    tx: Arc<watch::Sender<AutoCollectStatus>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AutoCollectStatus::default());
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn snapshot(&self) -> AutoCollectStatus {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AutoCollectStatus> {
        self.tx.subscribe()
    }

    /// Flags a new run as started unless one is already running.
    ///
    /// The check and the flag flip happen under the channel's write lock, so
    /// two concurrent callers can never both succeed.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::ConcurrentRunConflict`] if a run is active.
    pub fn try_begin(&self, target_count: u32, now: DateTime<Utc>) -> Result<(), CollectError> {
        let mut claimed = false;
        self.tx.send_if_modified(|status| {
            if status.is_running {
                return false;
            }
            *status = AutoCollectStatus::started(target_count, now);
            claimed = true;
            true
        });
        if claimed {
            Ok(())
        } else {
            Err(CollectError::ConcurrentRunConflict)
        }
    }

    /// Asks the running loop to stop after the current seed. Returns `false`
    /// if nothing is running.
    pub fn request_stop(&self) -> bool {
        let mut running = false;
        self.tx.send_if_modified(|status| {
            running = status.is_running;
            if !status.is_running || status.stop_requested {
                return false;
            }
            status.stop_requested = true;
            status.status_message = "stop requested; finishing current seed".to_string();
            true
        });
        running
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.tx.borrow().stop_requested
    }

    pub fn update(&self, f: impl FnOnce(&mut AutoCollectStatus)) {
        self.tx.send_modify(f);
    }

    pub fn finish(
        &self,
        state: RunState,
        message: impl Into<String>,
        error: Option<String>,
        now: DateTime<Utc>,
    ) {
        let message = message.into();
        self.tx
            .send_modify(|status| status.finish(state, message, error, now));
    }
}
