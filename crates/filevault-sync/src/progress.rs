//! Transfer progress and cancellation
//!
//! A [`ProgressReporter`] travels with every transfer. It forwards
//! [`SyncProgress`] events to an optional channel and carries the
//! [`CancellationToken`] that executors check between transfers.

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::SyncError;

/// One progress event, emitted after each completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncProgress {
    pub current_file: String,
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    sender: Option<mpsc::Sender<SyncProgress>>,
    cancel: CancellationToken,
}

impl ProgressReporter {
    pub fn new(sender: mpsc::Sender<SyncProgress>, cancel: CancellationToken) -> Self {
        Self {
            sender: Some(sender),
            cancel,
        }
    }

    /// A reporter with a fresh channel of `capacity` events
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SyncProgress>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, CancellationToken::new()), rx)
    }

    /// A reporter that drops every event
    pub fn silent(cancel: CancellationToken) -> Self {
        Self {
            sender: None,
            cancel,
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// # Errors
    /// Returns [`SyncError::Cancelled`] once the token has been cancelled
    pub fn check_cancelled(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Emits an event without waiting on a slow consumer
    pub fn report(&self, current_file: impl Into<String>, processed: usize, total: usize) {
        let Some(sender) = &self.sender else {
            return;
        };
        let event = SyncProgress {
            current_file: current_file.into(),
            processed,
            total,
        };
        if let Err(e) = sender.try_send(event) {
            debug!(error = %e, "progress event dropped");
        }
    }
}
