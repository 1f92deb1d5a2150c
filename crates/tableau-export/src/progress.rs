//! Progress reporting and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::warnings::ExportWarning;

/// Shared cancellation flag.
///
/// Cloning shares the flag. Once raised it stays raised; no new request is
/// issued after the next check.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Event emitted while an export runs.
///
/// A run emits `Started` once, one `ItemProcessed` per finished item,
/// `Warning`s as they occur, and `Finished` last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// The walk finished; `total` items will be fetched.
    Started { total: usize },
    /// One item's permissions were fetched and resolved.
    ItemProcessed {
        /// 1-based position.
        index: usize,
        total: usize,
        path: String,
        /// Grants resolved for the item.
        grants: usize,
    },
    /// A warning was recorded.
    Warning(ExportWarning),
    /// The run ended.
    Finished {
        items_processed: usize,
        cancelled: bool,
    },
}

/// Sending half of a progress channel.
pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Receiving half of a progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<ProgressEvent>;

/// Create a progress channel.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Optional progress sink. Sending never fails the run.
#[derive(Debug, Clone, Default)]
pub(crate) struct Progress(Option<ProgressSender>);

impl Progress {
    pub(crate) fn new(sender: Option<ProgressSender>) -> Self {
        Self(sender)
    }

    pub(crate) fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.0 {
            // A dropped receiver only means nobody is listening.
            let _ = sender.send(event);
        }
    }
}
