//! Caller notification channels for an ingestion run.
//!
//! Sinks may be invoked from a different thread than the one that started the
//! fetch; implementations must be `Send + Sync` and reentrant, or marshal
//! events back to their own context (see [`ChannelSink`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use serde::Serialize;

/// One notification from a running fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum FetchEvent {
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    Completed {
        rows_written: usize,
        rows_skipped: usize,
        message: String,
    },
    Failed {
        message: String,
    },
}

/// The three notification channels exposed to a caller: incremental
/// progress, completion, and error.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, current: usize, total: usize, message: &str);
    fn completed(&self, rows_written: usize, rows_skipped: usize, message: &str);
    fn failed(&self, message: &str);
}

/// Sink that discards all notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&self, _current: usize, _total: usize, _message: &str) {}
    fn completed(&self, _rows_written: usize, _rows_skipped: usize, _message: &str) {}
    fn failed(&self, _message: &str) {}
}

/// Sink that forwards events onto an mpsc channel, letting a caller drain
/// notifications on its own thread. A disconnected receiver drops events
/// silently; notification delivery never fails a run.
pub struct ChannelSink {
    sender: Mutex<Sender<FetchEvent>>,
}

impl ChannelSink {
    pub fn new(sender: Sender<FetchEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }

    fn send(&self, event: FetchEvent) {
        let sender = self.sender.lock().expect("channel sink mutex poisoned");
        let _ = sender.send(event);
    }
}

impl ProgressSink for ChannelSink {
    fn progress(&self, current: usize, total: usize, message: &str) {
        self.send(FetchEvent::Progress {
            current,
            total,
            message: message.to_owned(),
        });
    }

    fn completed(&self, rows_written: usize, rows_skipped: usize, message: &str) {
        self.send(FetchEvent::Completed {
            rows_written,
            rows_skipped,
            message: message.to_owned(),
        });
    }

    fn failed(&self, message: &str) {
        self.send(FetchEvent::Failed {
            message: message.to_owned(),
        });
    }
}

/// Cooperative cancellation flag shared between a caller and a running fetch.
///
/// Observed between provider phases and between store batches; batches
/// committed before cancellation stay durable.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
