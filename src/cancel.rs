//! Pipeline-wide cancellation signal
//!
//! Raising the signal drops the only sender of a zero-capacity channel. From
//! then on every clone of the receiver is permanently ready, so each worker's
//! `select!` observes the signal independently; nobody has to pass it on.

use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use std::time::Duration;

/// Why the pipeline is shutting down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// The chunk source was exhausted; queued work is still drained
    EndOfStream,
    Timeout,
    /// SIGINT or SIGTERM, by signal number
    Interrupted(i32),
    SourceFailed(String),
}

impl CancelReason {
    /// Whether workers should finish the data units already queued.
    /// Those hold complete lines, so they are kept whenever the input ended.
    pub fn drains_queue(&self) -> bool {
        matches!(
            self,
            CancelReason::EndOfStream | CancelReason::SourceFailed(_)
        )
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::EndOfStream => f.write_str("end of stream"),
            CancelReason::Timeout => f.write_str("maximum run time reached"),
            CancelReason::Interrupted(sig) => write!(f, "interrupted by signal {}", sig),
            CancelReason::SourceFailed(msg) => write!(f, "input stream failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelState {
    Idle,
    Raised,
    /// Every worker has seen the signal
    Acknowledged,
    Stopped,
}

struct Inner {
    trigger: Mutex<Option<Sender<()>>>,
    watch: Receiver<()>,
    reason: OnceLock<CancelReason>,
    acknowledged: AtomicUsize,
    stopped: AtomicBool,
}

/// Cloneable handle to one pipeline's cancellation signal
#[derive(Clone)]
pub struct Cancellation {
    inner: Arc<Inner>,
}

impl Cancellation {
    pub fn new() -> Self {
        let (trigger, watch) = bounded(0);
        Self {
            inner: Arc::new(Inner {
                trigger: Mutex::new(Some(trigger)),
                watch,
                reason: OnceLock::new(),
                acknowledged: AtomicUsize::new(0),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Raise the signal. Only the first call has an effect; it returns `true`.
    pub fn raise(&self, reason: CancelReason) -> bool {
        let mut trigger = self
            .inner
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = trigger.take() else {
            return false;
        };
        // The reason must be visible before any receiver sees the disconnect
        let _ = self.inner.reason.set(reason.clone());
        drop(sender);
        drop(trigger);

        tracing::info!(%reason, "cancellation raised");
        true
    }

    /// Receiver that becomes ready (disconnected) once the signal is raised
    pub fn watch(&self) -> Receiver<()> {
        self.inner.watch.clone()
    }

    pub fn is_raised(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.inner.reason.get().cloned()
    }

    /// Called once by each worker as it leaves the pool
    pub fn acknowledge(&self) {
        self.inner.acknowledged.fetch_add(1, Ordering::SeqCst);
    }

    pub fn acknowledged(&self) -> usize {
        self.inner.acknowledged.load(Ordering::SeqCst)
    }

    pub fn mark_stopped(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
    }

    pub fn state(&self, workers: usize) -> CancelState {
        if self.inner.stopped.load(Ordering::SeqCst) {
            CancelState::Stopped
        } else if !self.is_raised() {
            CancelState::Idle
        } else if self.acknowledged() >= workers {
            CancelState::Acknowledged
        } else {
            CancelState::Raised
        }
    }

    /// Block until the signal is raised or `timeout` elapses.
    /// Returns `true` if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        select! {
            recv(self.inner.watch) -> _ => true,
            recv(crossbeam_channel::after(timeout)) -> _ => self.is_raised(),
        }
    }

    /// Raise [`CancelReason::Timeout`] after `max_run`, unless something else
    /// cancels the pipeline first.
    pub fn arm_timer(&self, max_run: Duration) -> thread::JoinHandle<()> {
        let cancel = self.clone();
        thread::spawn(move || {
            if !cancel.wait_timeout(max_run) {
                cancel.raise(CancelReason::Timeout);
            }
        })
    }
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellation")
            .field("reason", &self.reason())
            .field("acknowledged", &self.acknowledged())
            .finish()
    }
}
