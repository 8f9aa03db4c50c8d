//! Cancellation signal for the blocking disciplines.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::errors::QueueError;

/// A cloneable flag polled by `enqueue_block` / `dequeue_block` once per
/// outer iteration of their wait loops. Cancellation is observed only
/// between iterations, never while an in-segment lock is held, so its
/// latency is bounded by the backoff cap.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    /// Trip the token. Every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// A token tripped by process-termination signals
    /// (SIGHUP, SIGINT, SIGQUIT, SIGTERM).
    pub fn on_termination() -> Result<CancelToken, QueueError> {
        let token = CancelToken::new();
        let mut signals =
            Signals::new([SIGHUP, SIGINT, SIGQUIT, SIGTERM]).map_err(QueueError::Signal)?;
        let flag = token.flag.clone();
        thread::spawn(move || {
            for _ in signals.forever() {
                flag.store(true, Ordering::SeqCst);
            }
        });
        Ok(token)
    }
}
