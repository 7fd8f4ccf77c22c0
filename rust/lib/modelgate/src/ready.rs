//! Readiness barrier over a fixed number of upstream async dependencies.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

/// Counts outstanding dependencies down to zero and fires exactly once.
///
/// The counter never goes below zero: extra completions are ignored and
/// report `false`.
pub struct ReadyBarrier {
    pending: AtomicUsize,
    ready: watch::Sender<bool>,
}

impl ReadyBarrier {
    pub fn new(pending: usize) -> Self {
        let (ready, _) = watch::channel(pending == 0);
        Self {
            pending: AtomicUsize::new(pending),
            ready,
        }
    }

    /// Mark one dependency done. Returns `true` only for the completion
    /// that made the barrier ready.
    pub fn complete_one(&self) -> bool {
        let prev = self
            .pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => {
                self.ready.send_replace(true);
                true
            }
            _ => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolve once the counter has reached zero.
    pub async fn wait(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
