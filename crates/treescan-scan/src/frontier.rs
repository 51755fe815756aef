//! Frontier of paths waiting to be inspected.
//!
//! The queue is unbounded and self-feeding: inspecting a directory pushes
//! its children back. An empty queue is therefore not the end of the work,
//! since a worker may be about to push more. Termination is detected with a
//! pending counter instead: it goes up on push and down only once the worker
//! that popped the path has finished with it (children included).

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, unbounded};

/// Unbounded work queue with a pending-work counter.
#[derive(Debug)]
pub struct Frontier {
    sender: Sender<PathBuf>,
    receiver: Receiver<PathBuf>,
    pending: Mutex<usize>,
    idle: Condvar,
    enqueued: AtomicU64,
}

impl Frontier {
    /// Create an empty frontier.
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            pending: Mutex::new(0),
            idle: Condvar::new(),
            enqueued: AtomicU64::new(0),
        }
    }

    /// Push a path. Counted as pending until [`Frontier::task_done`].
    pub fn push(&self, path: PathBuf) {
        *self.lock_pending() += 1;
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        // The receiver lives as long as self, so this cannot fail.
        let _ = self.sender.send(path);
    }

    /// Pop a path, waiting up to `timeout` for one to arrive.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<PathBuf> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Pop a path and tie its completion to the returned guard.
    pub fn pop_guarded(&self, timeout: Duration) -> Option<(PathBuf, PendingGuard<'_>)> {
        self.pop_timeout(timeout)
            .map(|path| (path, PendingGuard { frontier: self }))
    }

    /// Mark one previously popped path as fully handled.
    pub fn task_done(&self) {
        let mut pending = self.lock_pending();
        debug_assert!(*pending > 0, "task_done called more times than push");
        *pending = pending.saturating_sub(1);
        if *pending == 0 {
            self.idle.notify_all();
        }
    }

    /// Paths pushed but not yet marked done.
    pub fn pending(&self) -> usize {
        *self.lock_pending()
    }

    /// Paths waiting in the queue.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Total paths ever pushed.
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Block until no work is pending.
    ///
    /// Wakes every `poll` to evaluate `abort`; returns `false` if it asked
    /// to give up before the frontier drained.
    pub fn wait_idle(&self, poll: Duration, abort: impl Fn() -> bool) -> bool {
        let mut pending = self.lock_pending();
        while *pending > 0 {
            if abort() {
                return false;
            }
            pending = self
                .idle
                .wait_timeout(pending, poll)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        true
    }

    fn lock_pending(&self) -> MutexGuard<'_, usize> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Frontier {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks a popped path done when dropped, even if the worker panics.
#[derive(Debug)]
pub struct PendingGuard<'a> {
    frontier: &'a Frontier,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.frontier.task_done();
    }
}
