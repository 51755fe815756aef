//! Bounded handoff from workers to the aggregator.
//!
//! The channel is bounded so that workers block when discovery outpaces
//! aggregation, instead of buffering without limit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender, bounded};
use thiserror::Error;
use treescan_core::{Entry, ScanWarning};

/// Item handed from a worker to the aggregator.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// An accepted entry to merge into the registry.
    Entry(Entry),
    /// A pruned branch worth reporting.
    Warning(ScanWarning),
}

/// Why a send did not complete.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The aggregator is gone.
    #[error("completion channel closed")]
    Closed,
    /// The caller asked to stop while the channel was full.
    #[error("send aborted")]
    Aborted,
}

/// Create a completion channel holding at most `capacity` events.
pub fn completion_channel(capacity: usize) -> (CompletionSender, CompletionReceiver) {
    let capacity = capacity.max(1);
    let (sender, receiver) = bounded(capacity);
    let high_water = Arc::new(AtomicU64::new(0));

    (
        CompletionSender {
            sender,
            high_water: Arc::clone(&high_water),
        },
        CompletionReceiver {
            receiver,
            capacity,
            high_water,
        },
    )
}

/// Producer half, cloned into every worker.
#[derive(Debug, Clone)]
pub struct CompletionSender {
    sender: Sender<ScanEvent>,
    high_water: Arc<AtomicU64>,
}

impl CompletionSender {
    /// Send an event, blocking while the channel is full.
    pub fn send(&self, event: ScanEvent) -> Result<(), SendError> {
        self.sender.send(event).map_err(|_| SendError::Closed)?;
        self.record_len();
        Ok(())
    }

    /// Send an event, blocking while the channel is full.
    ///
    /// Re-checks `abort` every `poll` while blocked and gives up once it
    /// returns `true`.
    pub fn send_until(
        &self,
        mut event: ScanEvent,
        poll: Duration,
        abort: impl Fn() -> bool,
    ) -> Result<(), SendError> {
        loop {
            match self.sender.send_timeout(event, poll) {
                Ok(()) => {
                    self.record_len();
                    return Ok(());
                }
                Err(SendTimeoutError::Timeout(returned)) => {
                    if abort() {
                        return Err(SendError::Aborted);
                    }
                    event = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => return Err(SendError::Closed),
            }
        }
    }

    fn record_len(&self) {
        self.high_water
            .fetch_max(self.sender.len() as u64, Ordering::Relaxed);
    }
}

/// Consumer half, owned by the aggregator.
#[derive(Debug)]
pub struct CompletionReceiver {
    receiver: Receiver<ScanEvent>,
    capacity: usize,
    high_water: Arc<AtomicU64>,
}

impl CompletionReceiver {
    /// Receive an event, waiting up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ScanEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Events currently waiting.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest queue length observed right after a send.
    pub fn high_water(&self) -> u64 {
        self.high_water.load(Ordering::Relaxed)
    }

    /// Shared handle to the high-water mark, readable after the receiver moves.
    pub(crate) fn high_water_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.high_water)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    const POLL: Duration = Duration::from_millis(5);

    fn event(name: &str) -> ScanEvent {
        ScanEvent::Entry(Entry::new(name))
    }

    #[test]
    fn test_capacity_floor() {
        let (_tx, rx) = completion_channel(0);
        assert_eq!(rx.capacity(), 1);
    }

    #[test]
    fn test_send_blocks_when_full() {
        let (tx, rx) = completion_channel(1);
        tx.send(event("a")).unwrap();

        // Full: a bounded send gives up only through the abort hook.
        let result = tx.send_until(event("b"), POLL, || true);
        assert_eq!(result, Err(SendError::Aborted));
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_closed_receiver() {
        let (tx, rx) = completion_channel(1);
        drop(rx);
        assert_eq!(tx.send(event("a")), Err(SendError::Closed));
    }

    #[test]
    fn test_backpressure_with_slow_consumer() {
        const EVENTS: usize = 20;
        let (tx, rx) = completion_channel(1);
        let sent = Arc::new(AtomicUsize::new(0));

        let producer = {
            let sent = Arc::clone(&sent);
            thread::spawn(move || {
                for i in 0..EVENTS {
                    tx.send(event(&format!("p{i}"))).unwrap();
                    sent.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let mut received = Vec::new();
        loop {
            // Never more than one event buffered, however far ahead the producer is.
            assert!(rx.len() <= 1);
            match rx.recv_timeout(Duration::from_millis(200)) {
                Ok(ScanEvent::Entry(entry)) => received.push(entry.path().to_path_buf()),
                Ok(ScanEvent::Warning(_)) => unreachable!(),
                Err(_) => break,
            }
            // The producer can be at most one buffered event ahead plus one in flight.
            assert!(sent.load(Ordering::SeqCst) <= received.len() + 2);
            thread::sleep(Duration::from_millis(2));
        }

        producer.join().unwrap();
        assert_eq!(received.len(), EVENTS);
        assert_eq!(received[0], PathBuf::from("p0"));
        assert!(rx.high_water() <= 1);
    }
}
