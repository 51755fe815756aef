//! The single registry writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tokio::sync::broadcast;
use treescan_core::Registry;

use crate::completion::{CompletionReceiver, ScanEvent};
use crate::logger::ScanLogger;
use crate::progress::{PhaseCell, ScanCounters, ScanProgress};

/// Publish progress after this many merged entries.
const PROGRESS_INTERVAL: u64 = 1000;

/// Drains the completion channel into a [`Registry`].
///
/// Owns the registry for the whole scan, so no other thread ever touches it.
pub(crate) struct Aggregator {
    pub receiver: CompletionReceiver,
    /// Raised once every worker has been joined.
    pub stop: Arc<AtomicBool>,
    pub logger: Arc<dyn ScanLogger>,
    pub counters: Arc<ScanCounters>,
    pub phase: Arc<PhaseCell>,
    pub progress_tx: broadcast::Sender<ScanProgress>,
    pub started: Instant,
    pub poll: Duration,
}

impl Aggregator {
    /// Run until stopped with an empty channel, or until every sender is gone.
    pub fn run(self) -> Registry {
        self.logger.debug("aggregator start");

        let mut registry = Registry::new();
        let mut merged: u64 = 0;
        let mut warnings: u64 = 0;

        loop {
            match self.receiver.recv_timeout(self.poll) {
                Ok(ScanEvent::Entry(entry)) => {
                    self.logger.debug(&format!("scan {}", entry.path().display()));
                    let path = entry.path().to_path_buf();
                    if registry.add(entry) {
                        merged += 1;
                        if merged % PROGRESS_INTERVAL == 0 {
                            self.publish(merged, warnings, path);
                        }
                    }
                }
                Ok(ScanEvent::Warning(warning)) => {
                    warnings += 1;
                    registry.add_warning(warning);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop.load(Ordering::Acquire) && self.receiver.is_empty() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.logger
            .debug(&format!("aggregator exit after {merged} entries"));
        registry
    }

    fn publish(&self, merged: u64, warnings: u64, current_path: std::path::PathBuf) {
        let _ = self.progress_tx.send(ScanProgress {
            phase: self.phase.get(),
            paths_visited: self.counters.paths_visited.load(Ordering::Relaxed),
            dirs_expanded: self.counters.dirs_expanded.load(Ordering::Relaxed),
            entries_merged: merged,
            warnings_count: warnings,
            current_path,
            elapsed: self.started.elapsed(),
        });
    }
}
