//! Scan progress reporting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use strum::{Display, FromRepr};
use treescan_core::ScanStats;

/// Lifecycle of a scan.
///
/// `Seeding -> Running -> Draining -> Stopped`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, FromRepr)]
#[repr(u8)]
pub enum ScanPhase {
    /// Root paths are being pushed onto the frontier.
    Seeding,
    /// Workers and the aggregator are running.
    Running,
    /// Waiting for the frontier and then the completion channel to empty.
    Draining,
    /// All threads joined.
    Stopped,
}

/// Phase shared between the orchestrator and the aggregator.
#[derive(Debug)]
pub(crate) struct PhaseCell(AtomicU8);

impl PhaseCell {
    pub fn new(phase: ScanPhase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    pub fn get(&self) -> ScanPhase {
        ScanPhase::from_repr(self.0.load(Ordering::Acquire)).unwrap_or(ScanPhase::Stopped)
    }

    pub fn set(&self, phase: ScanPhase) {
        self.0.store(phase as u8, Ordering::Release);
    }
}

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Current lifecycle phase.
    pub phase: ScanPhase,
    /// Paths taken off the frontier so far.
    pub paths_visited: u64,
    /// Directories whose children were listed.
    pub dirs_expanded: u64,
    /// Entries merged into the registry.
    pub entries_merged: u64,
    /// Number of warnings recorded.
    pub warnings_count: u64,
    /// Most recently merged path.
    pub current_path: PathBuf,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            phase: ScanPhase::Seeding,
            paths_visited: 0,
            dirs_expanded: 0,
            entries_merged: 0,
            warnings_count: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Merge rate in entries per second.
    pub fn entries_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.entries_merged as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Whether this is the final report of a scan.
    pub fn is_final(&self) -> bool {
        self.phase == ScanPhase::Stopped
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters updated concurrently by workers.
#[derive(Debug, Default)]
pub(crate) struct ScanCounters {
    pub paths_visited: AtomicU64,
    pub paths_excluded: AtomicU64,
    pub paths_vanished: AtomicU64,
    pub metadata_errors: AtomicU64,
    pub dirs_expanded: AtomicU64,
    pub list_errors: AtomicU64,
    pub entries_rejected: AtomicU64,
    pub entries_emitted: AtomicU64,
}

impl ScanCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn to_stats(&self, workers: usize, high_water: u64, duration: Duration) -> ScanStats {
        ScanStats {
            paths_visited: self.paths_visited.load(Ordering::Relaxed),
            paths_excluded: self.paths_excluded.load(Ordering::Relaxed),
            paths_vanished: self.paths_vanished.load(Ordering::Relaxed),
            metadata_errors: self.metadata_errors.load(Ordering::Relaxed),
            dirs_expanded: self.dirs_expanded.load(Ordering::Relaxed),
            list_errors: self.list_errors.load(Ordering::Relaxed),
            entries_rejected: self.entries_rejected.load(Ordering::Relaxed),
            entries_emitted: self.entries_emitted.load(Ordering::Relaxed),
            completion_high_water: high_water,
            workers,
            duration,
        }
    }
}
