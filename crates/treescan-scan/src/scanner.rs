//! Scan orchestration.
//!
//! A scan moves through [`ScanPhase`]s:
//!
//! - `Seeding`: every root is pushed onto the frontier.
//! - `Running`: the aggregator and the worker pool start.
//! - `Draining`: wait until no frontier work is pending, stop the workers,
//!   then let the aggregator empty the completion channel.
//! - `Stopped`: every thread is joined and the registry is returned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tokio::sync::broadcast;
use treescan_core::{Entry, Registry, ScanConfig, ScanError};

use crate::aggregator::Aggregator;
use crate::completion::completion_channel;
use crate::expansion::ExpansionTracker;
use crate::frontier::Frontier;
use crate::logger::{ScanLogger, TracingLogger};
use crate::progress::{PhaseCell, ScanCounters, ScanPhase, ScanProgress};
use crate::worker::{EntryFilter, Worker, WorkerContext};

const AGGREGATOR_THREAD: &str = "treescan-aggregator";

/// Concurrent filesystem tree scanner.
pub struct TreeScanner {
    progress_tx: broadcast::Sender<ScanProgress>,
    logger: Arc<dyn ScanLogger>,
    filter: Option<EntryFilter>,
    cancel: Arc<AtomicBool>,
}

impl TreeScanner {
    /// Create a new scanner logging through `tracing`.
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            progress_tx,
            logger: Arc::new(TracingLogger),
            filter: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use a different logging sink.
    pub fn with_logger(mut self, logger: Arc<dyn ScanLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Only keep entries for which `filter` returns `true`.
    ///
    /// Rejected directories are still descended into.
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Entry) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Flag that abandons a running scan when raised.
    ///
    /// Raising it before [`TreeScanner::scan`] starts makes that scan return
    /// `Interrupted` right away. The flag is cleared when a scan returns.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Abandon the running scan.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    /// Scan every root in `config` and return the completed registry.
    ///
    /// Per-path failures are recorded as warnings on the registry. Only
    /// thread failures and cancellation fail the scan.
    pub fn scan(&self, config: &ScanConfig) -> Result<Registry, ScanError> {
        let result = self.run(config);
        self.cancel.store(false, Ordering::Release);
        result
    }

    fn run(&self, config: &ScanConfig) -> Result<Registry, ScanError> {
        config.validate()?;

        let started = Instant::now();
        let workers = config.worker_count();
        let poll = config.poll_interval();
        let phase = Arc::new(PhaseCell::new(ScanPhase::Seeding));

        self.logger.info(&format!(
            "scan start: {} root(s), {workers} worker(s)",
            config.roots.len()
        ));

        let frontier = Arc::new(Frontier::new());
        let (completion_tx, completion_rx) =
            completion_channel(config.effective_completion_capacity());
        let high_water = completion_rx.high_water_handle();
        let counters = Arc::new(ScanCounters::default());
        let stop_workers = Arc::new(AtomicBool::new(false));
        let stop_aggregator = Arc::new(AtomicBool::new(false));

        // Seeding
        for root in &config.roots {
            frontier.push(root.clone());
        }

        // Running
        self.enter(&phase, ScanPhase::Running);
        let aggregator = Aggregator {
            receiver: completion_rx,
            stop: Arc::clone(&stop_aggregator),
            logger: Arc::clone(&self.logger),
            counters: Arc::clone(&counters),
            phase: Arc::clone(&phase),
            progress_tx: self.progress_tx.clone(),
            started,
            poll,
        };
        let aggregator_handle = thread::Builder::new()
            .name(AGGREGATOR_THREAD.to_string())
            .spawn(move || aggregator.run())
            .map_err(|source| ScanError::ThreadSpawn {
                name: AGGREGATOR_THREAD.to_string(),
                source,
            })?;

        let ctx = WorkerContext {
            frontier: Arc::clone(&frontier),
            completion: completion_tx,
            expansion: Arc::new(ExpansionTracker::new()),
            exclude: Arc::new(config.exclusion_set()),
            follow_links: config.follow_links,
            filter: self.filter.clone(),
            logger: Arc::clone(&self.logger),
            counters: Arc::clone(&counters),
            stop: Arc::clone(&stop_workers),
            cancel: Arc::clone(&self.cancel),
            poll,
        };

        let mut handles: Vec<(String, JoinHandle<()>)> = Vec::with_capacity(workers);
        for id in 0..workers {
            let name = format!("treescan-worker-{id}");
            let worker = Worker::new(name.clone(), ctx.clone());
            match thread::Builder::new().name(name.clone()).spawn(move || worker.run()) {
                Ok(handle) => handles.push((name, handle)),
                Err(source) => {
                    self.logger
                        .error(&format!("failed to spawn {name}: {source}"));
                    self.cancel.store(true, Ordering::Release);
                    stop_workers.store(true, Ordering::Release);
                    drop(ctx);
                    let _ = join_all(handles);
                    stop_aggregator.store(true, Ordering::Release);
                    let _ = aggregator_handle.join();
                    self.enter(&phase, ScanPhase::Stopped);
                    return Err(ScanError::ThreadSpawn { name, source });
                }
            }
        }
        // Workers hold the only remaining senders from here on.
        drop(ctx);

        // Draining
        self.enter(&phase, ScanPhase::Draining);
        let drained = frontier.wait_idle(poll, || {
            self.cancel.load(Ordering::Acquire) || handles.iter().all(|(_, h)| h.is_finished())
        });
        stop_workers.store(true, Ordering::Release);
        let worker_result = join_all(handles);

        stop_aggregator.store(true, Ordering::Release);
        let aggregator_result = aggregator_handle
            .join()
            .map_err(|_| ScanError::WorkerPanicked {
                name: AGGREGATOR_THREAD.to_string(),
            });

        // Stopped
        self.enter(&phase, ScanPhase::Stopped);
        worker_result?;
        let mut registry = aggregator_result?;
        if !drained || self.cancel.load(Ordering::Acquire) {
            self.logger.info("scan interrupted");
            return Err(ScanError::Interrupted);
        }

        let stats = counters.to_stats(
            workers,
            high_water.load(Ordering::Relaxed),
            started.elapsed(),
        );
        self.logger.info(&format!(
            "scan complete: {} entries ({} dirs, {} files, {} links), {} warning(s) in {:.2}s",
            registry.len(),
            registry.directory_count(),
            registry.regular_file_count(),
            registry.symlink_count(),
            registry.warnings().len(),
            stats.duration.as_secs_f64(),
        ));

        let _ = self.progress_tx.send(ScanProgress {
            phase: ScanPhase::Stopped,
            paths_visited: stats.paths_visited,
            dirs_expanded: stats.dirs_expanded,
            entries_merged: registry.len() as u64,
            warnings_count: registry.warnings().len() as u64,
            current_path: Default::default(),
            elapsed: stats.duration,
        });

        registry.set_stats(stats);
        Ok(registry)
    }

    fn enter(&self, cell: &PhaseCell, phase: ScanPhase) {
        cell.set(phase);
        self.logger.debug(&format!("scan phase {phase}"));
    }
}

impl Default for TreeScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Join every worker, reporting the first one that panicked.
fn join_all(handles: Vec<(String, JoinHandle<()>)>) -> Result<(), ScanError> {
    let mut first_panic = None;
    for (name, handle) in handles {
        if handle.join().is_err() && first_panic.is_none() {
            first_panic = Some(name);
        }
    }
    match first_panic {
        Some(name) => Err(ScanError::WorkerPanicked { name }),
        None => Ok(()),
    }
}
