//! Scan worker threads.
//!
//! Every worker runs the same loop: pop a path, prune it or stat it, list
//! it if it is a directory this worker managed to claim, build an entry,
//! run the accept predicate, and hand the entry to the aggregator.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use treescan_core::{Entry, ScanError, ScanWarning, relative_to_cwd};

use crate::completion::{CompletionSender, ScanEvent, SendError};
use crate::expansion::ExpansionTracker;
use crate::frontier::Frontier;
use crate::logger::ScanLogger;
use crate::progress::ScanCounters;

/// Caller-supplied accept predicate.
///
/// Must be a pure function of the entry's observable state.
pub type EntryFilter = Arc<dyn Fn(&Entry) -> bool + Send + Sync>;

/// Everything a worker shares with the rest of the scan.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub frontier: Arc<Frontier>,
    pub completion: CompletionSender,
    pub expansion: Arc<ExpansionTracker>,
    pub exclude: Arc<HashSet<PathBuf>>,
    pub follow_links: bool,
    pub filter: Option<EntryFilter>,
    pub logger: Arc<dyn ScanLogger>,
    pub counters: Arc<ScanCounters>,
    /// Raised once the frontier has drained; idle workers exit.
    pub stop: Arc<AtomicBool>,
    /// Raised to abandon the scan without draining.
    pub cancel: Arc<AtomicBool>,
    pub poll: Duration,
}

/// One scan worker.
pub(crate) struct Worker {
    name: String,
    ctx: WorkerContext,
}

impl Worker {
    pub fn new(name: String, ctx: WorkerContext) -> Self {
        Self { name, ctx }
    }

    /// Run until stopped or cancelled.
    pub fn run(self) {
        let ctx = &self.ctx;
        ctx.logger.debug(&format!("worker {} start", self.name));

        let mut handled: u64 = 0;
        while !ctx.cancel.load(Ordering::Acquire) {
            let Some((path, _done)) = ctx.frontier.pop_guarded(ctx.poll) else {
                if ctx.stop.load(Ordering::Acquire) && ctx.frontier.is_empty() {
                    break;
                }
                continue;
            };

            handled += 1;
            if let Err(e) = self.visit(&path) {
                if e == SendError::Closed {
                    ctx.logger
                        .error(&format!("worker {}: aggregator is gone, exiting", self.name));
                }
                break;
            }
        }

        ctx.logger
            .debug(&format!("worker {} exit after {handled} paths", self.name));
    }

    /// Inspect one path. Fails only when the aggregator can't be reached.
    fn visit(&self, raw: &Path) -> Result<(), SendError> {
        let ctx = &self.ctx;
        ScanCounters::bump(&ctx.counters.paths_visited);

        let path = relative_to_cwd(raw);
        if ctx.exclude.contains(&path) {
            ctx.logger.debug(&format!("scan filter {}", path.display()));
            ScanCounters::bump(&ctx.counters.paths_excluded);
            return Ok(());
        }

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => return self.prune(&path, e),
        };

        if metadata.is_dir() {
            self.maybe_expand(&path)?;
        }

        let entry = Entry::new(&path);
        if let Some(filter) = &ctx.filter {
            if !filter(&entry) {
                ctx.logger.debug(&format!("scan reject {}", path.display()));
                ScanCounters::bump(&ctx.counters.entries_rejected);
                return Ok(());
            }
        }

        ScanCounters::bump(&ctx.counters.entries_emitted);
        self.emit(ScanEvent::Entry(entry))
    }

    /// Discard a path that can no longer be stat'ed.
    fn prune(&self, path: &Path, error: std::io::Error) -> Result<(), SendError> {
        let ctx = &self.ctx;

        let warning = if error.kind() == ErrorKind::NotFound {
            ScanCounters::bump(&ctx.counters.paths_vanished);
            match std::fs::symlink_metadata(path) {
                Ok(m) if m.file_type().is_symlink() => ScanWarning::broken_symlink(path),
                _ => ScanWarning::vanished(path),
            }
        } else {
            ScanCounters::bump(&ctx.counters.metadata_errors);
            ScanWarning::metadata_error(path, &ScanError::io(path, error))
        };

        ctx.logger.debug(&format!("scan prune {}", warning.message));
        self.emit(ScanEvent::Warning(warning))
    }

    /// List a directory's children onto the frontier if this worker wins
    /// the claim and link rules allow it.
    fn maybe_expand(&self, dir: &Path) -> Result<(), SendError> {
        let ctx = &self.ctx;
        let via_link = std::fs::symlink_metadata(dir)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);

        if via_link {
            if !ctx.follow_links {
                ctx.logger
                    .debug(&format!("scan link {} (not followed)", dir.display()));
                return Ok(());
            }
            if let Some(target) = link_loop_target(dir) {
                let warning = ScanWarning::link_loop(dir, target);
                ctx.logger.warn(&warning.message);
                return self.emit(ScanEvent::Warning(warning));
            }
        }

        if !ctx.expansion.claim(dir) {
            return Ok(());
        }

        let read_dir = match std::fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) => {
                ScanCounters::bump(&ctx.counters.list_errors);
                let warning = ScanWarning::read_error(dir, &e);
                ctx.logger
                    .warn(&format!("cannot list {}: {e}", dir.display()));
                return self.emit(ScanEvent::Warning(warning));
            }
        };

        ScanCounters::bump(&ctx.counters.dirs_expanded);
        for child in read_dir {
            match child {
                Ok(child) => ctx.frontier.push(dir.join(child.file_name())),
                Err(e) => {
                    let warning = ScanWarning::read_error(dir, &e);
                    ctx.logger
                        .warn(&format!("error reading {}: {e}", dir.display()));
                    self.emit(ScanEvent::Warning(warning))?;
                }
            }
        }
        Ok(())
    }

    fn emit(&self, event: ScanEvent) -> Result<(), SendError> {
        let cancel = &self.ctx.cancel;
        self.ctx
            .completion
            .send_until(event, self.ctx.poll, || cancel.load(Ordering::Acquire))
    }
}

/// If the linked directory `path` resolves to one of its own ancestors,
/// return the resolved target.
///
/// Both the resolved parent and every ancestor of the path as written are
/// checked, so a cycle through several links is caught when it comes back
/// round to a directory already on the path.
fn link_loop_target(path: &Path) -> Option<PathBuf> {
    let target = path.canonicalize().ok()?;
    let absolute = std::path::absolute(path).ok()?;
    let parent = absolute.parent()?.canonicalize().ok()?;
    if parent.starts_with(&target) {
        return Some(target);
    }

    absolute
        .ancestors()
        .skip(1)
        .filter_map(|ancestor| ancestor.canonicalize().ok())
        .any(|ancestor| ancestor == target)
        .then_some(target)
}
