//! Directory expansion claims.

use std::path::{Path, PathBuf};

use dashmap::DashSet;

/// Grants the right to list a directory to exactly one worker.
///
/// Any worker may dequeue any path, so the same directory can reach two
/// workers if it was enqueued twice. Only the worker whose claim inserts
/// the path lists its children.
#[derive(Debug, Default)]
pub struct ExpansionTracker {
    claimed: DashSet<PathBuf>,
}

impl ExpansionTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            claimed: DashSet::new(),
        }
    }

    /// Claim a directory. Returns `true` for the first claim only.
    pub fn claim(&self, path: &Path) -> bool {
        self.claimed.insert(path.to_path_buf())
    }

    /// Check if a directory has been claimed (without claiming it).
    pub fn is_claimed(&self, path: &Path) -> bool {
        self.claimed.contains(path)
    }

    /// Number of claimed directories.
    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_claim_once() {
        let tracker = ExpansionTracker::new();
        let dir = Path::new("root/sub");

        assert!(!tracker.is_claimed(dir));
        assert!(tracker.claim(dir));
        assert!(!tracker.claim(dir));
        assert!(tracker.is_claimed(dir));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_concurrent_claims_grant_one_winner() {
        let tracker = Arc::new(ExpansionTracker::new());
        let winners = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                let winners = Arc::clone(&winners);
                std::thread::spawn(move || {
                    if tracker.claim(Path::new("contended")) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
