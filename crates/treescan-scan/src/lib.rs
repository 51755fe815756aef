//! Concurrent filesystem scanning engine for treescan.
//!
//! # Overview
//!
//! `treescan-scan` discovers every file, directory and symbolic link
//! reachable from a set of root paths:
//!
//! - A **frontier** of pending paths feeds a fixed pool of **workers**.
//!   Inspecting a directory pushes its children back onto the frontier.
//! - Workers hand accepted entries to a bounded **completion channel**,
//!   blocking when it is full.
//! - A single **aggregator** thread drains the channel into the
//!   [`Registry`], which therefore needs no locking.
//! - The **orchestrator** ([`TreeScanner`]) seeds the roots and detects
//!   termination through the frontier's pending-work counter.
//!
//! # Example
//!
//! ```rust,no_run
//! use treescan_scan::{ScanConfig, TreeScanner};
//!
//! let config = ScanConfig::builder()
//!     .root("/path/to/scan")
//!     .exclude_path("/path/to/scan/target")
//!     .build()
//!     .unwrap();
//! let registry = TreeScanner::new().scan(&config).unwrap();
//!
//! println!("{} entries", registry.len());
//! for file in registry.regular_files() {
//!     println!("{} {}", file.md5().unwrap(), file.path().display());
//! }
//! ```

mod aggregator;
mod completion;
mod expansion;
mod frontier;
mod logger;
mod progress;
mod scanner;
mod worker;

pub use completion::{CompletionReceiver, CompletionSender, ScanEvent, SendError, completion_channel};
pub use expansion::ExpansionTracker;
pub use frontier::{Frontier, PendingGuard};
pub use logger::{ScanLogger, TracingLogger};
pub use progress::{ScanPhase, ScanProgress};
pub use scanner::TreeScanner;
pub use worker::EntryFilter;

// Re-export core types for convenience
pub use treescan_core::{
    DEFAULT_CHUNK_SIZE, Entry, EntryKind, EntrySnapshot, HashAlgorithm, Registry, ScanConfig,
    ScanError, ScanStats, ScanWarning, WarningKind,
};
