//! Core types for treescan.
//!
//! This crate provides the value types shared by the scanning engine and
//! its callers: scanned entries with on-demand metadata, the deduplicating
//! registry that holds a scan's result, content digests and configuration.

mod config;
mod digest;
mod entry;
mod error;
mod path;
mod registry;

pub use config::{ScanConfig, ScanConfigBuilder, default_threads, max_threads};
pub use digest::{DEFAULT_CHUNK_SIZE, HashAlgorithm};
pub use entry::{Entry, EntryKind, EntrySnapshot};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use path::{normalize, relative_to_cwd};
pub use registry::{Registry, ScanStats};
