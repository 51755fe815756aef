//! Scan configuration types.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::path::relative_to_cwd;

/// Thread count used when the CPU count cannot be determined.
const FALLBACK_MAX_THREADS: usize = 64;

/// Configuration for a scan.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ScanConfig {
    /// Root paths to scan.
    #[builder(setter(each(name = "root", into)))]
    pub roots: Vec<PathBuf>,

    /// Paths to prune, matched exactly in working-directory-relative form.
    #[builder(default, setter(each(name = "exclude_path", into)))]
    #[serde(default)]
    pub exclude: Vec<PathBuf>,

    /// Descend into directories reached through a symbolic link.
    #[builder(default = "true")]
    #[serde(default = "default_true")]
    pub follow_links: bool,

    /// Requested number of worker threads, clamped at scan time.
    #[builder(default = "default_threads()")]
    #[serde(default = "default_threads")]
    pub threads: usize,

    /// Capacity of the completion channel (0 = twice the worker count).
    #[builder(default = "0")]
    #[serde(default)]
    pub completion_capacity: usize,

    /// How long idle threads wait on a queue before re-checking shutdown.
    #[builder(default = "default_poll_interval_ms()")]
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    10
}

/// Upper bound for the worker count: the number of available CPUs.
pub fn max_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_MAX_THREADS)
        .max(1)
}

/// Default worker count: half the available CPUs.
pub fn default_threads() -> usize {
    max_threads() / 2
}

impl ScanConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.roots {
            Some(roots) if !roots.is_empty() => {
                if roots.iter().any(|r| r.as_os_str().is_empty()) {
                    return Err("Root paths cannot be empty".to_string());
                }
            }
            _ => return Err("At least one root path is required".to_string()),
        }
        if self.poll_interval_ms == Some(0) {
            return Err("Poll interval must be positive".to_string());
        }
        Ok(())
    }
}

impl ScanConfig {
    /// Create a new scan config builder.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }

    /// Create a simple config for scanning a single path.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
            exclude: Vec::new(),
            follow_links: true,
            threads: default_threads(),
            completion_capacity: 0,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }

    /// Check a config that did not go through the builder.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.roots.is_empty() {
            return Err(ScanError::InvalidConfig {
                message: "At least one root path is required".to_string(),
            });
        }
        if self.roots.iter().any(|r| r.as_os_str().is_empty()) {
            return Err(ScanError::InvalidConfig {
                message: "Root paths cannot be empty".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ScanError::InvalidConfig {
                message: "Poll interval must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Worker count clamped to `[1, max_threads()]`.
    pub fn worker_count(&self) -> usize {
        self.threads.clamp(1, max_threads())
    }

    /// Completion channel capacity actually used by a scan.
    pub fn effective_completion_capacity(&self) -> usize {
        match self.completion_capacity {
            0 => self.worker_count() * 2,
            n => n,
        }
    }

    /// Idle poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Exclusion set in the same working-directory-relative form as
    /// registry paths.
    pub fn exclusion_set(&self) -> HashSet<PathBuf> {
        self.exclude.iter().map(relative_to_cwd).collect()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::builder()
            .root("/home/user")
            .exclude_path("/home/user/.cache")
            .threads(4usize)
            .follow_links(false)
            .build()
            .unwrap();

        assert_eq!(config.roots, vec![PathBuf::from("/home/user")]);
        assert_eq!(config.exclude, vec![PathBuf::from("/home/user/.cache")]);
        assert_eq!(config.threads, 4);
        assert!(!config.follow_links);
        assert_eq!(config.completion_capacity, 0);
    }

    #[test]
    fn test_builder_requires_root() {
        assert!(ScanConfig::builder().threads(2usize).build().is_err());
        assert!(ScanConfig::builder().root("").build().is_err());
        assert!(
            ScanConfig::builder()
                .root("x")
                .poll_interval_ms(0u64)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_config_simple() {
        let config = ScanConfig::new("/home/user");
        assert_eq!(config.roots, vec![PathBuf::from("/home/user")]);
        assert!(config.follow_links);
        assert!(config.exclude.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_worker_count_clamped() {
        let mut config = ScanConfig::new(".");

        config.threads = 0;
        assert_eq!(config.worker_count(), 1);

        config.threads = usize::MAX;
        assert_eq!(config.worker_count(), max_threads());

        config.threads = 1;
        assert_eq!(config.effective_completion_capacity(), 2);

        config.completion_capacity = 1;
        assert_eq!(config.effective_completion_capacity(), 1);
    }

    #[test]
    fn test_exclusion_set_normalized() {
        let mut config = ScanConfig::new("root");
        config.exclude = vec![PathBuf::from("./root/sub/"), PathBuf::from("root/x/../y")];

        let set = config.exclusion_set();
        assert!(set.contains(&PathBuf::from("root/sub")));
        assert!(set.contains(&PathBuf::from("root/y")));
    }

    #[test]
    fn test_exclusion_set_absolute_matches_relative() {
        let cwd = std::env::current_dir().unwrap();
        let mut config = ScanConfig::new("root");
        config.exclude = vec![cwd.join("root/sub"), PathBuf::from("root/other")];

        let set = config.exclusion_set();
        assert!(set.contains(&PathBuf::from("root/sub")));
        assert!(set.contains(&relative_to_cwd(cwd.join("root/other"))));
        assert!(set.iter().all(|p| p.is_relative()));
    }

    #[test]
    fn test_validate_rejects_empty_roots() {
        let mut config = ScanConfig::new("root");
        config.roots.clear();
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfig { .. })
        ));
    }
}
