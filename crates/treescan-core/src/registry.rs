//! Aggregated scan result.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;
use crate::error::ScanWarning;
use crate::path::relative_to_cwd;

/// Counters gathered while a scan runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Paths taken off the frontier.
    pub paths_visited: u64,
    /// Paths pruned by the exclusion list.
    pub paths_excluded: u64,
    /// Paths that no longer existed when inspected.
    pub paths_vanished: u64,
    /// Paths that exist but could not be stat'ed.
    pub metadata_errors: u64,
    /// Directories whose children were listed.
    pub dirs_expanded: u64,
    /// Directories that could not be listed.
    pub list_errors: u64,
    /// Entries the accept predicate turned down.
    pub entries_rejected: u64,
    /// Entries handed to the aggregator.
    pub entries_emitted: u64,
    /// Largest number of entries waiting in the completion channel.
    pub completion_high_water: u64,
    /// Number of worker threads used.
    pub workers: usize,
    /// Wall time of the scan.
    pub duration: Duration,
}

/// Deduplicated, classified set of scanned entries.
///
/// Not synchronized: a scan mutates it from one thread only, and it is
/// read-only once the scan returns.
#[derive(Debug, Default)]
pub struct Registry {
    by_path: HashMap<PathBuf, Entry>,
    directories: HashSet<PathBuf>,
    regular_files: HashSet<PathBuf>,
    symlinks: HashSet<PathBuf>,
    warnings: Vec<ScanWarning>,
    stats: ScanStats,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, classifying it into the derived sets.
    ///
    /// The first entry for a path wins; later ones are ignored. Returns
    /// whether the entry was inserted. An entry whose path can no longer be
    /// stat'ed is still recorded, just without a classification.
    pub fn add(&mut self, entry: Entry) -> bool {
        if self.by_path.contains_key(entry.path()) {
            return false;
        }

        let path = entry.path().to_path_buf();
        if let Ok(snapshot) = entry.snapshot() {
            if snapshot.is_symlink {
                self.symlinks.insert(path.clone());
            }
            if snapshot.is_dir {
                self.directories.insert(path.clone());
            } else if snapshot.is_file {
                self.regular_files.insert(path.clone());
            }
        }
        self.by_path.insert(path, entry);
        true
    }

    /// Record a non-fatal warning.
    pub fn add_warning(&mut self, warning: ScanWarning) {
        self.warnings.push(warning);
    }

    /// Attach the final scan counters.
    pub fn set_stats(&mut self, stats: ScanStats) {
        self.stats = stats;
    }

    /// Look up an entry by path, given in absolute or relative form.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&Entry> {
        self.by_path.get(&relative_to_cwd(path))
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.by_path.contains_key(&relative_to_cwd(path))
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Every entry, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.by_path.values()
    }

    /// Every working-directory-relative path, in no particular order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.by_path.keys().map(PathBuf::as_path)
    }

    /// Entries that are directories, including linked directories.
    pub fn directories(&self) -> impl Iterator<Item = &Entry> {
        self.select(&self.directories)
    }

    /// Entries that are regular files, including links to regular files.
    pub fn regular_files(&self) -> impl Iterator<Item = &Entry> {
        self.select(&self.regular_files)
    }

    /// Entries that are symbolic links.
    pub fn symlinks(&self) -> impl Iterator<Item = &Entry> {
        self.select(&self.symlinks)
    }

    pub fn is_directory(&self, path: impl AsRef<Path>) -> bool {
        self.directories.contains(&relative_to_cwd(path))
    }

    pub fn is_regular_file(&self, path: impl AsRef<Path>) -> bool {
        self.regular_files.contains(&relative_to_cwd(path))
    }

    pub fn is_symlink(&self, path: impl AsRef<Path>) -> bool {
        self.symlinks.contains(&relative_to_cwd(path))
    }

    pub fn directory_count(&self) -> usize {
        self.directories.len()
    }

    pub fn regular_file_count(&self) -> usize {
        self.regular_files.len()
    }

    pub fn symlink_count(&self) -> usize {
        self.symlinks.len()
    }

    /// Warnings recorded during the scan.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Counters from the scan that produced this registry.
    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    fn select<'a>(&'a self, set: &'a HashSet<PathBuf>) -> impl Iterator<Item = &'a Entry> + 'a {
        set.iter().filter_map(move |p| self.by_path.get(p))
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a Entry;
    type IntoIter = std::collections::hash_map::Values<'a, PathBuf, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_path.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_add_classifies() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("sub");
        let file = temp.path().join("a.txt");
        fs::create_dir(&dir).unwrap();
        fs::write(&file, "hi").unwrap();

        let mut registry = Registry::new();
        assert!(registry.add(Entry::new(&dir)));
        assert!(registry.add(Entry::new(&file)));

        assert_eq!(registry.len(), 2);
        assert!(registry.is_directory(&dir));
        assert!(registry.is_regular_file(&file));
        assert_eq!(registry.symlink_count(), 0);
        assert_eq!(registry.directories().count(), 1);
        assert_eq!(registry.regular_files().count(), 1);
    }

    #[test]
    fn test_add_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "hi").unwrap();

        let mut registry = Registry::new();
        assert!(registry.add(Entry::new(&file)));
        assert!(!registry.add(Entry::new(file.join("../a.txt"))));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.regular_file_count(), 1);
    }

    #[test]
    fn test_missing_path_recorded_unclassified() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("gone");

        let mut registry = Registry::new();
        assert!(registry.add(Entry::new(&gone)));

        assert!(registry.contains(&gone));
        assert_eq!(registry.directory_count(), 0);
        assert_eq!(registry.regular_file_count(), 0);
        assert_eq!(registry.symlink_count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_linked_directory_in_both_sets() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let mut registry = Registry::new();
        registry.add(Entry::new(&link));

        assert!(registry.is_directory(&link));
        assert!(registry.is_symlink(&link));
        assert!(!registry.is_regular_file(&link));
    }

    #[test]
    fn test_get_normalizes_query() {
        let temp = TempDir::new().unwrap();
        let mut registry = Registry::new();
        registry.add(Entry::new(temp.path()));

        let query = temp.path().join("x/..");
        assert_eq!(registry.get(&query).unwrap().absolute_path(), temp.path());
        assert!(registry.get(&query).unwrap().path().is_relative());
        assert_eq!((&registry).into_iter().count(), 1);
    }
}
