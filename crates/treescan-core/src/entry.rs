//! Scanned filesystem entries.
//!
//! An [`Entry`] only fixes the identity of a path. Every attribute accessor
//! queries the filesystem again when called, so two reads may observe
//! different states if the file changes in between. Use
//! [`Entry::snapshot`] when a consistent view is needed.

use std::fs::{File, Metadata};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use serde::{Deserialize, Serialize};

use crate::digest::{DEFAULT_CHUNK_SIZE, HashAlgorithm, digest_reader};
use crate::error::ScanError;
use crate::path::{normalize, relative_to_cwd};

/// One discovered filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Entry {
    path: PathBuf,
    absolute_path: PathBuf,
    resolved_path: PathBuf,
}

impl Entry {
    /// Create an entry for `path`.
    ///
    /// Only normalizes and resolves the path; a path that does not exist is
    /// accepted and reported by the attribute accessors instead.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let absolute_path = std::path::absolute(path)
            .map(normalize)
            .unwrap_or_else(|_| normalize(path));
        let path = relative_to_cwd(&absolute_path);
        let resolved_path = resolve_lenient(&absolute_path);

        Self {
            path,
            absolute_path,
            resolved_path,
        }
    }

    /// Normalized path relative to the working directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absolute form of [`Entry::path`].
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Absolute path with every symbolic link resolved.
    pub fn resolved_path(&self) -> &Path {
        &self.resolved_path
    }

    /// Metadata following symbolic links.
    pub fn metadata(&self) -> Result<Metadata, ScanError> {
        std::fs::metadata(&self.absolute_path).map_err(|e| ScanError::io(&self.path, e))
    }

    /// Metadata of the path itself, without following a final symlink.
    pub fn symlink_metadata(&self) -> Result<Metadata, ScanError> {
        std::fs::symlink_metadata(&self.absolute_path).map_err(|e| ScanError::io(&self.path, e))
    }

    /// User id of the owner.
    pub fn uid(&self) -> Result<u32, ScanError> {
        Ok(get_uid(&self.metadata()?))
    }

    /// Group id of the owner.
    pub fn gid(&self) -> Result<u32, ScanError> {
        Ok(get_gid(&self.metadata()?))
    }

    /// Permission and file type bits.
    pub fn mode(&self) -> Result<u32, ScanError> {
        Ok(get_mode(&self.metadata()?))
    }

    /// Size in bytes.
    pub fn size(&self) -> Result<u64, ScanError> {
        Ok(self.metadata()?.len())
    }

    /// Creation time, if the platform records one.
    pub fn created(&self) -> Result<Option<SystemTime>, ScanError> {
        Ok(self.metadata()?.created().ok())
    }

    /// Time of most recent access.
    pub fn accessed(&self) -> Result<SystemTime, ScanError> {
        self.metadata()?
            .accessed()
            .map_err(|e| ScanError::io(&self.path, e))
    }

    /// Time of most recent content modification.
    pub fn modified(&self) -> Result<SystemTime, ScanError> {
        self.metadata()?
            .modified()
            .map_err(|e| ScanError::io(&self.path, e))
    }

    pub fn is_dir(&self) -> Result<bool, ScanError> {
        Ok(self.metadata()?.is_dir())
    }

    /// Whether the path (after following links) is a regular file.
    pub fn is_file(&self) -> Result<bool, ScanError> {
        Ok(self.metadata()?.is_file())
    }

    pub fn is_symlink(&self) -> Result<bool, ScanError> {
        Ok(self.symlink_metadata()?.file_type().is_symlink())
    }

    /// Capture every attribute from one stat of the path.
    ///
    /// A non-link costs a single `lstat`; a link adds one `stat` of its
    /// target. A dangling link is described by its own metadata and is
    /// neither a directory nor a regular file.
    pub fn snapshot(&self) -> Result<EntrySnapshot, ScanError> {
        let link_meta = self.symlink_metadata()?;
        if !link_meta.file_type().is_symlink() {
            return Ok(EntrySnapshot::from_metadata(&link_meta, false));
        }

        match std::fs::metadata(&self.absolute_path) {
            Ok(target_meta) => Ok(EntrySnapshot::from_metadata(&target_meta, true)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let mut snapshot = EntrySnapshot::from_metadata(&link_meta, true);
                snapshot.is_dir = false;
                snapshot.is_file = false;
                Ok(snapshot)
            }
            Err(e) => Err(ScanError::io(&self.path, e)),
        }
    }

    /// Hash the file content with every algorithm in one pass.
    ///
    /// Digests are returned as lowercase hex in the order requested.
    ///
    /// # Panics
    ///
    /// Panics if the entry is not a regular file or is a symbolic link.
    pub fn hash(&self, algorithms: &[HashAlgorithm]) -> Result<Vec<String>, ScanError> {
        self.hash_with_chunk_size(algorithms, DEFAULT_CHUNK_SIZE)
    }

    /// Like [`Entry::hash`] with an explicit read size.
    ///
    /// # Panics
    ///
    /// Panics if the entry is not a regular file or is a symbolic link.
    pub fn hash_with_chunk_size(
        &self,
        algorithms: &[HashAlgorithm],
        chunk_size: usize,
    ) -> Result<Vec<String>, ScanError> {
        if chunk_size == 0 {
            return Err(ScanError::InvalidConfig {
                message: "Hash chunk size must be positive".to_string(),
            });
        }
        let regular = self.is_file()? && !self.is_symlink()?;
        assert!(
            regular,
            "hash requires a regular file that is not a symlink: {}",
            self.path.display()
        );

        let file = File::open(&self.absolute_path).map_err(|e| ScanError::io(&self.path, e))?;
        digest_reader(file, algorithms, chunk_size).map_err(|e| ScanError::io(&self.path, e))
    }

    pub fn md5(&self) -> Result<String, ScanError> {
        self.single_digest(HashAlgorithm::Md5)
    }

    pub fn sha1(&self) -> Result<String, ScanError> {
        self.single_digest(HashAlgorithm::Sha1)
    }

    pub fn sha256(&self) -> Result<String, ScanError> {
        self.single_digest(HashAlgorithm::Sha256)
    }

    pub fn blake3(&self) -> Result<String, ScanError> {
        self.single_digest(HashAlgorithm::Blake3)
    }

    fn single_digest(&self, algorithm: HashAlgorithm) -> Result<String, ScanError> {
        let mut digests = self.hash(&[algorithm])?;
        Ok(digests.pop().unwrap_or_default())
    }
}

/// Attributes of an entry captured at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySnapshot {
    /// User id of the owner.
    pub uid: u32,
    /// Group id of the owner.
    pub gid: u32,
    /// Permission and file type bits.
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
    pub created: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
    /// Regular file (after following links).
    pub is_file: bool,
    pub is_symlink: bool,
}

impl EntrySnapshot {
    fn from_metadata(metadata: &Metadata, is_symlink: bool) -> Self {
        Self {
            uid: get_uid(metadata),
            gid: get_gid(metadata),
            mode: get_mode(metadata),
            size: metadata.len(),
            created: metadata.created().ok(),
            accessed: metadata.accessed().ok(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
            is_file: metadata.is_file(),
            is_symlink,
        }
    }

    /// Display classification of this snapshot.
    pub fn kind(&self) -> EntryKind {
        if self.is_dir {
            EntryKind::Directory
        } else if self.is_file {
            EntryKind::File
        } else if self.is_symlink {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }
}

/// Coarse classification of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// A directory, possibly reached through a link.
    Directory,
    /// A regular file, possibly reached through a link.
    File,
    /// A link whose target is missing or is neither a file nor a directory.
    Symlink,
    /// Sockets, devices, fifos.
    Other,
}

/// Resolve symlinks in `path`, tolerating a missing tail.
///
/// The deepest existing ancestor is canonicalized and the unresolved
/// remainder is appended as-is.
fn resolve_lenient(path: &Path) -> PathBuf {
    if let Ok(resolved) = path.canonicalize() {
        return resolved;
    }
    for ancestor in path.ancestors().skip(1) {
        if let Ok(resolved) = ancestor.canonicalize() {
            return match path.strip_prefix(ancestor) {
                Ok(rest) => resolved.join(rest),
                Err(_) => resolved,
            };
        }
    }
    path.to_path_buf()
}

// Cross-platform metadata helpers

#[cfg(unix)]
fn get_uid(metadata: &Metadata) -> u32 {
    metadata.uid()
}

#[cfg(not(unix))]
fn get_uid(_metadata: &Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn get_gid(metadata: &Metadata) -> u32 {
    metadata.gid()
}

#[cfg(not(unix))]
fn get_gid(_metadata: &Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn get_mode(metadata: &Metadata) -> u32 {
    metadata.mode()
}

#[cfg(not(unix))]
fn get_mode(metadata: &Metadata) -> u32 {
    // No POSIX bits; approximate from the read-only flag.
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
