//! Path normalization.
//!
//! Registry keys, exclusion paths and registry queries all go through
//! [`relative_to_cwd`], so a path given in absolute form matches the same
//! path given relative to the working directory.

use std::path::{Component, Path, PathBuf};

/// Normalize a path without touching the filesystem.
///
/// Removes `.` components and redundant separators, and folds `name/..`
/// pairs. Leading `..` components of a relative path are kept; `..` directly
/// under the root is dropped. An empty result becomes `.`.
pub fn normalize(path: impl AsRef<Path>) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// The normalized form of `path` relative to the current working directory.
///
/// Equivalent to making `path` absolute, normalizing it, and expressing it
/// relative to the working directory, with `..` components where the two
/// diverge. Falls back to the normalized absolute path if the working
/// directory is unavailable or on another root.
pub fn relative_to_cwd(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let absolute = match std::path::absolute(path) {
        Ok(absolute) => normalize(absolute),
        Err(_) => return normalize(path),
    };
    match std::env::current_dir() {
        Ok(cwd) => relative_to(&absolute, &normalize(cwd)),
        Err(_) => absolute,
    }
}

/// Express the absolute, normalized `path` relative to the absolute,
/// normalized `base`.
fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();

    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let shares_root = path_parts
        .first()
        .zip(base_parts.first())
        .is_some_and(|(a, b)| a == b);
    if common == 0 || !shares_root {
        return path.to_path_buf();
    }

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push(Component::ParentDir);
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }

    if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dot_components() {
        assert_eq!(normalize("./root/./a.txt"), PathBuf::from("root/a.txt"));
        assert_eq!(normalize("root//sub/"), PathBuf::from("root/sub"));
    }

    #[test]
    fn test_normalize_parent_components() {
        assert_eq!(normalize("root/sub/../a.txt"), PathBuf::from("root/a.txt"));
        assert_eq!(normalize("../x/../y"), PathBuf::from("../y"));
        assert_eq!(normalize("a/.."), PathBuf::from("."));
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_absolute() {
        assert_eq!(normalize("/../tmp/./x"), PathBuf::from("/tmp/x"));
        assert_eq!(normalize("/"), PathBuf::from("/"));
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_to_base() {
        let base = Path::new("/work/crate");
        assert_eq!(relative_to(Path::new("/work/crate/a/b"), base), PathBuf::from("a/b"));
        assert_eq!(relative_to(Path::new("/work/crate"), base), PathBuf::from("."));
        assert_eq!(relative_to(Path::new("/work/other"), base), PathBuf::from("../other"));
        assert_eq!(relative_to(Path::new("/tmp/x"), base), PathBuf::from("../../tmp/x"));
        assert_eq!(relative_to(Path::new("/"), base), PathBuf::from("../.."));
    }

    #[test]
    fn test_relative_to_cwd_forms_agree() {
        let cwd = std::env::current_dir().unwrap();
        let absolute = cwd.join("some/./dir/../file.txt");

        assert_eq!(relative_to_cwd(&absolute), PathBuf::from("some/file.txt"));
        assert_eq!(relative_to_cwd("./some/file.txt"), PathBuf::from("some/file.txt"));
        assert_eq!(relative_to_cwd(&cwd), PathBuf::from("."));
        assert!(relative_to_cwd(&absolute).is_relative());
    }

    #[test]
    fn test_normalize_empty() {
        assert_eq!(normalize(""), PathBuf::from("."));
        assert_eq!(normalize("."), PathBuf::from("."));
    }
}
