//! Lexical path resolution for cache keys.
//!
//! Cache keys are absolute, normalized paths. Resolution never touches the
//! filesystem apart from reading the process working directory when the base
//! itself is relative.

use std::path::{Component, Path, PathBuf};

use crate::error::CacheError;

/// Resolves `target` against `base` into an absolute, normalized path.
///
/// An absolute `target` is only normalized. A relative `base` is anchored at
/// the process working directory first.
///
/// # Errors
///
/// Returns [`CacheError::Io`] if the process working directory is needed and
/// cannot be read.
pub fn resolve(base: &Path, target: impl AsRef<Path>) -> Result<PathBuf, CacheError> {
    let target = target.as_ref();
    if target.is_absolute() {
        return Ok(normalize(target));
    }
    Ok(normalize(&absolute_base(base)?.join(target)))
}

/// Returns `base` as an absolute, normalized directory path.
pub fn absolute_base(base: &Path) -> Result<PathBuf, CacheError> {
    if base.is_absolute() {
        return Ok(normalize(base));
    }
    let current = std::env::current_dir().map_err(|e| CacheError::io(base, e))?;
    Ok(normalize(&current.join(base)))
}

/// Removes `.` components and folds `..` into the preceding component.
///
/// `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else if !normalized.has_root() {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
        assert_eq!(normalize(Path::new("/a/b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_resolve_relative_target() {
        let key = resolve(Path::new("/templates"), "a.tmpl").unwrap();
        assert_eq!(key, PathBuf::from("/templates/a.tmpl"));
    }

    #[test]
    fn test_resolve_absolute_target_ignores_base() {
        let key = resolve(Path::new("/templates"), "/other/./a.tmpl").unwrap();
        assert_eq!(key, PathBuf::from("/other/a.tmpl"));
    }

    #[test]
    fn test_resolve_same_key_both_ways() {
        let base = Path::new("/templates/nested/..");
        let relative = resolve(base, "a.tmpl").unwrap();
        let absolute = resolve(base, resolve(base, "a.tmpl").unwrap()).unwrap();
        assert_eq!(relative, absolute);
    }

    #[test]
    fn test_relative_base_is_anchored() {
        let key = resolve(Path::new("fixtures"), "a.tmpl").unwrap();
        assert!(key.is_absolute());
        assert!(key.ends_with("fixtures/a.tmpl"));
    }
}
