//! Classification of populate targets.
//!
//! [`TemplateCache::populate`](crate::TemplateCache::populate) accepts a single
//! path, a glob pattern or a list of patterns. The shape is decided once, when
//! the argument is converted into a [`Target`]: an absolute string is a single
//! path, anything else is treated as a glob pattern.

use std::path::{Path, PathBuf};

/// What to load into the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// An absolute path, loaded as-is without globbing.
    SinglePath(PathBuf),
    /// A relative path or glob pattern, expanded against the working directory.
    GlobPattern(String),
    /// Several patterns expanded together.
    PatternList(Vec<String>),
}

impl Target {
    /// Classifies a single pattern.
    pub fn classify(pattern: impl Into<String>) -> Self {
        let pattern = pattern.into();
        if Path::new(&pattern).is_absolute() {
            Target::SinglePath(PathBuf::from(pattern))
        } else {
            Target::GlobPattern(pattern)
        }
    }

    /// Builds a pattern list. A list is always globbed, even when it holds a
    /// single absolute path.
    pub fn list<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Target::PatternList(patterns.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Target {
    fn from(pattern: &str) -> Self {
        Target::classify(pattern)
    }
}

impl From<String> for Target {
    fn from(pattern: String) -> Self {
        Target::classify(pattern)
    }
}

impl From<&String> for Target {
    fn from(pattern: &String) -> Self {
        Target::classify(pattern.as_str())
    }
}

impl From<&Path> for Target {
    fn from(path: &Path) -> Self {
        Target::classify(path.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Target {
    fn from(path: PathBuf) -> Self {
        Target::from(path.as_path())
    }
}

impl From<Vec<String>> for Target {
    fn from(patterns: Vec<String>) -> Self {
        Target::PatternList(patterns)
    }
}

impl From<Vec<&str>> for Target {
    fn from(patterns: Vec<&str>) -> Self {
        Target::list(patterns)
    }
}

impl From<&[&str]> for Target {
    fn from(patterns: &[&str]) -> Self {
        Target::list(patterns.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for Target {
    fn from(patterns: [&str; N]) -> Self {
        Target::list(patterns)
    }
}
