//! Glob expansion against a working directory.
//!
//! Patterns are anchored at the working directory unless they are absolute.
//! Only regular files are returned, each at most once, in the order the
//! patterns produce them. A pattern starting with `!` excludes anything it
//! matches from the result.
//!
//! ```rust,ignore
//! // templates/a.tmpl, templates/b.tmpl, templates/draft.tmpl
//! let files = expand(&["*.tmpl", "!draft.tmpl"], Path::new("templates"))?;
//! // [".../templates/a.tmpl", ".../templates/b.tmpl"]
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::warn;

use crate::error::CacheError;
use crate::paths;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Expands `patterns` relative to `cwd` into absolute file paths.
///
/// No matches is not an error. Directories that cannot be read while walking
/// are logged and skipped.
///
/// # Errors
///
/// Returns [`CacheError::Pattern`] if a pattern is malformed.
pub fn expand<S: AsRef<str>>(patterns: &[S], cwd: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let base = paths::absolute_base(cwd)?;
    let escaped_base = Pattern::escape(&base.to_string_lossy());

    let mut matched = Vec::new();
    let mut seen = HashSet::new();
    let mut excludes = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if let Some(negated) = pattern.strip_prefix('!') {
            let anchored = anchor(&escaped_base, negated);
            excludes.push(Pattern::new(&anchored).map_err(|source| CacheError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?);
            continue;
        }

        let anchored = anchor(&escaped_base, pattern);
        let entries =
            glob::glob_with(&anchored, MATCH_OPTIONS).map_err(|source| CacheError::Pattern {
                pattern: pattern.to_string(),
                source,
            })?;

        for entry in entries {
            match entry {
                Ok(path) => {
                    let path = paths::normalize(&path);
                    if path.is_file() && seen.insert(path.clone()) {
                        matched.push(path);
                    }
                }
                Err(err) => warn!(path = %err.path().display(), error = %err, "skipping unreadable path"),
            }
        }
    }

    if !excludes.is_empty() {
        matched.retain(|path| {
            !excludes
                .iter()
                .any(|exclude| exclude.matches_path_with(path, MATCH_OPTIONS))
        });
    }

    Ok(matched)
}

fn anchor(escaped_base: &str, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        pattern.to_string()
    } else {
        Path::new(escaped_base)
            .join(pattern)
            .to_string_lossy()
            .into_owned()
    }
}
