//! Error types for the template cache.
//!
//! This module provides [`CacheError`], the single error type returned by every
//! cache operation. It wraps the errors of the collaborators the cache relies on
//! (the filesystem, MiniJinja, the regex-based delimiter generator and the glob
//! expander) and classifies them with [`ErrorKind`].

use std::path::PathBuf;

use thiserror::Error;

/// Error type for template cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A template file is missing or unreadable.
    #[error("failed to read template {}: {source}", .path.display())]
    Io {
        /// Path that failed to read
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template syntax error or a failure while rendering a compiled template.
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    /// The delimiter pair or its flags could not be turned into a delimiter spec.
    #[error("invalid delimiters {open:?} / {close:?}: {message}")]
    Delimiters {
        open: String,
        close: String,
        message: String,
    },

    /// A glob pattern could not be parsed.
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// An options bag had the wrong shape.
    #[error("invalid options: {0}")]
    Options(String),

    /// Context data could not be converted to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of a [`CacheError`].
///
/// | Kind | Raised by |
/// |------|-----------|
/// | `Io` | reading a template file |
/// | `Syntax` | the template compiler or the delimiter generator |
/// | `Usage` | bad patterns, options or context data |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Syntax,
    Usage,
}

impl CacheError {
    /// Builds an [`CacheError::Io`] for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CacheError::Io { .. } => ErrorKind::Io,
            CacheError::Template(_) | CacheError::Delimiters { .. } => ErrorKind::Syntax,
            CacheError::Pattern { .. } | CacheError::Options(_) | CacheError::Serialization(_) => {
                ErrorKind::Usage
            }
        }
    }

    /// True when the error came from reading a template file.
    pub fn is_io(&self) -> bool {
        self.kind() == ErrorKind::Io
    }
}

impl From<serde_yaml::Error> for CacheError {
    fn from(err: serde_yaml::Error) -> Self {
        CacheError::Options(err.to_string())
    }
}
