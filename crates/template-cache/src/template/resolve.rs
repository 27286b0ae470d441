use std::path::PathBuf;

/// How an uncached render target is interpreted.
///
/// The decision is made by a single existence probe: a regular file at the
/// resolved path means [`Resolved::File`], anything else (no such path, a
/// directory) means the original target string is template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// Compile and cache the file at this absolute path.
    File(PathBuf),
    /// Compile this text directly, without caching.
    Inline(String),
}

impl Resolved {
    /// Probes `path` and falls back to `original` as inline text.
    pub fn probe(path: PathBuf, original: &str) -> Self {
        if path.is_file() {
            Resolved::File(path)
        } else {
            Resolved::Inline(original.to_string())
        }
    }
}
