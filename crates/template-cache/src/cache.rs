//! The compiled-template cache.
//!
//! [`TemplateCache`] maps absolute file paths to compiled templates and keeps
//! a configuration record ([`Options`]) that evolves across calls.
//!
//! # Sticky Configuration
//!
//! [`compile`](TemplateCache::compile), [`compile_file`](TemplateCache::compile_file),
//! [`populate`](TemplateCache::populate) and [`render`](TemplateCache::render)
//! merge their [`Overrides`] into the stored configuration before doing any
//! work. A delimiter override given once therefore applies to every later call
//! until it is overridden again:
//!
//! ```rust,ignore
//! cache.populate("a.custom.tmpl", &Overrides::new().delims("{%", "%}"))?;
//! cache.populate("b.tmpl", &Overrides::new())?; // still compiled with {% %}
//! ```
//!
//! The `*_with` variants take the configuration explicitly and never touch
//! the stored one; [`render_scoped`](TemplateCache::render_scoped) returns the
//! combined configuration next to the output so the caller decides whether to
//! keep it.
//!
//! # Render Resolution
//!
//! A render target is resolved against the working directory. A cached key
//! renders immediately. Otherwise an existing file is compiled, cached and
//! rendered; a target that is not a file is compiled as template text and
//! rendered without caching.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::delims::DelimiterSpec;
use crate::error::CacheError;
use crate::expand::expand;
use crate::options::{DelimiterFlags, DelimiterPair, FlagOverrides, Options, Overrides};
use crate::paths;
use crate::target::Target;
use crate::template::{CompiledTemplate, MiniJinjaCompiler, Resolved, TemplateCompiler};

/// Name given to templates compiled from text rather than a file.
pub const INLINE_NAME: &str = "<inline>";

/// Output of [`TemplateCache::render_scoped`].
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub output: String,
    /// The configuration the output was rendered with.
    pub options: Options,
}

/// An in-memory cache of compiled templates keyed by absolute path.
///
/// Entries are never evicted or recompiled once present. The cache is not
/// thread-safe; use one instance per thread or synchronize externally.
///
/// # Example
///
/// ```rust,ignore
/// use template_cache::{Overrides, TemplateCache};
///
/// let mut cache = TemplateCache::with_overrides(&Overrides::new().cwd("templates"));
/// cache.populate("*.tmpl", &Overrides::new())?;
///
/// let page = cache.render("a.tmpl", &Overrides::new().set("name", "A"))?;
/// let text = cache.render("Hi <%= name %>", &Overrides::new())?; // not a file: inline
/// ```
pub struct TemplateCache {
    options: Options,
    cache: HashMap<PathBuf, CompiledTemplate>,
    compiler: Box<dyn TemplateCompiler>,
}

impl std::fmt::Debug for TemplateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateCache")
            .field("options", &self.options)
            .field("cached", &self.cache.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for TemplateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateCache {
    /// Creates a cache rooted at the process working directory with the
    /// default `<%` / `%>` delimiters.
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Creates a cache whose configuration is the defaults merged with `overrides`.
    pub fn with_overrides(overrides: &Overrides) -> Self {
        Self::with_options(Options::default().merge(overrides))
    }

    pub fn with_options(options: Options) -> Self {
        Self::with_compiler(options, Box::new(MiniJinjaCompiler::new()))
    }

    /// Creates a cache with an injected template compiler.
    pub fn with_compiler(options: Options, compiler: Box<dyn TemplateCompiler>) -> Self {
        Self {
            options,
            cache: HashMap::new(),
            compiler,
        }
    }

    /// The current configuration.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replaces the configuration, e.g. with one returned by
    /// [`render_scoped`](Self::render_scoped).
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Merges `overrides` into the configuration without doing anything else.
    pub fn configure(&mut self, overrides: &Overrides) -> &mut Self {
        self.options = self.options.merge(overrides);
        self
    }

    /// Builds a delimiter spec.
    ///
    /// `flags` are merged over the default flag set (not the stored flags).
    /// Without an explicit pair the configured pair is used.
    pub fn resolve_delimiters(
        &self,
        delims: Option<&DelimiterPair>,
        flags: &FlagOverrides,
    ) -> Result<DelimiterSpec, CacheError> {
        let pair = delims.unwrap_or(&self.options.delims);
        DelimiterSpec::generate(pair, &DelimiterFlags::default().merge(flags))
    }

    /// Compiles template text after merging `overrides` into the configuration.
    ///
    /// The result is not cached.
    pub fn compile(
        &mut self,
        source: &str,
        overrides: &Overrides,
    ) -> Result<CompiledTemplate, CacheError> {
        self.configure(overrides);
        self.compile_with(INLINE_NAME, source, &self.options)
    }

    /// Compiles template text with an explicit configuration.
    pub fn compile_with(
        &self,
        name: &str,
        source: &str,
        options: &Options,
    ) -> Result<CompiledTemplate, CacheError> {
        let spec = DelimiterSpec::generate(&options.delims, &options.flags)?;
        debug!(
            template = name,
            open = %options.delims.open,
            close = %options.delims.close,
            "compiling template"
        );
        self.compiler.compile(name, source, &spec)
    }

    /// Reads, compiles and caches a file after merging `overrides`.
    ///
    /// A relative `path` is resolved against the working directory. Any
    /// existing entry for the path is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file is missing or unreadable.
    pub fn compile_file(
        &mut self,
        path: impl AsRef<Path>,
        overrides: &Overrides,
    ) -> Result<CompiledTemplate, CacheError> {
        self.configure(overrides);
        let options = self.options.clone();
        self.compile_file_with(path, &options)
    }

    /// Reads, compiles and caches a file with an explicit configuration.
    pub fn compile_file_with(
        &mut self,
        path: impl AsRef<Path>,
        options: &Options,
    ) -> Result<CompiledTemplate, CacheError> {
        let path = paths::resolve(&options.cwd, path)?;
        let bytes = std::fs::read(&path).map_err(|e| CacheError::io(&path, e))?;
        let source = String::from_utf8_lossy(&bytes);
        let compiled = self.compile_with(&path.to_string_lossy(), &source, options)?;
        debug!(path = %path.display(), "cached template");
        self.cache.insert(path, compiled.clone());
        Ok(compiled)
    }

    /// Loads a path, glob pattern or list of patterns into the cache after
    /// merging `overrides`.
    ///
    /// Paths already cached are skipped, so calling this twice with the same
    /// patterns compiles each file once.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if a matched file cannot be read (entries
    /// loaded before the failure stay cached), [`CacheError::Pattern`] for a
    /// malformed pattern, or a compile error.
    pub fn populate(
        &mut self,
        patterns: impl Into<Target>,
        overrides: &Overrides,
    ) -> Result<&mut Self, CacheError> {
        self.configure(overrides);
        let options = self.options.clone();
        self.populate_with(patterns, &options)
    }

    /// Loads patterns into the cache with an explicit configuration.
    pub fn populate_with(
        &mut self,
        patterns: impl Into<Target>,
        options: &Options,
    ) -> Result<&mut Self, CacheError> {
        match patterns.into() {
            Target::SinglePath(path) => {
                let key = paths::normalize(&path);
                self.load(key, options)?;
            }
            Target::GlobPattern(pattern) => {
                for path in expand(&[pattern], &options.cwd)? {
                    self.load(path, options)?;
                }
            }
            Target::PatternList(patterns) => {
                for path in expand(&patterns, &options.cwd)? {
                    self.load(path, options)?;
                }
            }
        }
        Ok(self)
    }

    fn load(&mut self, key: PathBuf, options: &Options) -> Result<(), CacheError> {
        if self.cache.contains_key(&key) {
            trace!(path = %key.display(), "already cached");
            return Ok(());
        }
        self.compile_file_with(key, options)?;
        Ok(())
    }

    /// Renders a cached file, a file on disk, or template text, after merging
    /// `overrides` into the configuration.
    ///
    /// The merged configuration, caller data included, is the render context.
    /// A target that does not name a readable file is compiled as template
    /// text, so rendering never returns [`CacheError::Io`].
    ///
    /// # Errors
    ///
    /// Returns compile or render errors from the template compiler.
    pub fn render(&mut self, target: &str, overrides: &Overrides) -> Result<String, CacheError> {
        self.configure(overrides);
        let options = self.options.clone();
        self.render_with(target, &options)
    }

    /// Renders with the stored configuration merged with `overrides`, without
    /// storing the result of the merge.
    pub fn render_scoped(
        &mut self,
        target: &str,
        overrides: &Overrides,
    ) -> Result<Rendered, CacheError> {
        let options = self.options.merge(overrides);
        let output = self.render_with(target, &options)?;
        Ok(Rendered { output, options })
    }

    /// Renders with an explicit configuration.
    pub fn render_with(&mut self, target: &str, options: &Options) -> Result<String, CacheError> {
        let context = options.context();
        let key = paths::resolve(&options.cwd, target)?;

        if let Some(compiled) = self.cache.get(&key) {
            trace!(path = %key.display(), "cache hit");
            return compiled.render(&context);
        }

        match Resolved::probe(key, target) {
            Resolved::File(path) => match self.compile_file_with(&path, options) {
                Ok(compiled) => compiled.render(&context),
                Err(err) if err.is_io() => {
                    debug!(
                        path = %path.display(),
                        error = %err,
                        "unreadable file, rendering as template text"
                    );
                    self.render_inline(target, &context, options)
                }
                Err(err) => Err(err),
            },
            Resolved::Inline(source) => {
                debug!("target is not a file, rendering as template text");
                self.render_inline(&source, &context, options)
            }
        }
    }

    fn render_inline(
        &self,
        source: &str,
        context: &serde_json::Value,
        options: &Options,
    ) -> Result<String, CacheError> {
        let compiled = self.compile_with(INLINE_NAME, source, options)?;
        compiled.render(context)
    }

    /// Looks up a cached template; a relative path is resolved against the
    /// working directory.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&CompiledTemplate> {
        let key = paths::resolve(&self.options.cwd, path).ok()?;
        self.cache.get(&key)
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.get(path).is_some()
    }

    /// Cache keys in sorted order.
    pub fn keys(&self) -> Vec<&Path> {
        let mut keys: Vec<&Path> = self.cache.keys().map(PathBuf::as_path).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn fixture() -> (tempfile::TempDir, TemplateCache) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.tmpl"), "<%= name %>").unwrap();
        fs::write(dir.path().join("a.custom.tmpl"), "{%= name %}").unwrap();
        let cache = TemplateCache::with_overrides(&Overrides::new().cwd(dir.path()));
        (dir, cache)
    }

    #[test]
    fn test_compile_is_not_cached() {
        let (_dir, mut cache) = fixture();
        let compiled = cache.compile("<%= a %>", &Overrides::new()).unwrap();
        assert_eq!(compiled.render(&json!({"a": "b"})).unwrap(), "b");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_compile_merges_options() {
        let (_dir, mut cache) = fixture();
        cache
            .compile("{%= a %}", &Overrides::new().delims("{%", "%}"))
            .unwrap();
        assert_eq!(cache.options().delims, DelimiterPair::new("{%", "%}"));
    }

    #[test]
    fn test_compile_file_caches_under_absolute_key() {
        let (dir, mut cache) = fixture();
        cache.compile_file("a.tmpl", &Overrides::new()).unwrap();
        let key = paths::normalize(&dir.path().join("a.tmpl"));
        assert_eq!(cache.keys(), vec![key.as_path()]);
    }

    #[test]
    fn test_compile_file_replaces_entry() {
        let (_dir, mut cache) = fixture();
        let first = cache.compile_file("a.tmpl", &Overrides::new()).unwrap();
        let second = cache.compile_file("a.tmpl", &Overrides::new()).unwrap();
        assert!(!first.same_as(&second));
        assert!(cache.get("a.tmpl").unwrap().same_as(&second));
    }

    #[test]
    fn test_compile_file_missing_is_io() {
        let (_dir, mut cache) = fixture();
        let err = cache.compile_file("missing.tmpl", &Overrides::new()).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_render_with_leaves_options() {
        let (_dir, mut cache) = fixture();
        let options = cache.options().merge(&Overrides::new().set("name", "W"));
        assert_eq!(cache.render_with("a.tmpl", &options).unwrap(), "W");
        assert!(cache.options().data.is_empty());
    }

    #[test]
    fn test_compile_file_decodes_invalid_utf8_lossily() {
        let (dir, mut cache) = fixture();
        fs::write(dir.path().join("latin1.tmpl"), b"caf\xe9 <%= name %>").unwrap();
        let compiled = cache.compile_file("latin1.tmpl", &Overrides::new()).unwrap();
        assert_eq!(
            compiled.render(&json!({"name": "X"})).unwrap(),
            "caf\u{FFFD} X"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_render_with_unreadable_file_is_template_text() {
        use std::os::unix::fs::PermissionsExt;

        let (dir, mut cache) = fixture();
        let path = dir.path().join("locked.tmpl");
        fs::write(&path, "<%= name %>").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&path).is_ok() {
            // Privileged users can read it anyway.
            return;
        }

        let options = cache.options().merge(&Overrides::new().set("name", "W"));
        assert_eq!(
            cache.render_with("locked.tmpl", &options).unwrap(),
            "locked.tmpl"
        );
        assert!(!cache.contains("locked.tmpl"));
    }

    #[test]
    fn test_render_scoped_returns_merged_options() {
        let (_dir, mut cache) = fixture();
        let rendered = cache
            .render_scoped("a.tmpl", &Overrides::new().set("name", "S"))
            .unwrap();
        assert_eq!(rendered.output, "S");
        assert_eq!(rendered.options.data["name"], json!("S"));
        assert!(cache.options().data.is_empty());

        cache.set_options(rendered.options);
        assert_eq!(cache.render("a.tmpl", &Overrides::new()).unwrap(), "S");
    }

    #[test]
    fn test_resolve_delimiters_uses_default_flags() {
        let (_dir, mut cache) = fixture();
        cache.configure(&Overrides::new().delims("{%", "%}").body(r"\d+"));

        let spec = cache
            .resolve_delimiters(None, &FlagOverrides::default())
            .unwrap();
        assert_eq!(spec.pair(), &DelimiterPair::new("{%", "%}"));
        assert_eq!(spec.tags("{%= name %}").len(), 1);

        let explicit = DelimiterPair::new("[[", "]]");
        let spec = cache
            .resolve_delimiters(Some(&explicit), &FlagOverrides::default())
            .unwrap();
        assert_eq!(spec.pair(), &explicit);
    }

    #[test]
    fn test_render_context_includes_configuration() {
        let (dir, mut cache) = fixture();
        let out = cache.render("<%= cwd %>", &Overrides::new()).unwrap();
        assert_eq!(out, dir.path().to_string_lossy());
    }
}
