//! # Template Cache - Compiled Templates Keyed by Path
//!
//! `template-cache` compiles templates written with configurable delimiters
//! (`<%= name %>` by default) and memoizes the compiled render functions by
//! absolute file path. A single render entry point accepts either a path to a
//! template file or template text, and tells them apart by whether the path
//! exists.
//!
//! ## Core Concepts
//!
//! - [`TemplateCache`]: the cache and its evolving configuration
//! - [`Options`] / [`Overrides`]: configuration and the per-call bag merged into it
//! - [`DelimiterSpec`]: matching patterns generated from a [`DelimiterPair`]
//! - [`Target`]: a single path, a glob pattern, or a list of patterns
//! - [`template::TemplateCompiler`]: the seam to the template engine
//!   (MiniJinja by default)
//!
//! ## Quick Start
//!
//! ```rust
//! use template_cache::{Overrides, TemplateCache};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(dir.path().join("a.tmpl"), "Hello, <%= name %>!").unwrap();
//!
//! let mut cache = TemplateCache::with_overrides(&Overrides::new().cwd(dir.path()));
//! cache.populate("*.tmpl", &Overrides::new()).unwrap();
//!
//! let page = cache.render("a.tmpl", &Overrides::new().set("name", "World")).unwrap();
//! assert_eq!(page, "Hello, World!");
//!
//! // Not a file on disk: rendered as template text.
//! let text = cache.render("<%= name %>?", &Overrides::new()).unwrap();
//! assert_eq!(text, "World?");
//! ```
//!
//! ## Custom Delimiters
//!
//! ```rust
//! use template_cache::{Overrides, TemplateCache};
//!
//! let mut cache = TemplateCache::new();
//! let out = cache
//!     .render("{%= a %}", &Overrides::new().delims("{%", "%}").set("a", 1))
//!     .unwrap();
//! assert_eq!(out, "1");
//!
//! // The override sticks until it is replaced.
//! assert_eq!(cache.options().delims.open, "{%");
//! ```

mod cache;
mod delims;
mod error;
pub mod expand;
mod options;
pub mod paths;
mod target;
pub mod template;

pub use cache::{Rendered, TemplateCache, INLINE_NAME};
pub use delims::{DelimiterSpec, Tag, TagKind, DEFAULT_BODY};
pub use error::{CacheError, ErrorKind};
pub use options::{
    DelimiterFlags, DelimiterPair, FlagOverrides, Options, Overrides, DEFAULT_CLOSE,
    DEFAULT_OPEN,
};
pub use target::Target;
pub use template::{CompiledTemplate, MiniJinjaCompiler, Resolved, TemplateCompiler};
