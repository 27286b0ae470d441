//! Template compilation.
//!
//! The cache never interprets template bodies itself. It hands the source text
//! and a [`DelimiterSpec`](crate::DelimiterSpec) to a [`TemplateCompiler`] and
//! stores the [`CompiledTemplate`] it gets back.
//!
//! ## Tag Translation
//!
//! The default compiler, [`MiniJinjaCompiler`], rewrites delimiter tags into
//! MiniJinja syntax and lets MiniJinja do the rest:
//!
//! ```text
//! Source:     Hello <%= user.name %>! <% if admin %>(admin)<% endif %>
//! Translated: Hello {{ user.name }}! {% if admin %}(admin){% endif %}
//! ```
//!
//! Escape tags (`<%- expr %>`) become `{{ (expr) | escape }}`. Text outside
//! tags is copied through unchanged.
//!
//! ## Inline vs File
//!
//! [`Resolved`] captures the one decision the renderer makes for an uncached
//! target: whether it names a file on disk or is template text itself.

mod compiled;
mod engine;
mod resolve;

pub use compiled::CompiledTemplate;
pub use engine::{translate, MiniJinjaCompiler, TemplateCompiler};
pub use resolve::Resolved;
