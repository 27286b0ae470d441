//! Template compiler abstraction.
//!
//! This module defines the [`TemplateCompiler`] trait, the seam between the
//! cache and whatever turns template text into a render function. The default
//! implementation is [`MiniJinjaCompiler`].

use std::sync::Arc;

use minijinja::{AutoEscape, Environment, Output, State, Value};

use super::compiled::CompiledTemplate;
use crate::delims::{DelimiterSpec, TagKind};
use crate::error::CacheError;

/// Turns template text into a [`CompiledTemplate`].
///
/// Compilers are not memoized; the cache decides when to call them.
pub trait TemplateCompiler: Send + Sync {
    /// Compiles `source`, locating tags with `spec`.
    ///
    /// `name` identifies the template in error messages.
    fn compile(
        &self,
        name: &str,
        source: &str,
        spec: &DelimiterSpec,
    ) -> Result<CompiledTemplate, CacheError>;
}

type EnvironmentSetup = dyn Fn(&mut Environment<'static>) + Send + Sync;

/// MiniJinja-backed compiler.
///
/// Each compiled template owns a private MiniJinja environment configured so
/// that:
/// - output is never auto-escaped (use escape tags for HTML)
/// - a trailing newline in the source is kept
/// - `none` values and undefined variables render as empty strings
///
/// # Example
///
/// ```rust
/// use template_cache::{DelimiterFlags, DelimiterPair, DelimiterSpec};
/// use template_cache::template::{MiniJinjaCompiler, TemplateCompiler};
/// use serde_json::json;
///
/// let spec = DelimiterSpec::generate(&DelimiterPair::default(), &DelimiterFlags::default()).unwrap();
/// let compiled = MiniJinjaCompiler::new()
///     .compile("greeting", "Hello, <%= name %>!", &spec)
///     .unwrap();
///
/// assert_eq!(compiled.render(&json!({"name": "World"})).unwrap(), "Hello, World!");
/// ```
#[derive(Clone, Default)]
pub struct MiniJinjaCompiler {
    setup: Option<Arc<EnvironmentSetup>>,
}

impl MiniJinjaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler that runs `setup` on every environment it builds.
    ///
    /// Use this to register custom filters, functions or globals.
    pub fn with_setup<F>(setup: F) -> Self
    where
        F: Fn(&mut Environment<'static>) + Send + Sync + 'static,
    {
        Self {
            setup: Some(Arc::new(setup)),
        }
    }

    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_formatter(blank_none_formatter);
        if let Some(setup) = &self.setup {
            setup(&mut env);
        }
        env
    }
}

impl TemplateCompiler for MiniJinjaCompiler {
    fn compile(
        &self,
        name: &str,
        source: &str,
        spec: &DelimiterSpec,
    ) -> Result<CompiledTemplate, CacheError> {
        let mut env = self.environment();
        env.add_template_owned(name.to_string(), translate(source, spec))?;

        let template_name = name.to_string();
        Ok(CompiledTemplate::new(
            name,
            move |context: &serde_json::Value| {
                let template = env.get_template(&template_name)?;
                Ok(template.render(context)?)
            },
        ))
    }
}

/// Rewrites delimiter tags in `source` into MiniJinja syntax.
///
/// Literal text is copied through with every `{` emitted as an expression, so
/// MiniJinja never sees a tag that was not written with the custom delimiters.
pub fn translate(source: &str, spec: &DelimiterSpec) -> String {
    let mut out = String::with_capacity(source.len() + 16);
    let mut last = 0;

    for tag in spec.tags(source) {
        push_literal(&mut out, &source[last..tag.start]);
        match tag.kind {
            TagKind::Interpolate => {
                out.push_str("{{ ");
                out.push_str(tag.body);
                out.push_str(" }}");
            }
            TagKind::Escape => {
                out.push_str("{{ (");
                out.push_str(tag.body);
                out.push_str(") | escape }}");
            }
            TagKind::Evaluate => {
                out.push_str("{% ");
                out.push_str(tag.body);
                out.push_str(" %}");
            }
        }
        last = tag.end;
    }

    push_literal(&mut out, &source[last..]);
    out
}

fn push_literal(out: &mut String, text: &str) {
    for ch in text.chars() {
        if ch == '{' {
            out.push_str("{{ '{' }}");
        } else {
            out.push(ch);
        }
    }
}

fn blank_none_formatter(
    out: &mut Output<'_>,
    state: &State<'_, '_>,
    value: &Value,
) -> Result<(), minijinja::Error> {
    if value.is_none() {
        Ok(())
    } else {
        minijinja::escape_formatter(out, state, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::{DelimiterFlags, DelimiterPair};
    use serde_json::json;

    fn spec(open: &str, close: &str) -> DelimiterSpec {
        DelimiterSpec::generate(&DelimiterPair::new(open, close), &DelimiterFlags::default())
            .unwrap()
    }

    fn render(source: &str, context: serde_json::Value) -> String {
        MiniJinjaCompiler::new()
            .compile("test", source, &spec("<%", "%>"))
            .unwrap()
            .render(&context)
            .unwrap()
    }

    #[test]
    fn test_translate() {
        let translated = translate(
            "a <%= b %> <%- c %> <% if d %>{x}<% endif %>",
            &spec("<%", "%>"),
        );
        assert_eq!(
            translated,
            "a {{ b }} {{ (c) | escape }} {% if d %}{{ '{' }}x}{% endif %}"
        );
    }

    #[test]
    fn test_interpolate() {
        assert_eq!(render("<%= name %>", json!({"name": "A"})), "A");
        assert_eq!(render("<%= user.name %>!", json!({"user": {"name": "B"}})), "B!");
    }

    #[test]
    fn test_escape_tag() {
        assert_eq!(
            render("<%- html %>", json!({"html": "<b>&"})),
            "&lt;b&gt;&amp;"
        );
    }

    #[test]
    fn test_interpolate_does_not_escape() {
        assert_eq!(render("<%= html %>", json!({"html": "<b>"})), "<b>");
    }

    #[test]
    fn test_evaluate_control_flow() {
        let out = render(
            "<% for item in items %><%= item %>,<% endfor %>",
            json!({"items": ["a", "b", "c"]}),
        );
        assert_eq!(out, "a,b,c,");
    }

    #[test]
    fn test_jinja_syntax_in_text_is_literal() {
        let source = "{{ name }} {% if x %} {# c #} <%= name %>\n";
        assert_eq!(
            render(source, json!({"name": "N"})),
            "{{ name }} {% if x %} {# c #} N\n"
        );
    }

    #[test]
    fn test_none_and_undefined_are_blank() {
        assert_eq!(render("[<%= a %>][<%= missing %>]", json!({"a": null})), "[][]");
    }

    #[test]
    fn test_custom_delimiters() {
        let compiled = MiniJinjaCompiler::new()
            .compile("custom", "{%= name %} <%= name %>", &spec("{%", "%}"))
            .unwrap();
        assert_eq!(
            compiled.render(&json!({"name": "X"})).unwrap(),
            "X <%= name %>"
        );
    }

    #[test]
    fn test_syntax_error() {
        let err = MiniJinjaCompiler::new()
            .compile("broken", "<%= a + %>", &spec("<%", "%>"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_setup_registers_filters() {
        let compiler = MiniJinjaCompiler::with_setup(|env| {
            env.add_filter("shout", |value: String| value.to_uppercase());
        });
        let compiled = compiler
            .compile("shout", "<%= name | shout %>", &spec("<%", "%>"))
            .unwrap();
        assert_eq!(compiled.render(&json!({"name": "hey"})).unwrap(), "HEY");
    }
}
