//! Delimiter spec generation.
//!
//! A [`DelimiterSpec`] turns a [`DelimiterPair`] plus [`DelimiterFlags`] into
//! the regular expressions the compiler uses to find template tags. Three tag
//! kinds are recognized, distinguished by the sigil right after the opening
//! marker:
//!
//! | Tag | Example (default pair) | Meaning |
//! |-----|------------------------|---------|
//! | interpolate | `<%= name %>` | insert the value of an expression |
//! | escape | `<%- name %>` | insert the HTML-escaped value |
//! | evaluate | `<% if name %>` | run a statement |
//!
//! ```rust
//! use template_cache::{DelimiterFlags, DelimiterPair, DelimiterSpec, TagKind};
//!
//! let spec = DelimiterSpec::generate(
//!     &DelimiterPair::new("{%", "%}"),
//!     &DelimiterFlags::default(),
//! ).unwrap();
//!
//! let tags = spec.tags("Hello {%= name %}!");
//! assert_eq!(tags.len(), 1);
//! assert_eq!(tags[0].kind, TagKind::Interpolate);
//! assert_eq!(tags[0].body, "name");
//! ```

use regex::Regex;

use crate::error::CacheError;
use crate::options::{DelimiterFlags, DelimiterPair};

/// Body pattern used when the flags leave `body` empty.
pub const DEFAULT_BODY: &str = r"[\s\S]+?";

const INTERPOLATE_SIGIL: &str = "=";
const ESCAPE_SIGIL: &str = "-";

/// The kind of a template tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Interpolate,
    Escape,
    Evaluate,
}

/// One tag found in template text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'t> {
    pub kind: TagKind,
    /// Tag body with surrounding whitespace removed.
    pub body: &'t str,
    /// Byte offset of the opening marker.
    pub start: usize,
    /// Byte offset just past the closing marker.
    pub end: usize,
}

/// Compiled matching patterns for one delimiter pair.
#[derive(Debug, Clone)]
pub struct DelimiterSpec {
    pair: DelimiterPair,
    interpolate: Regex,
    escape: Regex,
    evaluate: Regex,
    /// All three kinds in one alternation with named body groups.
    scanner: Regex,
}

impl DelimiterSpec {
    /// Builds the spec for `pair` using `flags`.
    ///
    /// The per-kind patterns honor `noncapture`; tag scanning always captures
    /// the body.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Delimiters`] if either marker is empty, a flag
    /// letter is unknown, or the resulting pattern does not compile.
    pub fn generate(pair: &DelimiterPair, flags: &DelimiterFlags) -> Result<Self, CacheError> {
        let invalid = |message: String| CacheError::Delimiters {
            open: pair.open.clone(),
            close: pair.close.clone(),
            message,
        };

        if pair.open.is_empty() {
            return Err(invalid("opening delimiter is empty".into()));
        }
        if pair.close.is_empty() {
            return Err(invalid("closing delimiter is empty".into()));
        }

        let inline = inline_flags(&flags.regex_flags).map_err(invalid)?;
        let (open, close) = if flags.escape {
            (regex::escape(&pair.open), regex::escape(&pair.close))
        } else {
            (pair.open.clone(), pair.close.clone())
        };
        let body = if flags.body.is_empty() {
            DEFAULT_BODY
        } else {
            flags.body.as_str()
        };
        let group = if flags.noncapture {
            format!("(?:{})", body)
        } else {
            format!("({})", body)
        };

        let tag = |sigil: &str, group: &str| {
            format!(
                r"{open}{sigil}{prefix}\s*{group}\s*{suffix}{close}",
                open = open,
                sigil = sigil,
                prefix = flags.prefix,
                group = group,
                suffix = flags.suffix,
                close = close,
            )
        };
        let build = |source: String| {
            Regex::new(&format!("{}{}", inline, source)).map_err(|e| invalid(e.to_string()))
        };

        let scanner = format!(
            "(?:{})|(?:{})|(?:{})",
            tag(ESCAPE_SIGIL, &format!("(?P<escape>{})", body)),
            tag(INTERPOLATE_SIGIL, &format!("(?P<interpolate>{})", body)),
            tag("", &format!("(?P<evaluate>{})", body)),
        );

        Ok(Self {
            pair: pair.clone(),
            interpolate: build(tag(INTERPOLATE_SIGIL, &group))?,
            escape: build(tag(ESCAPE_SIGIL, &group))?,
            evaluate: build(tag("", &group))?,
            scanner: build(format!("(?:{})", scanner))?,
        })
    }

    /// The pair this spec was generated from.
    pub fn pair(&self) -> &DelimiterPair {
        &self.pair
    }

    pub fn interpolate(&self) -> &Regex {
        &self.interpolate
    }

    pub fn escape(&self) -> &Regex {
        &self.escape
    }

    pub fn evaluate(&self) -> &Regex {
        &self.evaluate
    }

    /// Finds every tag in `text`, in order.
    ///
    /// At a given position escape tags win over interpolate tags, which win
    /// over evaluate tags.
    pub fn tags<'t>(&self, text: &'t str) -> Vec<Tag<'t>> {
        self.scanner
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let (kind, body) = if let Some(m) = caps.name("escape") {
                    (TagKind::Escape, m)
                } else if let Some(m) = caps.name("interpolate") {
                    (TagKind::Interpolate, m)
                } else {
                    (TagKind::Evaluate, caps.name("evaluate")?)
                };
                Some(Tag {
                    kind,
                    body: body.as_str().trim(),
                    start: whole.start(),
                    end: whole.end(),
                })
            })
            .collect()
    }
}

/// Translates JavaScript-style flag letters into a Rust inline flag group.
///
/// `g` and `u` are accepted and ignored: matching is always global and
/// Unicode-aware.
fn inline_flags(letters: &str) -> Result<String, String> {
    let mut inline = String::new();
    for letter in letters.chars() {
        match letter {
            'g' | 'u' => {}
            'i' | 'm' | 's' | 'x' => {
                if !inline.contains(letter) {
                    inline.push(letter);
                }
            }
            other => return Err(format!("unsupported regex flag '{}'", other)),
        }
    }
    if inline.is_empty() {
        Ok(inline)
    } else {
        Ok(format!("(?{})", inline))
    }
}
