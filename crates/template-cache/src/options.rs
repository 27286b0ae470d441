//! Cache configuration and per-call overrides.
//!
//! Every cache instance owns one [`Options`] record. Operations accept an
//! [`Overrides`] bag that is shallow-merged over it: keys the caller sets
//! replace the same-named keys, everything else carries over. Context data is
//! merged key by key, so a value set in one call stays visible to later calls
//! until it is overwritten.
//!
//! ```rust
//! use template_cache::{Options, Overrides};
//!
//! let base = Options::default();
//! let first = base.merge(&Overrides::new().delims("{%", "%}").set("name", "A"));
//! let second = first.merge(&Overrides::new().set("title", "T"));
//!
//! assert_eq!(second.delims.open, "{%");
//! assert_eq!(second.data["name"], "A");
//! assert_eq!(second.data["title"], "T");
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CacheError;

/// Default opening delimiter.
pub const DEFAULT_OPEN: &str = "<%";

/// Default closing delimiter.
pub const DEFAULT_CLOSE: &str = "%>";

/// The two literal markers around a template tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterPair {
    pub open: String,
    pub close: String,
}

impl DelimiterPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

impl Default for DelimiterPair {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN, DEFAULT_CLOSE)
    }
}

impl From<(&str, &str)> for DelimiterPair {
    fn from((open, close): (&str, &str)) -> Self {
        Self::new(open, close)
    }
}

impl From<[&str; 2]> for DelimiterPair {
    fn from([open, close]: [&str; 2]) -> Self {
        Self::new(open, close)
    }
}

/// Flags handed to the delimiter generator together with the pair.
///
/// An empty `body` selects the lazy any-character body. `prefix` and `suffix`
/// are regex fragments matched right after the opening marker (and its tag
/// sigil) and right before the closing marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterFlags {
    pub body: String,
    pub prefix: String,
    pub suffix: String,
    /// Regex flag letters, JavaScript style (`g`, `i`, `m`, `s`, `x`, `u`).
    pub regex_flags: String,
    /// Build the body group as non-capturing.
    pub noncapture: bool,
    /// Escape regex metacharacters in the markers.
    pub escape: bool,
}

impl Default for DelimiterFlags {
    fn default() -> Self {
        Self {
            body: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            regex_flags: "g".to_string(),
            noncapture: false,
            escape: true,
        }
    }
}

impl DelimiterFlags {
    /// Returns these flags with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &FlagOverrides) -> Self {
        Self {
            body: overrides.body.clone().unwrap_or_else(|| self.body.clone()),
            prefix: overrides.prefix.clone().unwrap_or_else(|| self.prefix.clone()),
            suffix: overrides.suffix.clone().unwrap_or_else(|| self.suffix.clone()),
            regex_flags: overrides
                .regex_flags
                .clone()
                .unwrap_or_else(|| self.regex_flags.clone()),
            noncapture: overrides.noncapture.unwrap_or(self.noncapture),
            escape: overrides.escape.unwrap_or(self.escape),
        }
    }
}

/// Per-call replacements for [`DelimiterFlags`] fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub body: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub regex_flags: Option<String>,
    pub noncapture: Option<bool>,
    pub escape: Option<bool>,
}

/// The configuration of a cache instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Base directory for relative file targets and glob patterns.
    pub cwd: PathBuf,
    pub delims: DelimiterPair,
    pub flags: DelimiterFlags,
    /// Caller context handed to every render call.
    pub data: Map<String, Value>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            delims: DelimiterPair::default(),
            flags: DelimiterFlags::default(),
            data: Map::new(),
        }
    }
}

impl Options {
    /// Shallow-merges `overrides` over these options and returns the result.
    pub fn merge(&self, overrides: &Overrides) -> Options {
        let mut data = self.data.clone();
        for (key, value) in &overrides.data {
            data.insert(key.clone(), value.clone());
        }

        Options {
            cwd: overrides.cwd.clone().unwrap_or_else(|| self.cwd.clone()),
            delims: overrides
                .delims
                .clone()
                .unwrap_or_else(|| self.delims.clone()),
            flags: self.flags.merge(&overrides.flags),
            data,
        }
    }

    /// Builds the object a compiled template is rendered against.
    ///
    /// The working directory and delimiter pair are folded in as `cwd` and
    /// `delims`; data keys with the same names take precedence.
    pub fn context(&self) -> Value {
        let mut context = Map::new();
        context.insert(
            "cwd".to_string(),
            Value::String(self.cwd.to_string_lossy().into_owned()),
        );
        context.insert(
            "delims".to_string(),
            Value::Array(vec![
                Value::String(self.delims.open.clone()),
                Value::String(self.delims.close.clone()),
            ]),
        );
        for (key, value) in &self.data {
            context.insert(key.clone(), value.clone());
        }
        Value::Object(context)
    }
}

/// A per-call options bag.
///
/// Unset fields leave the instance configuration untouched when merged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub cwd: Option<PathBuf>,
    pub delims: Option<DelimiterPair>,
    pub flags: FlagOverrides,
    pub data: Map<String, Value>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn delims(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delims = Some(DelimiterPair::new(open, close));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.flags.body = Some(body.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.flags.prefix = Some(prefix.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.flags.suffix = Some(suffix.into());
        self
    }

    pub fn regex_flags(mut self, flags: impl Into<String>) -> Self {
        self.flags.regex_flags = Some(flags.into());
        self
    }

    pub fn noncapture(mut self, noncapture: bool) -> Self {
        self.flags.noncapture = Some(noncapture);
        self
    }

    pub fn escape(mut self, escape: bool) -> Self {
        self.flags.escape = Some(escape);
        self
    }

    /// Sets one context value.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Merges the fields of a serializable struct or map into the context data.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Options`] if `data` does not serialize to an object.
    pub fn data<T: Serialize + ?Sized>(mut self, data: &T) -> Result<Self, CacheError> {
        match serde_json::to_value(data)? {
            Value::Object(map) => {
                self.data.extend(map);
                Ok(self)
            }
            other => Err(CacheError::Options(format!(
                "context data must be an object, got {}",
                json_type(&other)
            ))),
        }
    }

    /// Layers `later` over `self`; fields set in `later` win.
    pub fn extend(mut self, later: Overrides) -> Self {
        if later.cwd.is_some() {
            self.cwd = later.cwd;
        }
        if later.delims.is_some() {
            self.delims = later.delims;
        }
        let flags = later.flags;
        if flags.body.is_some() {
            self.flags.body = flags.body;
        }
        if flags.prefix.is_some() {
            self.flags.prefix = flags.prefix;
        }
        if flags.suffix.is_some() {
            self.flags.suffix = flags.suffix;
        }
        if flags.regex_flags.is_some() {
            self.flags.regex_flags = flags.regex_flags;
        }
        if flags.noncapture.is_some() {
            self.flags.noncapture = flags.noncapture;
        }
        if flags.escape.is_some() {
            self.flags.escape = flags.escape;
        }
        self.data.extend(later.data);
        self
    }

    /// True when merging these overrides changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == Overrides::default()
    }

    /// Parses a flat options object.
    ///
    /// Recognized keys: `cwd`, `delims` (`["open", "close"]` or
    /// `{"open": .., "close": ..}`), `body`, `prefix` (alias `beginning`),
    /// `suffix` (alias `end`), `flags`, `noncapture` and `escape`. Every other
    /// key becomes context data.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Options`] if `value` is not an object or a
    /// recognized key has the wrong type.
    pub fn from_json(value: Value) -> Result<Self, CacheError> {
        let map = match value {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            other => {
                return Err(CacheError::Options(format!(
                    "expected an options object, got {}",
                    json_type(&other)
                )))
            }
        };

        let mut overrides = Overrides::default();
        for (key, value) in map {
            match key.as_str() {
                "cwd" => overrides.cwd = Some(PathBuf::from(expect_string(&key, value)?)),
                "delims" => overrides.delims = Some(parse_delims(value)?),
                "body" => overrides.flags.body = Some(expect_string(&key, value)?),
                "prefix" | "beginning" => {
                    overrides.flags.prefix = Some(expect_string(&key, value)?)
                }
                "suffix" | "end" => overrides.flags.suffix = Some(expect_string(&key, value)?),
                "flags" => overrides.flags.regex_flags = Some(expect_string(&key, value)?),
                "noncapture" => overrides.flags.noncapture = Some(expect_bool(&key, value)?),
                "escape" => overrides.flags.escape = Some(expect_bool(&key, value)?),
                _ => {
                    overrides.data.insert(key, value);
                }
            }
        }
        Ok(overrides)
    }

    /// Parses a flat options object from YAML (or JSON) text.
    ///
    /// See [`Overrides::from_json`] for the recognized keys.
    pub fn from_yaml(source: &str) -> Result<Self, CacheError> {
        let value: Value = serde_yaml::from_str(source)?;
        Self::from_json(value)
    }
}

fn parse_delims(value: Value) -> Result<DelimiterPair, CacheError> {
    match value {
        Value::Array(items) if items.len() == 2 => {
            let mut items = items.into_iter();
            let open = items.next().unwrap_or(Value::Null);
            let close = items.next().unwrap_or(Value::Null);
            Ok(DelimiterPair::new(
                expect_string("delims[0]", open)?,
                expect_string("delims[1]", close)?,
            ))
        }
        Value::Object(_) => serde_json::from_value(value)
            .map_err(|e| CacheError::Options(format!("delims: {}", e))),
        other => Err(CacheError::Options(format!(
            "delims must be a pair of strings, got {}",
            json_type(&other)
        ))),
    }
}

fn expect_string(key: &str, value: Value) -> Result<String, CacheError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(CacheError::Options(format!(
            "{} must be a string, got {}",
            key,
            json_type(&other)
        ))),
    }
}

fn expect_bool(key: &str, value: Value) -> Result<bool, CacheError> {
    match value {
        Value::Bool(b) => Ok(b),
        other => Err(CacheError::Options(format!(
            "{} must be a boolean, got {}",
            key,
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
