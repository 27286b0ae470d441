use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;

type RenderFn = dyn Fn(&serde_json::Value) -> Result<String, CacheError> + Send + Sync;

/// A compiled, immutable render function.
///
/// Cloning is cheap and yields a handle to the same function; use
/// [`same_as`](Self::same_as) to compare identity.
#[derive(Clone)]
pub struct CompiledTemplate {
    name: Arc<str>,
    render: Arc<RenderFn>,
}

impl CompiledTemplate {
    /// Wraps a render closure.
    pub fn new<F>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<String, CacheError> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            render: Arc::new(render),
        }
    }

    /// The name the template was compiled under (its path, or `<inline>`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the template against `context`.
    pub fn render(&self, context: &serde_json::Value) -> Result<String, CacheError> {
        (self.render)(context)
    }

    /// True when both handles point at the same compiled function.
    pub fn same_as(&self, other: &CompiledTemplate) -> bool {
        Arc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
