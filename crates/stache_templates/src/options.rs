//! Renderer configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TemplateResult;
use crate::pattern::Delimiters;

/// Default nesting limit for sections, partials and lambda re-renders.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Options shared by every render of an [`Engine`](crate::Engine).
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// max_depth = 16
/// strict_sections = true
///
/// [delimiters]
/// open = "<%"
/// close = "%>"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Delimiters each top-level render starts with.
    pub delimiters: Delimiters,
    /// Key wrapping scalar list elements when no pragma renames it.
    pub implicit_iterator: String,
    /// Maximum nesting of sections, partials and lambda re-renders.
    pub max_depth: usize,
    /// Reject unbalanced section tags instead of rendering them literally.
    pub strict_sections: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            implicit_iterator: ".".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            strict_sections: false,
        }
    }
}

impl RenderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> TemplateResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Load options from a TOML file.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        debug!("Loading render options from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn with_delimiters(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.delimiters = Delimiters::new(open, close);
        self
    }

    pub fn with_implicit_iterator(mut self, key: impl Into<String>) -> Self {
        self.implicit_iterator = key.into();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_sections = strict;
        self
    }
}
