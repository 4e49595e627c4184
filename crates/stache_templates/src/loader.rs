//! Partial loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{TemplateError, TemplateResult};
use crate::renderer::Partials;

/// File extensions picked up by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &["mustache", "stache", "html"];

/// Loads partial templates from a directory tree.
///
/// A file at `<root>/cards/book.mustache` becomes the partial `cards/book`.
pub struct PartialsLoader {
    partials_path: PathBuf,
    extensions: Vec<String>,
}

impl PartialsLoader {
    /// Create a new partials loader.
    pub fn new(partials_path: impl Into<PathBuf>) -> Self {
        Self {
            partials_path: partials_path.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Load every matching file under the partials directory.
    pub fn load_all(&self) -> TemplateResult<Partials> {
        let mut partials = Partials::new();

        if !self.partials_path.exists() {
            warn!("Partials directory does not exist: {:?}", self.partials_path);
            return Ok(partials);
        }

        for entry in WalkDir::new(&self.partials_path)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || !self.matches_extension(path) {
                continue;
            }
            let Some(name) = self.partial_name(path) else {
                continue;
            };

            match Self::load_template(path) {
                Ok(source) => {
                    debug!("Loaded partial: {} ({:?})", name, path);
                    partials.insert(name, source);
                }
                Err(e) => {
                    warn!("Failed to load partial from {:?}: {}", path, e);
                }
            }
        }

        info!(
            "Loaded {} partial(s) from {:?}",
            partials.len(),
            self.partials_path
        );
        Ok(partials)
    }

    /// Read a single template file.
    pub fn load_template(path: &Path) -> TemplateResult<String> {
        fs::read_to_string(path).map_err(TemplateError::from)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
    }

    /// Path relative to the root, without extension, `/`-separated.
    fn partial_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.partials_path).ok()?;
        let stem = relative.with_extension("");
        let parts: Vec<_> = stem
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        (!parts.is_empty()).then(|| parts.join("/"))
    }
}
