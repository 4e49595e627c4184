//! Tag delimiters and the compiled pattern cache.

use std::collections::HashMap;
use std::sync::Mutex;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{TemplateError, TemplateResult};

/// Open/close tag delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delimiters {
    pub open: String,
    pub close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("{{", "}}")
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    /// Parse the body of a set-delimiters tag, e.g. `<% %>`.
    pub(crate) fn parse(body: &str) -> Option<Self> {
        let mut parts = body.split_whitespace();
        let open = parts.next()?;
        let close = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(open, close))
    }

    /// Delimiters must be non-empty and free of whitespace.
    pub fn validate(&self) -> TemplateResult<()> {
        let valid = |d: &str| !d.is_empty() && !d.chars().any(char::is_whitespace);
        if valid(&self.open) && valid(&self.close) {
            Ok(())
        } else {
            Err(TemplateError::InvalidDelimiters {
                open: self.open.clone(),
                close: self.close.clone(),
            })
        }
    }
}

/// Which matcher to build for a delimiter pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `<open>%NAME key=value<close>`
    Pragma,
    /// Any single-line tag. Captures the tag body and the repeated trailing
    /// close character swallowed after triple mustaches.
    Tag,
}

impl PatternKind {
    fn source(self, delimiters: &Delimiters) -> String {
        let open = regex::escape(&delimiters.open);
        let close = regex::escape(&delimiters.close);
        match self {
            Self::Pragma => format!(r"{open}%([\w-]+) ?(\w+=\w+)?{close}"),
            Self::Tag => {
                let last = delimiters
                    .close
                    .chars()
                    .last()
                    .map(|c| regex::escape(&c.to_string()))
                    .unwrap_or_default();
                format!(r"{open}([^\n]*?){close}((?:{last})*)")
            }
        }
    }
}

/// Compiled patterns keyed by delimiter pair and kind.
///
/// Shared by every render of an [`Engine`](crate::Engine); compiled regexes
/// are cheap to clone.
#[derive(Debug, Default)]
pub struct PatternCache {
    patterns: Mutex<HashMap<(Delimiters, PatternKind), Regex>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the pattern for `delimiters`, compiling it on first use.
    pub fn get(&self, delimiters: &Delimiters, kind: PatternKind) -> TemplateResult<Regex> {
        let key = (delimiters.clone(), kind);
        let mut patterns = self.patterns.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(regex) = patterns.get(&key) {
            return Ok(regex.clone());
        }

        trace!(
            open = %delimiters.open,
            close = %delimiters.close,
            ?kind,
            "Compiling tag pattern"
        );
        let regex = Regex::new(&kind.source(delimiters))?;
        patterns.insert(key, regex.clone());
        Ok(regex)
    }

    /// Number of compiled patterns.
    pub fn len(&self) -> usize {
        self.patterns.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiters() {
        assert_eq!(Delimiters::parse("<% %>"), Some(Delimiters::new("<%", "%>")));
        assert_eq!(Delimiters::parse("  | |  "), Some(Delimiters::new("|", "|")));
        assert_eq!(Delimiters::parse("<%"), None);
        assert_eq!(Delimiters::parse("a b c"), None);
    }

    #[test]
    fn test_validate() {
        assert!(Delimiters::default().validate().is_ok());
        assert!(Delimiters::new("", "}}").validate().is_err());
        assert!(Delimiters::new("{ {", "}}").validate().is_err());
    }

    #[test]
    fn test_metacharacters_are_escaped() {
        let cache = PatternCache::new();
        let regex = cache
            .get(&Delimiters::new("(*", "*)"), PatternKind::Tag)
            .unwrap();
        let caps = regex.captures("x (*name*) y").unwrap();
        assert_eq!(&caps[1], "name");
    }

    #[test]
    fn test_cache_reuses_patterns() {
        let cache = PatternCache::new();
        let delimiters = Delimiters::default();
        cache.get(&delimiters, PatternKind::Tag).unwrap();
        cache.get(&delimiters, PatternKind::Tag).unwrap();
        cache.get(&delimiters, PatternKind::Pragma).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_tag_swallows_trailing_close_characters() {
        let cache = PatternCache::new();
        let regex = cache.get(&Delimiters::default(), PatternKind::Tag).unwrap();
        let caps = regex.captures("{{{raw}}}").unwrap();
        assert_eq!(&caps[1], "{raw");
        assert_eq!(&caps[2], "}");
    }
}
