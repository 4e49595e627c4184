//! `{{%PRAGMA}}` directives.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::pattern::{Delimiters, PatternCache, PatternKind};

/// Renames the key that wraps scalar list elements (default `.`).
pub const IMPLICIT_ITERATOR: &str = "IMPLICIT-ITERATOR";

const SUPPORTED_PRAGMAS: &[&str] = &[IMPLICIT_ITERATOR];

/// Pragmas declared during one render, with their options.
#[derive(Debug, Clone, Default)]
pub struct PragmaTable {
    pragmas: HashMap<String, HashMap<String, String>>,
}

impl PragmaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self, pragma: &str) -> bool {
        self.pragmas.contains_key(pragma)
    }

    pub fn option(&self, pragma: &str, key: &str) -> Option<&str> {
        self.pragmas
            .get(pragma)
            .and_then(|options| options.get(key))
            .map(String::as_str)
    }

    /// Iterator key set by `{{%IMPLICIT-ITERATOR iterator=name}}`.
    pub fn implicit_iterator(&self) -> Option<&str> {
        self.option(IMPLICIT_ITERATOR, "iterator")
    }

    fn enable(&mut self, pragma: &str, option: Option<(&str, &str)>) -> TemplateResult<()> {
        if !SUPPORTED_PRAGMAS.contains(&pragma) {
            return Err(TemplateError::UnknownPragma(pragma.to_string()));
        }
        let options = self.pragmas.entry(pragma.to_string()).or_default();
        if let Some((key, value)) = option {
            options.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Record every pragma tag in `template` and strip it from the text.
///
/// Templates without `<open>%` are returned as-is.
pub fn apply_pragmas<'t>(
    template: &'t str,
    delimiters: &Delimiters,
    patterns: &PatternCache,
    table: &mut PragmaTable,
) -> TemplateResult<Cow<'t, str>> {
    if !template.contains(&format!("{}%", delimiters.open)) {
        return Ok(Cow::Borrowed(template));
    }

    let pattern = patterns.get(delimiters, PatternKind::Pragma)?;
    let mut stripped = String::with_capacity(template.len());
    let mut last = 0;

    for caps in pattern.captures_iter(template) {
        let (Some(tag), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let option = caps
            .get(2)
            .and_then(|opt| opt.as_str().split_once('='));

        debug!(pragma = name.as_str(), ?option, "Applying pragma");
        table.enable(name.as_str(), option)?;

        stripped.push_str(&template[last..tag.start()]);
        last = tag.end();
    }
    stripped.push_str(&template[last..]);

    Ok(Cow::Owned(stripped))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(template: &str) -> TemplateResult<(String, PragmaTable)> {
        let mut table = PragmaTable::new();
        let output = apply_pragmas(
            template,
            &Delimiters::default(),
            &PatternCache::new(),
            &mut table,
        )?;
        Ok((output.into_owned(), table))
    }

    #[test]
    fn test_no_pragmas_is_borrowed() {
        let mut table = PragmaTable::new();
        let output = apply_pragmas(
            "plain {{text}}",
            &Delimiters::default(),
            &PatternCache::new(),
            &mut table,
        )
        .unwrap();
        assert!(matches!(output, Cow::Borrowed("plain {{text}}")));
    }

    #[test]
    fn test_implicit_iterator_option() {
        let (output, table) = apply("a{{%IMPLICIT-ITERATOR iterator=bob}}b").unwrap();
        assert_eq!(output, "ab");
        assert!(table.is_enabled(IMPLICIT_ITERATOR));
        assert_eq!(table.implicit_iterator(), Some("bob"));
    }

    #[test]
    fn test_pragma_without_option() {
        let (output, table) = apply("{{%IMPLICIT-ITERATOR}}x").unwrap();
        assert_eq!(output, "x");
        assert!(table.is_enabled(IMPLICIT_ITERATOR));
        assert_eq!(table.implicit_iterator(), None);
    }

    #[test]
    fn test_unknown_pragma() {
        let err = apply("{{%FOO}}").unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPragma(ref name) if name == "FOO"));
    }
}
