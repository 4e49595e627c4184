//! Render entry points.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::options::RenderOptions;
use crate::parser::{self, Node};
use crate::pattern::{Delimiters, PatternCache};
use crate::pragma::{apply_pragmas, PragmaTable};
use crate::renderer::{LineWriter, OutputSink, Partials, RenderState};
use crate::value::Value;

static DEFAULT_ENGINE: LazyLock<Engine> = LazyLock::new(Engine::default);

/// Render `template` with the default options.
///
/// ```rust
/// use stache_templates::{render, Partials, Value};
///
/// let view = Value::map().with("name", "World");
/// let html = render("Hello {{name}}!", &view, &Partials::new()).unwrap();
/// assert_eq!(html, "Hello World!");
/// ```
pub fn render(template: &str, view: &Value, partials: &Partials) -> TemplateResult<String> {
    DEFAULT_ENGINE.render(template, view, partials)
}

/// Renders templates with a fixed set of options.
///
/// An engine holds no per-render state and can be shared between threads;
/// every call builds its own delimiter and pragma state.
#[derive(Debug, Default)]
pub struct Engine {
    options: RenderOptions,
    patterns: PatternCache,
}

impl Engine {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            patterns: PatternCache::new(),
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub(crate) fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Render `template` against `view` into a string.
    pub fn render(&self, template: &str, view: &Value, partials: &Partials) -> TemplateResult<String> {
        debug!(len = template.len(), partials = partials.len(), "Rendering template");
        let mut output = String::with_capacity(template.len());
        RenderState::new(self, view, partials)
            .render_root(template, &mut |chunk| output.push_str(chunk))?;
        Ok(output)
    }

    /// Render `template`, sending each output line to `sink` as soon as it
    /// is complete.
    ///
    /// Lines joined with `\n` equal the output of [`Engine::render`]. Lines
    /// sent before an error are not retracted.
    pub fn render_to(
        &self,
        template: &str,
        view: &Value,
        partials: &Partials,
        sink: &mut impl OutputSink,
    ) -> TemplateResult<()> {
        debug!(len = template.len(), "Rendering template to line sink");
        let mut writer = LineWriter::new(sink);
        RenderState::new(self, view, partials)
            .render_root(template, &mut |chunk| writer.write(chunk))?;
        writer.finish();
        Ok(())
    }

    /// [`Engine::render_to`] with a closure as the sink.
    pub fn render_lines<F: FnMut(&str)>(
        &self,
        template: &str,
        view: &Value,
        partials: &Partials,
        mut send: F,
    ) -> TemplateResult<()> {
        self.render_to(template, view, partials, &mut send)
    }

    /// Check a template without rendering it.
    ///
    /// Sections must balance, pragmas must be known, and every partial
    /// referenced by the template (or by the partials it pulls in) must exist.
    pub fn check(&self, template: &str, partials: &Partials) -> TemplateResult<()> {
        self.options.delimiters.validate()?;
        let mut seen = HashSet::new();
        self.check_template(template, &self.options.delimiters, partials, &mut seen)
    }

    fn check_template(
        &self,
        template: &str,
        delimiters: &Delimiters,
        partials: &Partials,
        seen: &mut HashSet<String>,
    ) -> TemplateResult<()> {
        let template = apply_pragmas(template, delimiters, &self.patterns, &mut PragmaTable::new())?;
        let tokens = parser::tokenize(&template, delimiters, &self.patterns)?;
        let nodes = parser::parse(&template, tokens, true)?;

        let mut references = Vec::new();
        collect_partials(&nodes, &mut references);
        for (name, delimiters) in references {
            let source = partials
                .get(name)
                .ok_or_else(|| TemplateError::UnknownPartial(name.to_string()))?;
            if seen.insert(name.to_string()) {
                self.check_template(source, &delimiters, partials, seen)?;
            }
        }
        Ok(())
    }
}

fn collect_partials<'n, 't>(nodes: &'n [Node<'t>], found: &mut Vec<(&'t str, Delimiters)>) {
    for node in nodes {
        match node {
            Node::Partial { name, delimiters } => found.push((*name, delimiters.clone())),
            Node::Section(section) => collect_partials(&section.children, found),
            Node::Text(_) | Node::Variable { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
        assert_send_sync::<Value>();
    }

    #[test]
    fn test_patterns_cached_across_renders() {
        let engine = Engine::default();
        let view = Value::map().with("v", "x");
        engine.render("{{v}}", &view, &Partials::new()).unwrap();
        let compiled = engine.patterns().len();
        engine.render("{{v}} {{v}}", &view, &Partials::new()).unwrap();
        assert_eq!(engine.patterns().len(), compiled);
    }

    #[test]
    fn test_render_to_vec_sink() {
        let engine = Engine::default();
        let view = Value::map().with("x", "X");
        let mut lines: Vec<String> = Vec::new();
        engine
            .render_to("a\n\n{{x}}", &view, &Partials::new(), &mut lines)
            .unwrap();
        assert_eq!(lines, vec!["a", "", "X"]);
    }

    #[test]
    fn test_check_reports_missing_partial() {
        let engine = Engine::default();
        let err = engine
            .check("{{#a}}{{>missing}}{{/a}}", &Partials::new())
            .unwrap_err();
        assert!(matches!(err, TemplateError::UnknownPartial(ref n) if n == "missing"));
    }

    #[test]
    fn test_check_follows_partials_once() {
        let engine = Engine::default();
        let mut partials = Partials::new();
        partials.insert("tree".to_string(), "{{#children}}{{>tree}}{{/children}}".to_string());
        partials.insert("broken".to_string(), "{{#a}}".to_string());

        assert!(engine.check("{{>tree}}", &partials).is_ok());
        let err = engine.check("{{>broken}}", &partials).unwrap_err();
        assert!(matches!(err, TemplateError::UnbalancedSection { .. }));
    }
}
