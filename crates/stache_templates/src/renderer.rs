//! Template rendering.
//!
//! A [`RenderState`] lives for exactly one top-level render. It owns the
//! pragma table and the nesting depth, so nothing leaks between independent
//! renders even when they share an [`Engine`].

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use tracing::{debug, trace};

use crate::context::{create_context, find};
use crate::engine::Engine;
use crate::error::{TemplateError, TemplateResult};
use crate::escape::escape_html;
use crate::parser::{self, Node, Section};
use crate::pattern::Delimiters;
use crate::pragma::{apply_pragmas, PragmaTable};
use crate::value::Value;

/// Partial name to template source.
pub type Partials = HashMap<String, String>;

/// Render callback handed to section lambdas.
pub struct SectionRender<'r> {
    state: &'r RenderState<'r>,
    local: &'r Value,
    delimiters: &'r Delimiters,
}

impl SectionRender<'_> {
    /// Render `text` against the context the section was resolved in.
    pub fn render(&self, text: &str) -> TemplateResult<String> {
        let mut out = String::new();
        self.state
            .render_template(text, self.local, self.delimiters, &mut out)?;
        Ok(out)
    }

    /// The local context of the section.
    pub fn context(&self) -> &Value {
        self.local
    }
}

pub(crate) struct RenderState<'a> {
    engine: &'a Engine,
    root: &'a Value,
    partials: &'a Partials,
    pragmas: RefCell<PragmaTable>,
    depth: Cell<usize>,
}

/// Decrements the nesting depth when dropped.
struct DepthGuard<'s> {
    depth: &'s Cell<usize>,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl<'a> RenderState<'a> {
    pub(crate) fn new(engine: &'a Engine, root: &'a Value, partials: &'a Partials) -> Self {
        Self {
            engine,
            root,
            partials,
            pragmas: RefCell::new(PragmaTable::new()),
            depth: Cell::new(0),
        }
    }

    fn enter(&self) -> TemplateResult<DepthGuard<'_>> {
        let limit = self.engine.options().max_depth;
        let depth = self.depth.get() + 1;
        if depth > limit {
            return Err(TemplateError::RecursionLimit { limit });
        }
        self.depth.set(depth);
        Ok(DepthGuard { depth: &self.depth })
    }

    /// Render the top-level template, handing each finished chunk to `emit`.
    pub(crate) fn render_root(
        &self,
        template: &str,
        emit: &mut dyn FnMut(&str),
    ) -> TemplateResult<()> {
        let delimiters = &self.engine.options().delimiters;
        delimiters.validate()?;

        if !template.contains(delimiters.open.as_str()) {
            emit(template);
            return Ok(());
        }

        let _guard = self.enter()?;
        let template = self.preprocess(template, delimiters)?;
        let nodes = self.parse(&template, delimiters)?;

        let mut chunk = String::new();
        for node in &nodes {
            chunk.clear();
            self.render_nodes(std::slice::from_ref(node), self.root, &mut chunk)?;
            emit(&chunk);
        }
        Ok(())
    }

    /// Render a nested template string: a partial or a lambda's text.
    fn render_template(
        &self,
        template: &str,
        local: &Value,
        delimiters: &Delimiters,
        out: &mut String,
    ) -> TemplateResult<()> {
        if !template.contains(delimiters.open.as_str()) {
            out.push_str(template);
            return Ok(());
        }

        let _guard = self.enter()?;
        let template = self.preprocess(template, delimiters)?;
        let nodes = self.parse(&template, delimiters)?;
        self.render_nodes(&nodes, local, out)
    }

    fn preprocess<'t>(
        &self,
        template: &'t str,
        delimiters: &Delimiters,
    ) -> TemplateResult<Cow<'t, str>> {
        let mut pragmas = self.pragmas.borrow_mut();
        apply_pragmas(template, delimiters, self.engine.patterns(), &mut pragmas)
    }

    fn parse<'t>(&self, template: &'t str, delimiters: &Delimiters) -> TemplateResult<Vec<Node<'t>>> {
        let tokens = parser::tokenize(template, delimiters, self.engine.patterns())?;
        parser::parse(template, tokens, self.engine.options().strict_sections)
    }

    fn render_nodes(&self, nodes: &[Node<'_>], local: &Value, out: &mut String) -> TemplateResult<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable { name, escape } => {
                    let text = find(name, local, self.root).to_text();
                    if *escape {
                        out.push_str(&escape_html(&text));
                    } else {
                        out.push_str(&text);
                    }
                }
                Node::Partial { name, delimiters } => {
                    self.render_partial(name, local, delimiters, out)?;
                }
                Node::Section(section) => self.render_section(section, local, out)?,
            }
        }
        Ok(())
    }

    fn render_partial(
        &self,
        name: &str,
        local: &Value,
        delimiters: &Delimiters,
        out: &mut String,
    ) -> TemplateResult<()> {
        let template = self
            .partials
            .get(name)
            .ok_or_else(|| TemplateError::UnknownPartial(name.to_string()))?;
        debug!(partial = name, "Rendering partial");

        match local.get(name) {
            Some(scope @ Value::Map(_)) => self.render_template(template, scope, delimiters, out),
            _ => self.render_template(template, local, delimiters, out),
        }
    }

    fn render_section(&self, section: &Section<'_>, local: &Value, out: &mut String) -> TemplateResult<()> {
        let _guard = self.enter()?;
        let value = find(section.name, local, self.root);
        trace!(
            section = section.name,
            inverted = section.inverted,
            value = ?value,
            "Resolving section"
        );

        if section.inverted {
            if !value.is_present() {
                self.render_nodes(&section.children, local, out)?;
            }
            return Ok(());
        }

        match value.as_ref() {
            Value::List(items) => {
                let iterator = self.implicit_iterator();
                for item in items {
                    let scope = create_context(item, &iterator);
                    self.render_nodes(&section.children, &scope, out)?;
                }
            }
            scope @ Value::Map(_) => self.render_nodes(&section.children, scope, out)?,
            Value::Lambda(f) => {
                let render = SectionRender {
                    state: self,
                    local,
                    delimiters: &section.delimiters,
                };
                out.push_str(&f(section.raw, &render)?);
            }
            other if other.is_present() => self.render_nodes(&section.children, local, out)?,
            _ => {}
        }
        Ok(())
    }

    fn implicit_iterator(&self) -> String {
        self.pragmas
            .borrow()
            .implicit_iterator()
            .unwrap_or(&self.engine.options().implicit_iterator)
            .to_string()
    }
}

/// Receives rendered output one complete line at a time.
pub trait OutputSink {
    fn send(&mut self, line: &str);
}

impl<F: FnMut(&str)> OutputSink for F {
    fn send(&mut self, line: &str) {
        self(line)
    }
}

impl OutputSink for Vec<String> {
    fn send(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Buffers rendered chunks and emits complete lines.
pub(crate) struct LineWriter<'s, S: OutputSink + ?Sized> {
    pending: String,
    sink: &'s mut S,
}

impl<'s, S: OutputSink + ?Sized> LineWriter<'s, S> {
    pub(crate) fn new(sink: &'s mut S) -> Self {
        Self {
            pending: String::new(),
            sink,
        }
    }

    pub(crate) fn write(&mut self, chunk: &str) {
        let mut rest = chunk;
        while let Some(newline) = rest.find('\n') {
            if self.pending.is_empty() {
                self.sink.send(&rest[..newline]);
            } else {
                self.pending.push_str(&rest[..newline]);
                self.sink.send(&self.pending);
                self.pending.clear();
            }
            rest = &rest[newline + 1..];
        }
        self.pending.push_str(rest);
    }

    /// Emit the last line, even when empty, so the lines joined with `\n`
    /// equal the rendered string.
    pub(crate) fn finish(self) {
        self.sink.send(&self.pending);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(chunks: &[&str]) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        let mut writer = LineWriter::new(&mut lines);
        for chunk in chunks {
            writer.write(chunk);
        }
        writer.finish();
        lines
    }

    #[test]
    fn test_line_writer_joins_chunks() {
        assert_eq!(lines(&["a", "b\nc", "\n", "d"]), vec!["ab", "c", "d"]);
    }

    #[test]
    fn test_line_writer_trailing_newline() {
        assert_eq!(lines(&["a\n"]), vec!["a", ""]);
        assert_eq!(lines(&[]), vec![""]);
    }

    #[test]
    fn test_closure_sink() {
        let mut count = 0;
        let mut sink = |_: &str| count += 1;
        let mut writer = LineWriter::new(&mut sink);
        writer.write("a\nb\n");
        writer.finish();
        assert_eq!(count, 3);
    }
}
