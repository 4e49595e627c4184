//! Tokenizer and section matcher.
//!
//! Tokenizing walks the template once, left to right, applying
//! set-delimiter tags as they are met. The token stream is then folded into a
//! tree by pairing each `{{/name}}` with the nearest open `{{#name}}` or
//! `{{^name}}`.
//!
//! Unbalanced tags are literal text unless strict mode is on:
//! - a closer with no open section of that name stays in the output as is;
//! - an opener that is never closed stays in the output and its would-be
//!   body renders as ordinary content;
//! - a closer for a section further down the stack closes it, and the
//!   unclosed openers in between become literal text.

use std::ops::Range;

use crate::error::{TemplateError, TemplateResult};
use crate::pattern::{Delimiters, PatternCache, PatternKind};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind<'t> {
    Text,
    Variable { name: &'t str, escape: bool },
    Partial { name: &'t str, delimiters: Delimiters },
    Open { name: &'t str, inverted: bool, delimiters: Delimiters },
    Close { name: &'t str },
}

/// A token and the byte range it covers in the template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token<'t> {
    pub kind: TokenKind<'t>,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Section<'t> {
    pub name: &'t str,
    pub inverted: bool,
    pub children: Vec<Node<'t>>,
    /// Unrendered body, handed to lambdas.
    pub raw: &'t str,
    /// Delimiters in effect at the opening tag.
    pub delimiters: Delimiters,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node<'t> {
    Text(&'t str),
    Variable { name: &'t str, escape: bool },
    Partial { name: &'t str, delimiters: Delimiters },
    Section(Section<'t>),
}

/// Split `template` into text and tag tokens.
///
/// Comments and set-delimiter tags produce no token. Candidate tags whose
/// body is not a valid name are left in the surrounding text.
pub(crate) fn tokenize<'t>(
    template: &'t str,
    delimiters: &Delimiters,
    patterns: &PatternCache,
) -> TemplateResult<Vec<Token<'t>>> {
    let mut delimiters = delimiters.clone();
    let mut pattern = patterns.get(&delimiters, PatternKind::Tag)?;
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while cursor < template.len() {
        let Some(caps) = pattern.captures_at(template, cursor) else {
            break;
        };
        let (Some(whole), Some(body), Some(trailing)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            break;
        };

        let tag = classify(body.as_str(), &delimiters);
        let (kind, end) = match tag {
            Tag::Literal => {
                // Retry from the next character so a real tag inside the
                // rejected span is still found.
                let skip = template[whole.start()..]
                    .chars()
                    .next()
                    .map_or(1, char::len_utf8);
                cursor = whole.start() + skip;
                continue;
            }
            Tag::Silent => (None, trailing.end()),
            Tag::SetDelimiters(next) => {
                pattern = patterns.get(&next, PatternKind::Tag)?;
                delimiters = next;
                (None, trailing.end())
            }
            Tag::Token(kind) if is_section_tag(&kind) => (Some(kind), trailing.start()),
            Tag::Token(kind) => (Some(kind), trailing.end()),
        };

        if text_start < whole.start() {
            tokens.push(Token {
                kind: TokenKind::Text,
                span: text_start..whole.start(),
            });
        }
        if let Some(kind) = kind {
            tokens.push(Token {
                kind,
                span: whole.start()..end,
            });
        }
        text_start = end;
        cursor = end;
    }

    if text_start < template.len() {
        tokens.push(Token {
            kind: TokenKind::Text,
            span: text_start..template.len(),
        });
    }

    Ok(tokens)
}

enum Tag<'t> {
    Token(TokenKind<'t>),
    SetDelimiters(Delimiters),
    Silent,
    Literal,
}

fn is_section_tag(kind: &TokenKind<'_>) -> bool {
    matches!(kind, TokenKind::Open { .. } | TokenKind::Close { .. })
}

fn classify<'t>(body: &'t str, delimiters: &Delimiters) -> Tag<'t> {
    let mut chars = body.chars();
    let Some(sigil) = chars.next() else {
        return Tag::Literal;
    };
    let rest = chars.as_str();

    match sigil {
        '#' | '^' => trimmed_name(rest).map_or(Tag::Literal, |name| {
            Tag::Token(TokenKind::Open {
                name,
                inverted: sigil == '^',
                delimiters: delimiters.clone(),
            })
        }),
        '/' => trimmed_name(rest).map_or(Tag::Literal, |name| Tag::Token(TokenKind::Close { name })),
        '!' => Tag::Silent,
        '=' => rest
            .strip_suffix('=')
            .and_then(Delimiters::parse)
            .map_or(Tag::Literal, Tag::SetDelimiters),
        '>' => trimmed_name(rest.strip_suffix('>').unwrap_or(rest)).map_or(Tag::Literal, |name| {
            Tag::Token(TokenKind::Partial {
                name,
                delimiters: delimiters.clone(),
            })
        }),
        '{' => tag_name(rest.strip_suffix('}').unwrap_or(rest)).map_or(Tag::Literal, |name| {
            Tag::Token(TokenKind::Variable {
                name,
                escape: false,
            })
        }),
        // Pragma-shaped tags that the preprocessor did not consume.
        '%' => tag_name(rest.strip_suffix('%').unwrap_or(rest)).map_or(Tag::Literal, |name| {
            Tag::Token(TokenKind::Variable { name, escape: true })
        }),
        _ => tag_name(body).map_or(Tag::Literal, |name| {
            Tag::Token(TokenKind::Variable { name, escape: true })
        }),
    }
}

/// Section and partial names: anything non-blank, trimmed.
fn trimmed_name(raw: &str) -> Option<&str> {
    let name = raw.trim();
    (!name.is_empty()).then_some(name)
}

/// Variable names are trimmed and may not contain `/`, `#` or `^`.
fn tag_name(raw: &str) -> Option<&str> {
    if raw.is_empty() || raw.contains(['/', '#', '^']) {
        return None;
    }
    Some(raw.trim())
}

struct Frame<'t> {
    name: &'t str,
    inverted: bool,
    delimiters: Delimiters,
    open: Range<usize>,
    /// End of the newlines dropped from the start of the body.
    body_start: usize,
    children: Vec<Node<'t>>,
}

impl<'t> Frame<'t> {
    /// Turn an unclosed frame back into literal text plus its content.
    fn into_literal(self, template: &'t str) -> Vec<Node<'t>> {
        let mut nodes = Vec::with_capacity(self.children.len() + 1);
        nodes.push(Node::Text(&template[self.open.start..self.body_start]));
        nodes.extend(self.children);
        nodes
    }
}

/// Fold tokens into a tree of nodes.
pub(crate) fn parse<'t>(
    template: &'t str,
    tokens: Vec<Token<'t>>,
    strict: bool,
) -> TemplateResult<Vec<Node<'t>>> {
    let mut root: Vec<Node<'t>> = Vec::new();
    let mut stack: Vec<Frame<'t>> = Vec::new();
    let mut last_close_end = None;

    for token in tokens {
        let follows_close = last_close_end == Some(token.span.start);
        last_close_end = None;

        match token.kind {
            TokenKind::Text => {
                let mut text = &template[token.span.clone()];
                if follows_close {
                    text = text.trim_start();
                }
                if let Some(frame) = stack.last_mut() {
                    if frame.children.is_empty() && frame.open.end == token.span.start {
                        let trimmed = text.trim_start_matches('\n');
                        frame.body_start += text.len() - trimmed.len();
                        text = trimmed;
                    }
                }
                if !text.is_empty() {
                    children(&mut stack, &mut root).push(Node::Text(text));
                }
            }
            TokenKind::Variable { name, escape } => {
                children(&mut stack, &mut root).push(Node::Variable { name, escape });
            }
            TokenKind::Partial { name, delimiters } => {
                children(&mut stack, &mut root).push(Node::Partial { name, delimiters });
            }
            TokenKind::Open {
                name,
                inverted,
                delimiters,
            } => stack.push(Frame {
                name,
                inverted,
                delimiters,
                body_start: token.span.end,
                open: token.span,
                children: Vec::new(),
            }),
            TokenKind::Close { name } => {
                let Some(index) = stack.iter().rposition(|frame| frame.name == name) else {
                    if strict {
                        return Err(TemplateError::UnbalancedSection {
                            name: name.to_string(),
                        });
                    }
                    children(&mut stack, &mut root).push(Node::Text(&template[token.span]));
                    continue;
                };

                while stack.len() > index + 1 {
                    let Some(unclosed) = stack.pop() else { break };
                    if strict {
                        return Err(TemplateError::UnbalancedSection {
                            name: unclosed.name.to_string(),
                        });
                    }
                    let literal = unclosed.into_literal(template);
                    children(&mut stack, &mut root).extend(literal);
                }

                let Some(frame) = stack.pop() else { continue };
                let section = Section {
                    name: frame.name,
                    inverted: frame.inverted,
                    raw: &template[frame.body_start.min(token.span.start)..token.span.start],
                    delimiters: frame.delimiters,
                    children: frame.children,
                };
                children(&mut stack, &mut root).push(Node::Section(section));
                last_close_end = Some(token.span.end);
            }
        }
    }

    while let Some(unclosed) = stack.pop() {
        if strict {
            return Err(TemplateError::UnbalancedSection {
                name: unclosed.name.to_string(),
            });
        }
        let literal = unclosed.into_literal(template);
        children(&mut stack, &mut root).extend(literal);
    }

    Ok(root)
}

fn children<'s, 't>(
    stack: &'s mut [Frame<'t>],
    root: &'s mut Vec<Node<'t>>,
) -> &'s mut Vec<Node<'t>> {
    match stack.last_mut() {
        Some(frame) => &mut frame.children,
        None => root,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(template: &str, strict: bool) -> TemplateResult<Vec<Node<'_>>> {
        let tokens = tokenize(template, &Delimiters::default(), &PatternCache::new())?;
        parse(template, tokens, strict)
    }

    #[test]
    fn test_plain_text() {
        let nodes = parse_str("no tags here", false).unwrap();
        assert_eq!(nodes, vec![Node::Text("no tags here")]);
    }

    #[test]
    fn test_variables() {
        let nodes = parse_str("a {{ x }} {{{y}}} {{z}}}", false).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("a "),
                Node::Variable { name: "x", escape: true },
                Node::Text(" "),
                Node::Variable { name: "y", escape: false },
                Node::Text(" "),
                Node::Variable { name: "z", escape: true },
            ]
        );
    }

    #[test]
    fn test_comments_and_delimiters_vanish() {
        let nodes = parse_str("a{{! note }}b{{=<% %>=}}c<%d%>{{e}}", false).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("a"),
                Node::Text("b"),
                Node::Text("c"),
                Node::Variable { name: "d", escape: true },
                Node::Text("{{e}}"),
            ]
        );
    }

    #[test]
    fn test_invalid_names_are_literal() {
        let nodes = parse_str("{{a/b}} {{}} {{c}}", false).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("{{a/b}} {{}} "),
                Node::Variable { name: "c", escape: true },
            ]
        );
    }

    #[test]
    fn test_nested_sections() {
        let nodes = parse_str("{{#a}}{{#a}}x{{/a}}{{/a}}", false).unwrap();
        let [Node::Section(outer)] = nodes.as_slice() else {
            panic!("expected one section, got {nodes:?}");
        };
        assert_eq!(outer.raw, "{{#a}}x{{/a}}");
        let [Node::Section(inner)] = outer.children.as_slice() else {
            panic!("expected nested section");
        };
        assert_eq!(inner.children, vec![Node::Text("x")]);
    }

    #[test]
    fn test_section_whitespace_trimming() {
        let nodes = parse_str("{{#a}}\n\nbody\n{{/a}}  \nafter", false).unwrap();
        let [Node::Section(section), Node::Text(after)] = nodes.as_slice() else {
            panic!("unexpected nodes {nodes:?}");
        };
        assert_eq!(section.children, vec![Node::Text("body\n")]);
        assert_eq!(section.raw, "body\n");
        assert_eq!(*after, "after");
    }

    #[test]
    fn test_unclosed_opener_is_literal() {
        let nodes = parse_str("{{#a}}\nx{{y}}", false).unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("{{#a}}\n"),
                Node::Text("x"),
                Node::Variable { name: "y", escape: true },
            ]
        );
    }

    #[test]
    fn test_stray_closer_is_literal() {
        let nodes = parse_str("x{{/a}}y", false).unwrap();
        assert_eq!(
            nodes,
            vec![Node::Text("x"), Node::Text("{{/a}}"), Node::Text("y")]
        );
    }

    #[test]
    fn test_interleaved_sections() {
        let nodes = parse_str("{{#a}}{{#b}}x{{/a}}{{/b}}", false).unwrap();
        let [Node::Section(a), Node::Text(stray)] = nodes.as_slice() else {
            panic!("unexpected nodes {nodes:?}");
        };
        assert_eq!(a.children, vec![Node::Text("{{#b}}"), Node::Text("x")]);
        assert_eq!(*stray, "{{/b}}");
    }

    #[test]
    fn test_strict_mode_rejects_unbalanced() {
        for template in ["{{#a}}x", "x{{/a}}", "{{#a}}{{#b}}{{/a}}{{/b}}"] {
            let err = parse_str(template, true).unwrap_err();
            assert!(
                matches!(err, TemplateError::UnbalancedSection { .. }),
                "{template} should be rejected"
            );
        }
        assert!(parse_str("{{#a}}{{^b}}{{/b}}{{/a}}", true).is_ok());
    }

    #[test]
    fn test_sections_record_delimiters() {
        let nodes = parse_str("{{=[ ]=}}[#a][>p][/a]", false).unwrap();
        let [Node::Section(section)] = nodes.as_slice() else {
            panic!("unexpected nodes {nodes:?}");
        };
        assert_eq!(section.delimiters, Delimiters::new("[", "]"));
        assert_eq!(
            section.children,
            vec![Node::Partial {
                name: "p",
                delimiters: Delimiters::new("[", "]"),
            }]
        );
    }
}
