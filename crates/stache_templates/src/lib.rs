//! # stache_templates
//!
//! Logic-less, mustache-style template rendering.
//!
//! A template mixes literal text with tags. The renderer substitutes,
//! iterates or conditionally includes fragments from a view [`Value`], and
//! never evaluates expressions:
//!
//! - `{{name}}` / `{{{name}}}`: escaped / raw variables
//! - `{{#name}}...{{/name}}`: sections over lists, mappings, lambdas or flags
//! - `{{^name}}...{{/name}}`: inverted sections
//! - `{{>name}}`: partials
//! - `{{! comment }}`, `{{=<% %>=}}`, `{{%IMPLICIT-ITERATOR iterator=it}}`
//!
//! ## Example
//!
//! ```rust
//! use stache_templates::{Engine, Partials, RenderOptions, Value};
//! use serde_json::json;
//!
//! let engine = Engine::new(RenderOptions::default());
//! let view = Value::from(json!({
//!     "city": "Haifa",
//!     "people": [{"name": "Ada"}, {"name": "Bo", "city": "Acre"}],
//! }));
//!
//! let mut partials = Partials::new();
//! partials.insert("person".into(), "{{name}} ({{city}})".into());
//!
//! let html = engine
//!     .render("{{#people}}{{>person}};{{/people}}", &view, &partials)
//!     .unwrap();
//! assert_eq!(html, "Ada (Haifa);Bo (Acre);");
//! ```

mod context;
pub mod engine;
pub mod error;
pub mod escape;
pub mod loader;
pub mod options;
mod parser;
pub mod pattern;
pub mod pragma;
pub mod renderer;
pub mod value;

pub use engine::{render, Engine};
pub use error::{TemplateError, TemplateResult};
pub use escape::escape_html;
pub use loader::PartialsLoader;
pub use options::RenderOptions;
pub use pattern::Delimiters;
pub use pragma::{PragmaTable, IMPLICIT_ITERATOR};
pub use renderer::{OutputSink, Partials, SectionRender};
pub use value::{Map, Value};
