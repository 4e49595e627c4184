//! Error types for template rendering.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur while rendering or loading templates.
///
/// Unresolved variables and malformed tags are not errors: they render as
/// empty or literal text. Only configuration mismatches between a template
/// and its host (pragmas, partials, limits) fail a render.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Unknown pragma: {0}")]
    UnknownPragma(String),

    #[error("Unknown partial: {0}")]
    UnknownPartial(String),

    #[error("Unbalanced section tag: {name}")]
    UnbalancedSection { name: String },

    #[error("Template nesting exceeded the limit of {limit} levels")]
    RecursionLimit { limit: usize },

    #[error("Invalid delimiters '{open}' '{close}'")]
    InvalidDelimiters { open: String, close: String },

    #[error("Section lambda failed: {0}")]
    Lambda(String),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
