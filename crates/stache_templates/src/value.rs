//! View data handed to the renderer.
//!
//! A [`Value`] is a JSON-shaped tree with two extra variants for callables:
//! [`Value::Computed`] (a property evaluated on every lookup) and
//! [`Value::Lambda`] (a higher-order section that receives the raw section
//! body and decides how to render it).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::error::TemplateResult;
use crate::renderer::SectionRender;

/// Mapping from variable name to value.
pub type Map = HashMap<String, Value>;

/// A computed property. Receives the local context it was looked up from.
pub type ComputedFn = dyn Fn(&Value) -> Value + Send + Sync;

/// A higher-order section callback. Receives the unrendered section body and
/// a render callback bound to the current context.
pub type LambdaFn = dyn Fn(&str, &SectionRender<'_>) -> TemplateResult<String> + Send + Sync;

/// A value in a render context.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Map(Map),
    Computed(Arc<ComputedFn>),
    Lambda(Arc<LambdaFn>),
}

impl Value {
    /// Create an empty mapping.
    pub fn map() -> Self {
        Self::Map(Map::new())
    }

    /// Create a computed property.
    pub fn computed(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self::Computed(Arc::new(f))
    }

    /// Create a higher-order section.
    pub fn lambda(
        f: impl Fn(&str, &SectionRender<'_>) -> TemplateResult<String> + Send + Sync + 'static,
    ) -> Self {
        Self::Lambda(Arc::new(f))
    }

    /// Insert a key into a mapping, turning a non-mapping value into one.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !matches!(self, Self::Map(_)) {
            self = Self::map();
        }
        if let Self::Map(map) = &mut self {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Convert any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> TemplateResult<Self> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Parse a JSON document.
    pub fn from_json_str(source: &str) -> TemplateResult<Self> {
        let json: serde_json::Value = serde_json::from_str(source)?;
        Ok(json.into())
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(source: &str) -> TemplateResult<Self> {
        let json: serde_json::Value = serde_yaml::from_str(source)?;
        Ok(json.into())
    }

    /// Look up a key if this value is a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Truthy, or exactly `false`, or exactly zero.
    ///
    /// Null and the empty string are the only values that fail this test.
    pub fn is_kinda_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// Whether a section over this value counts as present.
    ///
    /// Empty lists are absent even though they pass [`Value::is_kinda_truthy`].
    pub fn is_present(&self) -> bool {
        match self {
            Self::List(items) => !items.is_empty(),
            other => other.is_kinda_truthy(),
        }
    }

    /// Text inserted for this value by a variable tag.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null | Self::Map(_) | Self::Computed(_) | Self::Lambda(_) => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(n),
            Self::String(s) => s.clone(),
            Self::List(items) => items
                .iter()
                .map(Value::to_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

/// Integral floats print without a fraction, like `1` rather than `1.0`.
fn format_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::List(items) => f.debug_list().entries(items).finish(),
            Self::Map(map) => f.debug_map().entries(map).finish(),
            Self::Computed(_) => write!(f, "Computed(..)"),
            Self::Lambda(_) => write!(f, "Lambda(..)"),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Number(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        serde_json::Number::from_f64(n)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Map(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
