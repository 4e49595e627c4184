//! Name resolution against the local and root contexts.

use std::borrow::Cow;

use crate::value::{Map, Value};

/// Resolve `name`: the local context first, then the root context.
///
/// Only one level of fallback exists; enclosing section contexts between the
/// two are not searched. Computed properties are invoked with the local
/// context on every lookup. Missing names resolve to the empty string.
pub(crate) fn find<'v>(name: &str, local: &'v Value, root: &'v Value) -> Cow<'v, Value> {
    let name = name.trim();
    let value = local
        .get(name)
        .filter(|v| v.is_kinda_truthy())
        .or_else(|| root.get(name).filter(|v| v.is_kinda_truthy()));

    match value {
        Some(Value::Computed(f)) => Cow::Owned(f(local)),
        Some(value) => Cow::Borrowed(value),
        None => Cow::Owned(Value::String(String::new())),
    }
}

/// Local context for one element of an iterated list.
///
/// Mappings are used as they are. Anything else is wrapped as
/// `{ <iterator>: element }` so `{{.}}` reaches it.
pub(crate) fn create_context<'v>(element: &'v Value, iterator: &str) -> Cow<'v, Value> {
    match element {
        Value::Map(_) => Cow::Borrowed(element),
        other => {
            let mut map = Map::with_capacity(1);
            map.insert(iterator.to_string(), other.clone());
            Cow::Owned(Value::Map(map))
        }
    }
}
