//! Named unary transforms, addressable from the shorthand grammar.

use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A transform applied to one value: a shorthand filter, or one stage of
/// a refine pipeline.
pub type ItemFilter<E> = Arc<dyn Fn(Value<E>) -> Value<E> + Send + Sync>;

/// A transform applied to a whole projected sequence, one stage of a
/// selection pipeline.
pub type SeqFilter<E> = Arc<dyn Fn(Vec<Value<E>>) -> Vec<Value<E>> + Send + Sync>;

/// Name → transform lookup used when parsing shorthand targets.
///
/// The registry is plain data carried by the scraper, never process-wide
/// state; two scrapers with different filter sets cannot interfere.
/// Lookup is exact-name; an unknown name is resolved by the shorthand
/// parser to a no-op rather than an error.
pub struct FilterRegistry<E> {
    filters: HashMap<String, ItemFilter<E>>,
}

impl<E: 'static> FilterRegistry<E> {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(Value<E>) -> Value<E> + Send + Sync + 'static,
    ) {
        self.filters.insert(name.into(), Arc::new(filter));
    }

    pub fn get(&self, name: &str) -> Option<ItemFilter<E>> {
        self.filters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }
}

impl<E: 'static> Default for FilterRegistry<E> {
    /// A registry with the built-in text filters: `trim`, `lowercase`,
    /// `uppercase`. Non-string values pass through unchanged.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("trim", |v| map_str(v, |s| s.trim().to_string()));
        registry.register("lowercase", |v| map_str(v, |s| s.to_lowercase()));
        registry.register("uppercase", |v| map_str(v, |s| s.to_uppercase()));
        registry
    }
}

impl<E> Clone for FilterRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
        }
    }
}

impl<E> fmt::Debug for FilterRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_tuple("FilterRegistry").field(&names).finish()
    }
}

fn map_str<E>(value: Value<E>, f: impl FnOnce(&str) -> String) -> Value<E> {
    match value {
        Value::String(s) => Value::String(f(&s)),
        other => other,
    }
}
