//! The declarative specification model: the typed node tree that mirrors
//! the shape of the desired output.
//!
//! A [`Target`] is built once, is immutable afterwards, holds no
//! per-evaluation state, and can be evaluated any number of times against
//! any number of documents. All builder methods consume and return the
//! node, so configuration happens strictly before evaluation.

use crate::driver::Projection;
use crate::filters::{ItemFilter, SeqFilter};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// How a selection resolves its matching context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionScope {
    /// Match under the ancestor scope `level` frames outward; level 0 is
    /// the immediately enclosing scope's current match. With no enclosing
    /// frame at that level, matching falls back to the whole document.
    Scoped(usize),
    /// Match against the whole document, ignoring enclosing scopes.
    Global,
}

impl Default for SelectionScope {
    fn default() -> Self {
        SelectionScope::Scoped(0)
    }
}

/// A half-open index range over matched elements, with JavaScript `slice`
/// semantics: negative indexes count from the end, bounds are clamped,
/// and a missing end runs to the end of the match list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceRange {
    pub start: isize,
    pub end: Option<isize>,
}

impl SliceRange {
    pub fn new(start: isize, end: Option<isize>) -> Self {
        Self { start, end }
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let len = items.len();
        let start = clamp_index(self.start, len);
        let end = self.end.map_or(len, |e| clamp_index(e, len));
        if start >= end {
            return Vec::new();
        }
        items
            .into_iter()
            .skip(start)
            .take(end - start)
            .collect()
    }
}

fn clamp_index(index: isize, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs())
    } else {
        (index as usize).min(len)
    }
}

/// A node that matches elements by selector and projects each match to a
/// value.
#[derive(Clone)]
pub struct Select<E> {
    pub(crate) selectors: String,
    pub(crate) scope: SelectionScope,
    pub(crate) slice: Option<SliceRange>,
    /// `None` means cardinality is inherited from the evaluation context.
    pub(crate) single: Option<bool>,
    pub(crate) projection: Projection,
    pub(crate) pipeline: Vec<SeqFilter<E>>,
}

impl<E> Select<E> {
    pub fn new(selectors: impl Into<String>) -> Self {
        Self {
            selectors: selectors.into(),
            scope: SelectionScope::default(),
            slice: None,
            single: None,
            projection: Projection::Text,
            pipeline: Vec::new(),
        }
    }

    pub fn single(mut self) -> Self {
        self.single = Some(true);
        self
    }

    pub fn multi(mut self) -> Self {
        self.single = Some(false);
        self
    }

    /// Keep only the first match and return it as a scalar.
    pub fn first(mut self) -> Self {
        self.slice = Some(SliceRange::new(0, Some(1)));
        self.single = Some(true);
        self
    }

    /// Keep only the last match and return it as a scalar.
    pub fn last(mut self) -> Self {
        self.slice = Some(SliceRange::new(-1, None));
        self.single = Some(true);
        self
    }

    /// Keep only the match at `index` and return it as a scalar.
    pub fn at(mut self, index: usize) -> Self {
        let index = index as isize;
        self.slice = Some(SliceRange::new(index, Some(index + 1)));
        self.single = Some(true);
        self
    }

    /// Keep matches in `[from, to)`, as a sequence.
    pub fn range(mut self, from: isize, to: isize) -> Self {
        self.slice = Some(SliceRange::new(from, Some(to)));
        self.single = Some(false);
        self
    }

    /// Keep matches from `from` onward, as a sequence.
    pub fn range_from(mut self, from: isize) -> Self {
        self.slice = Some(SliceRange::new(from, None));
        self.single = Some(false);
        self
    }

    /// All matches, as a sequence. Clears any slicing.
    pub fn all(mut self) -> Self {
        self.slice = None;
        self.single = Some(false);
        self
    }

    pub fn from_global(mut self) -> Self {
        self.scope = SelectionScope::Global;
        self
    }

    pub fn from_scope(mut self, parent_level: usize) -> Self {
        self.scope = SelectionScope::Scoped(parent_level);
        self
    }

    pub fn text(mut self) -> Self {
        self.projection = Projection::Text;
        self
    }

    pub fn raw(mut self) -> Self {
        self.projection = Projection::Raw;
        self
    }

    pub fn inner_html(mut self) -> Self {
        self.projection = Projection::InnerHtml;
        self
    }

    pub fn outer_html(mut self) -> Self {
        self.projection = Projection::OuterHtml;
        self
    }

    pub fn attr(mut self, attribute: impl Into<String>) -> Self {
        self.projection = Projection::Attribute(attribute.into());
        self
    }
}

impl<E: 'static> Select<E> {
    /// Appends a whole-sequence transform to the pipeline.
    pub fn transform(
        mut self,
        transform: impl Fn(Vec<Value<E>>) -> Vec<Value<E>> + Send + Sync + 'static,
    ) -> Self {
        self.pipeline.push(Arc::new(transform));
        self
    }

    /// Appends a per-item map stage.
    pub fn map_items(self, f: impl Fn(Value<E>) -> Value<E> + Send + Sync + 'static) -> Self {
        self.transform(move |items| items.into_iter().map(&f).collect())
    }

    /// Appends a per-item retain stage.
    pub fn filter_items(self, f: impl Fn(&Value<E>) -> bool + Send + Sync + 'static) -> Self {
        self.transform(move |mut items| {
            items.retain(&f);
            items
        })
    }

    /// Trims whitespace from every projected string.
    pub fn trim(self) -> Self {
        self.map_items(|v| match v {
            Value::String(s) => Value::String(s.trim().to_string()),
            other => other,
        })
    }

    /// Appends each named filter as a per-item map stage, in order.
    pub fn pipe(mut self, filters: impl IntoIterator<Item = ItemFilter<E>>) -> Self {
        for filter in filters {
            self = self.map_items(move |v| (*filter)(v));
        }
        self
    }
}

impl<E> fmt::Debug for Select<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Select")
            .field("selectors", &self.selectors)
            .field("scope", &self.scope)
            .field("slice", &self.slice)
            .field("single", &self.single)
            .field("projection", &self.projection)
            .field("pipeline", &format_args!("[{} stage(s)]", self.pipeline.len()))
            .finish()
    }
}

/// A node that matches elements by selector and evaluates a nested target
/// once per match (or once for the first match, if singular).
#[derive(Debug, Clone)]
pub struct Scope<E> {
    pub(crate) selectors: String,
    pub(crate) scope: SelectionScope,
    pub(crate) slice: Option<SliceRange>,
    pub(crate) single: Option<bool>,
    pub(crate) content: Box<Target<E>>,
    pub(crate) auto_unwrap: bool,
}

impl<E> Scope<E> {
    pub fn new(selectors: impl Into<String>, content: impl Into<Target<E>>) -> Self {
        Self {
            selectors: selectors.into(),
            scope: SelectionScope::default(),
            slice: None,
            single: None,
            content: Box::new(content.into()),
            auto_unwrap: true,
        }
    }

    pub fn single(mut self) -> Self {
        self.single = Some(true);
        self
    }

    pub fn multi(mut self) -> Self {
        self.single = Some(false);
        self
    }

    pub fn first(mut self) -> Self {
        self.slice = Some(SliceRange::new(0, Some(1)));
        self.single = Some(true);
        self
    }

    pub fn last(mut self) -> Self {
        self.slice = Some(SliceRange::new(-1, None));
        self.single = Some(true);
        self
    }

    pub fn at(mut self, index: usize) -> Self {
        let index = index as isize;
        self.slice = Some(SliceRange::new(index, Some(index + 1)));
        self.single = Some(true);
        self
    }

    pub fn range(mut self, from: isize, to: isize) -> Self {
        self.slice = Some(SliceRange::new(from, Some(to)));
        self.single = Some(false);
        self
    }

    pub fn all(mut self) -> Self {
        self.slice = None;
        self.single = Some(false);
        self
    }

    pub fn from_global(mut self) -> Self {
        self.scope = SelectionScope::Global;
        self
    }

    pub fn from_scope(mut self, parent_level: usize) -> Self {
        self.scope = SelectionScope::Scoped(parent_level);
        self
    }

    /// Controls singleton unwrapping: when the content is a one-element
    /// list, that sole inner node is evaluated directly per match instead
    /// of rebuilding a nested one-element sequence every time. On by
    /// default; turn off to keep the nested shape.
    pub fn auto_unwrap(mut self, value: bool) -> Self {
        self.auto_unwrap = value;
        self
    }
}

/// A node that evaluates its content, then pushes the final value through
/// a pipeline of scalar transforms.
#[derive(Clone)]
pub struct Refine<E> {
    pub(crate) content: Box<Target<E>>,
    pub(crate) pipeline: Vec<ItemFilter<E>>,
}

impl<E> Refine<E> {
    pub fn new(content: impl Into<Target<E>>) -> Self {
        Self {
            content: Box::new(content.into()),
            pipeline: Vec::new(),
        }
    }
}

impl<E: 'static> Refine<E> {
    pub fn action(mut self, action: impl Fn(Value<E>) -> Value<E> + Send + Sync + 'static) -> Self {
        self.pipeline.push(Arc::new(action));
        self
    }
}

impl<E: fmt::Debug> fmt::Debug for Refine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Refine")
            .field("content", &self.content)
            .field("pipeline", &format_args!("[{} action(s)]", self.pipeline.len()))
            .finish()
    }
}

/// The source of a nested sub-scrape: literal text (an address, markup,
/// or shorthand), or a selection evaluated against the outer document.
#[derive(Debug, Clone)]
pub enum Source<E> {
    Text(String),
    Select(Box<Select<E>>),
}

impl<E> From<&str> for Source<E> {
    fn from(s: &str) -> Self {
        Source::Text(s.to_string())
    }
}

impl<E> From<String> for Source<E> {
    fn from(s: String) -> Self {
        Source::Text(s)
    }
}

impl<E> From<Select<E>> for Source<E> {
    fn from(select: Select<E>) -> Self {
        Source::Select(Box::new(select))
    }
}

/// A nested, independent scrape whose source is computed from the current
/// document. The resolved source is loaded as a fresh document and the
/// inner target is evaluated against it from a root scope path.
#[derive(Debug, Clone)]
pub struct SubScrape<E> {
    pub(crate) source: Source<E>,
    pub(crate) target: Box<Target<E>>,
}

impl<E> SubScrape<E> {
    pub fn new(source: impl Into<Source<E>>, target: impl Into<Target<E>>) -> Self {
        Self {
            source: source.into(),
            target: Box::new(target.into()),
        }
    }
}

/// One node of a target tree. The variant set is closed and the walk
/// interpreter dispatches over it exhaustively.
#[derive(Debug, Clone)]
pub enum Target<E> {
    Select(Select<E>),
    Scope(Scope<E>),
    /// An opaque literal, returned as-is regardless of document state.
    Constant(Value<E>),
    Refine(Refine<E>),
    /// Ordered sequence container. One element means "evaluate it for
    /// every match in the active context" (map semantics); two or more
    /// mean "evaluate each against the same context, positionally"
    /// (tuple semantics).
    List(Vec<Target<E>>),
    /// Named mapping; keys keep their declared order.
    Map(Vec<(String, Target<E>)>),
    /// Compact string form, parsed by [`crate::shorthand`] at walk time.
    Shorthand(String),
    SubScrape(SubScrape<E>),
}

impl<E> Target<E> {
    /// Builds a sequence container.
    pub fn list<T: Into<Target<E>>>(items: impl IntoIterator<Item = T>) -> Self {
        Target::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a named mapping, preserving entry order.
    pub fn map<K: Into<String>, T: Into<Target<E>>>(
        entries: impl IntoIterator<Item = (K, T)>,
    ) -> Self {
        Target::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<E> From<Select<E>> for Target<E> {
    fn from(select: Select<E>) -> Self {
        Target::Select(select)
    }
}

impl<E> From<Scope<E>> for Target<E> {
    fn from(scope: Scope<E>) -> Self {
        Target::Scope(scope)
    }
}

impl<E> From<Refine<E>> for Target<E> {
    fn from(refine: Refine<E>) -> Self {
        Target::Refine(refine)
    }
}

impl<E> From<SubScrape<E>> for Target<E> {
    fn from(sub: SubScrape<E>) -> Self {
        Target::SubScrape(sub)
    }
}

impl<E> From<&str> for Target<E> {
    fn from(shorthand: &str) -> Self {
        Target::Shorthand(shorthand.to_string())
    }
}

impl<E> From<String> for Target<E> {
    fn from(shorthand: String) -> Self {
        Target::Shorthand(shorthand)
    }
}

impl<E> From<Value<E>> for Target<E> {
    fn from(value: Value<E>) -> Self {
        Target::Constant(value)
    }
}

impl<E> From<serde_json::Value> for Target<E> {
    fn from(value: serde_json::Value) -> Self {
        Target::Constant(value.into())
    }
}

impl<E, T: Into<Target<E>>> From<Vec<T>> for Target<E> {
    fn from(items: Vec<T>) -> Self {
        Target::list(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_range_basic() {
        let range = SliceRange::new(1, Some(3));
        assert_eq!(range.apply(vec!["a", "b", "c", "d"]), vec!["b", "c"]);
    }

    #[test]
    fn slice_range_negative_start_takes_tail() {
        let range = SliceRange::new(-1, None);
        assert_eq!(range.apply(vec!["a", "b", "c"]), vec!["c"]);
        let range = SliceRange::new(-2, None);
        assert_eq!(range.apply(vec!["a", "b", "c"]), vec!["b", "c"]);
    }

    #[test]
    fn slice_range_clamps_out_of_bounds() {
        let range = SliceRange::new(1, Some(10));
        assert_eq!(range.apply(vec!["a", "b"]), vec!["b"]);
        let range = SliceRange::new(5, None);
        assert_eq!(range.apply(vec!["a", "b"]), Vec::<&str>::new());
        let range = SliceRange::new(-10, Some(1));
        assert_eq!(range.apply(vec!["a", "b"]), vec!["a"]);
    }

    #[test]
    fn slice_range_empty_when_inverted() {
        let range = SliceRange::new(3, Some(1));
        assert_eq!(range.apply(vec!["a", "b", "c", "d"]), Vec::<&str>::new());
    }

    #[test]
    fn first_and_last_set_slice_and_cardinality() {
        let select = Select::<()>::new("h1").first();
        assert_eq!(select.slice, Some(SliceRange::new(0, Some(1))));
        assert_eq!(select.single, Some(true));

        let select = Select::<()>::new("h1").last();
        assert_eq!(select.slice, Some(SliceRange::new(-1, None)));
        assert_eq!(select.single, Some(true));
    }

    #[test]
    fn all_clears_slicing() {
        let select = Select::<()>::new("h1").first().all();
        assert_eq!(select.slice, None);
        assert_eq!(select.single, Some(false));
    }

    #[test]
    fn cardinality_unset_by_default() {
        let select = Select::<()>::new("h1");
        assert_eq!(select.single, None);
        assert_eq!(select.scope, SelectionScope::Scoped(0));
        assert_eq!(select.projection, Projection::Text);
    }

    #[test]
    fn list_and_map_constructors_keep_order() {
        let target = Target::<()>::map([("b", "p"), ("a", "q")]);
        match target {
            Target::Map(entries) => {
                let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["b", "a"]);
            }
            other => panic!("expected a map, got {other:?}"),
        }
    }
}
