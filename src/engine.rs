//! The recursive walk interpreter and the top-level scraper.
//!
//! `walk` is a pure function of (document, target node, scope path,
//! options): no state survives a call, recursion depth equals target
//! nesting depth, and the same target evaluated twice against the same
//! document yields the same value.

use crate::driver::Driver;
use crate::error::Error;
use crate::filters::FilterRegistry;
use crate::shorthand::parse_shorthand;
use crate::target::{Scope, Select, SelectionScope, SliceRange, Source, SubScrape, Target};
use crate::value::Value;
use log::{debug, trace};

/// The ancestor chain of matched context elements, indexed by nesting
/// depth: frame 0 is the immediately enclosing scope's current match,
/// frame `k` is `k` scopes outward.
///
/// Each recursive descent receives its own extended copy; frames are
/// never shared mutably across sibling branches.
#[derive(Debug, Clone)]
pub struct ScopePath<E> {
    frames: Vec<E>,
}

impl<E: Clone> ScopePath<E> {
    /// The empty path used at the top of a scrape.
    pub fn root() -> Self {
        Self { frames: Vec::new() }
    }

    /// A new path with `element` prepended as the innermost frame.
    pub fn descend(&self, element: E) -> Self {
        let mut frames = Vec::with_capacity(self.frames.len() + 1);
        frames.push(element);
        frames.extend(self.frames.iter().cloned());
        Self { frames }
    }

    pub fn ancestor(&self, level: usize) -> Option<&E> {
        self.frames.get(level)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl<E: Clone> Default for ScopePath<E> {
    fn default() -> Self {
        Self::root()
    }
}

/// Knobs inherited from the enclosing evaluation context.
#[derive(Debug, Clone, Copy, Default)]
struct WalkOpts {
    /// Preferred cardinality for selections that did not state their own.
    prefer_single: Option<bool>,
}

impl WalkOpts {
    fn prefer(single: bool) -> Self {
        Self {
            prefer_single: Some(single),
        }
    }
}

/// A walk result: the value plus the marker deciding whether an enclosing
/// sequence splices it in or nests it.
struct Outcome<E> {
    value: Value<E>,
    spreadable: bool,
}

impl<E> Outcome<E> {
    fn plain(value: Value<E>) -> Self {
        Self {
            value,
            spreadable: false,
        }
    }

    fn spread(value: Value<E>) -> Self {
        Self {
            value,
            spreadable: true,
        }
    }
}

/// True when the source is an absolute http(s) address.
pub fn is_http_url(source: &str) -> bool {
    let source = source.trim();
    ["http://", "https://"].iter().any(|scheme| {
        source
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
            && source.len() > scheme.len()
    })
}

/// True when the source looks like literal markup: after optional leading
/// whitespace it opens a tag-like token.
pub fn looks_like_markup(source: &str) -> bool {
    let source = source.trim_start();
    source.starts_with('<') && source[1..].contains('>')
}

/// Evaluates declarative targets against documents supplied by a driver.
///
/// The scraper owns the driver and the filter registry; both are read-only
/// during evaluation, so one scraper can serve any number of scrapes and
/// one target can be reused across scrapers.
pub struct Scraper<D: Driver> {
    driver: D,
    filters: FilterRegistry<D::Element>,
}

impl<D: Driver> Scraper<D> {
    /// A scraper with the built-in filter registry.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            filters: FilterRegistry::default(),
        }
    }

    /// Replaces the filter registry wholesale.
    pub fn with_filters(mut self, filters: FilterRegistry<D::Element>) -> Self {
        self.filters = filters;
        self
    }

    pub fn register_filter(
        &mut self,
        name: impl Into<String>,
        filter: impl Fn(Value<D::Element>) -> Value<D::Element> + Send + Sync + 'static,
    ) {
        self.filters.register(name, filter);
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn filters(&self) -> &FilterRegistry<D::Element> {
        &self.filters
    }

    /// Validates `source`, loads it through the driver, and evaluates
    /// `target` against the fresh document.
    ///
    /// The source must be a retrievable http(s) address or literal markup
    /// text; a bare selection is rejected here, before any evaluation
    /// begins (selections are only meaningful as nested sub-scrape
    /// sources, where an outer document exists to resolve them).
    pub fn scrape(
        &self,
        source: impl Into<Source<D::Element>>,
        target: &Target<D::Element>,
    ) -> Result<Value<D::Element>, Error> {
        let text = match source.into() {
            Source::Select(_) => return Err(Error::SelectionRootSource),
            Source::Text(text) => text,
        };
        if !is_http_url(&text) && !looks_like_markup(&text) {
            return Err(Error::InvalidSource);
        }
        self.scrape_text(&text, target)
    }

    /// Loads a pre-validated source and walks the target from a root
    /// scope path, discarding the spreadability marker.
    fn scrape_text(
        &self,
        source: &str,
        target: &Target<D::Element>,
    ) -> Result<Value<D::Element>, Error> {
        debug!(
            "loading {} source ({} bytes)",
            if is_http_url(source) { "remote" } else { "inline" },
            source.len()
        );
        let document = self.driver.load(source)?;
        let outcome = self.walk(&document, target, &ScopePath::root(), WalkOpts::default())?;
        Ok(outcome.value)
    }

    fn walk(
        &self,
        document: &D::Document,
        target: &Target<D::Element>,
        path: &ScopePath<D::Element>,
        opts: WalkOpts,
    ) -> Result<Outcome<D::Element>, Error> {
        match target {
            Target::SubScrape(sub) => self.walk_subscrape(document, sub, path),
            Target::Scope(scope) => self.walk_scope(document, scope, path),
            Target::Select(select) => self.walk_select(document, select, path, opts),
            Target::Refine(refine) => {
                let inner = self.walk(document, &refine.content, path, WalkOpts::default())?;
                let value = refine
                    .pipeline
                    .iter()
                    .fold(inner.value, |v, action| (**action)(v));
                Ok(Outcome::plain(value))
            }
            Target::Constant(value) => Ok(Outcome::plain(value.clone())),
            Target::List(items) if items.len() == 1 => {
                // Map semantics: the sole element runs plural, and a
                // spreadable sequence takes the container's place instead
                // of nesting inside it.
                let inner = self.walk(document, &items[0], path, WalkOpts::prefer(false))?;
                let value = match inner {
                    Outcome {
                        value: Value::Seq(seq),
                        spreadable: true,
                    } => Value::Seq(seq),
                    Outcome { value, .. } => Value::Seq(vec![value]),
                };
                Ok(Outcome::plain(value))
            }
            Target::List(items) => {
                // Tuple semantics: each element resolves independently
                // against the same context, singular by preference.
                let mut collected = Vec::with_capacity(items.len());
                for item in items {
                    collected.push(self.walk(document, item, path, WalkOpts::prefer(true))?.value);
                }
                Ok(Outcome::plain(Value::Seq(collected)))
            }
            Target::Map(entries) => {
                let mut out = Vec::with_capacity(entries.len());
                for (key, node) in entries {
                    let value = self.walk(document, node, path, WalkOpts::prefer(true))?.value;
                    out.push((key.clone(), value));
                }
                Ok(Outcome::plain(Value::Map(out)))
            }
            Target::Shorthand(text) => {
                let select = parse_shorthand(text)?.into_select(&self.filters);
                let prefer = opts.prefer_single.unwrap_or(true);
                self.walk_select(document, &select, path, WalkOpts::prefer(prefer))
            }
        }
    }

    /// Shared selector resolution for scopes and selections: resolve the
    /// matching context per the node's scope, match, then slice.
    fn resolve_elements(
        &self,
        document: &D::Document,
        selectors: &str,
        scope: SelectionScope,
        slice: Option<SliceRange>,
        path: &ScopePath<D::Element>,
    ) -> Result<Vec<D::Element>, Error> {
        let context = match scope {
            SelectionScope::Global => None,
            SelectionScope::Scoped(level) => path.ancestor(level),
        };
        let matched = self.driver.select(document, selectors, context)?;
        trace!("'{selectors}' matched {} element(s)", matched.len());
        Ok(match slice {
            Some(range) => range.apply(matched),
            None => matched,
        })
    }

    fn walk_scope(
        &self,
        document: &D::Document,
        scope: &Scope<D::Element>,
        path: &ScopePath<D::Element>,
    ) -> Result<Outcome<D::Element>, Error> {
        let matched =
            self.resolve_elements(document, &scope.selectors, scope.scope, scope.slice, path)?;

        if scope.single.unwrap_or(false) {
            // Singular: evaluate the content once against the first match
            // (or against the unextended path when nothing matched), and
            // return it bare.
            let outcome = match matched.into_iter().next() {
                Some(element) => self.walk(
                    document,
                    &scope.content,
                    &path.descend(element),
                    WalkOpts::default(),
                )?,
                None => self.walk(document, &scope.content, path, WalkOpts::default())?,
            };
            return Ok(Outcome::plain(outcome.value));
        }

        // Singleton unwrap: a one-element list content is evaluated
        // directly per match, so per-match sequences splice into one flat
        // collection instead of nesting.
        let content: &Target<D::Element> = match (scope.content.as_ref(), scope.auto_unwrap) {
            (Target::List(items), true) if items.len() == 1 => &items[0],
            (content, _) => content,
        };

        let mut collected = Vec::new();
        for element in matched {
            let outcome =
                self.walk(document, content, &path.descend(element), WalkOpts::default())?;
            match outcome {
                Outcome {
                    value: Value::Seq(items),
                    spreadable: true,
                } => collected.extend(items),
                Outcome { value, .. } => collected.push(value),
            }
        }
        Ok(Outcome::spread(Value::Seq(collected)))
    }

    fn walk_select(
        &self,
        document: &D::Document,
        select: &Select<D::Element>,
        path: &ScopePath<D::Element>,
        opts: WalkOpts,
    ) -> Result<Outcome<D::Element>, Error> {
        let matched =
            self.resolve_elements(document, &select.selectors, select.scope, select.slice, path)?;

        let mut projected = Vec::with_capacity(matched.len());
        for element in &matched {
            projected.push(self.driver.project(element, &select.projection)?);
        }
        let transformed = select
            .pipeline
            .iter()
            .fold(projected, |items, stage| (**stage)(items));

        let single = select
            .single
            .unwrap_or_else(|| opts.prefer_single.unwrap_or(false));
        if single {
            Ok(Outcome::plain(
                transformed.into_iter().next().unwrap_or(Value::Null),
            ))
        } else {
            Ok(Outcome::spread(Value::Seq(transformed)))
        }
    }

    fn walk_subscrape(
        &self,
        document: &D::Document,
        sub: &SubScrape<D::Element>,
        path: &ScopePath<D::Element>,
    ) -> Result<Outcome<D::Element>, Error> {
        let resolved = match &sub.source {
            Source::Select(select) => self.resolve_source_select(document, select, path)?,
            Source::Text(text) if is_http_url(text) || looks_like_markup(text) => text.clone(),
            // A nested source that is neither address nor markup is
            // retried as shorthand-selector sugar.
            Source::Text(text) => {
                let select = parse_shorthand(text)?.into_select(&self.filters);
                self.resolve_source_select(document, &select, path)?
            }
        };
        debug!("sub-scrape source resolved to {} bytes", resolved.len());
        let value = self.scrape_text(&resolved, &sub.target)?;
        Ok(Outcome::plain(value))
    }

    /// Evaluates a selection used as a sub-scrape source and coerces the
    /// result to the text to load next.
    fn resolve_source_select(
        &self,
        document: &D::Document,
        select: &Select<D::Element>,
        path: &ScopePath<D::Element>,
    ) -> Result<String, Error> {
        let outcome = self.walk_select(document, select, path, WalkOpts::prefer(true))?;
        let value = match outcome.value {
            Value::Seq(items) => items.into_iter().next().unwrap_or(Value::Null),
            other => other,
        };
        let text = value.coerce_string();
        if text.is_empty() {
            return Err(Error::EmptySubScrapeSource);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_url_classification() {
        assert!(is_http_url("http://example.com"));
        assert!(is_http_url("https://example.com/a?b=c"));
        assert!(is_http_url("HTTPS://EXAMPLE.COM"));
        assert!(!is_http_url("ftp://example.com"));
        assert!(!is_http_url("https://"));
        assert!(!is_http_url("example.com"));
        assert!(!is_http_url("<html></html>"));
    }

    #[test]
    fn markup_classification() {
        assert!(looks_like_markup("<h1>x</h1>"));
        assert!(looks_like_markup("  \n <div>"));
        assert!(looks_like_markup("<>"));
        assert!(!looks_like_markup("h1"));
        assert!(!looks_like_markup("plain < text"));
    }

    #[test]
    fn scope_path_prepends_and_indexes() {
        let path = ScopePath::<u32>::root();
        assert_eq!(path.depth(), 0);
        assert_eq!(path.ancestor(0), None);

        let inner = path.descend(1).descend(2);
        assert_eq!(inner.depth(), 2);
        assert_eq!(inner.ancestor(0), Some(&2));
        assert_eq!(inner.ancestor(1), Some(&1));
        assert_eq!(inner.ancestor(2), None);
    }

    #[test]
    fn scope_path_branches_do_not_share_frames() {
        let base = ScopePath::<u32>::root().descend(1);
        let left = base.descend(2);
        let right = base.descend(3);
        assert_eq!(left.ancestor(0), Some(&2));
        assert_eq!(right.ancestor(0), Some(&3));
        assert_eq!(base.ancestor(0), Some(&1));
    }
}
