//! A declarative data extraction engine for parsed markup documents.
//!
//! A caller describes *what shape of data* to pull out of a document as a
//! tree of typed [`Target`] nodes — selections, scopes, constants,
//! post-processing steps and plain containers — and the engine evaluates
//! that tree to a plain [`Value`] (scalar, ordered sequence, or named
//! mapping). Document parsing, selector matching and element projection
//! are delegated to a pluggable [`Driver`]; the engine itself never
//! touches markup.
//!
//! ```
//! use gleaner::driver::mock::MockDriver;
//! use gleaner::{Scraper, Target, all, get};
//!
//! let scraper = Scraper::new(MockDriver);
//!
//! let target = Target::map([
//!     ("title", Target::from(get("h1"))),
//!     ("items", Target::from(all("li"))),
//! ]);
//!
//! let value = scraper
//!     .scrape("<h1>Fruit</h1><ul><li>Apple</li><li>Pear</li></ul>", &target)
//!     .unwrap();
//! assert_eq!(value.get("title").unwrap().as_str(), Some("Fruit"));
//! # assert_eq!(value.get("items").unwrap(), &gleaner::Value::from(serde_json::json!(["Apple", "Pear"])));
//! ```
//!
//! A string at a target position is shorthand for a selection:
//! `"a.link@href|trim"` selects `a.link`, projects the `href` attribute
//! and runs the registered `trim` filter over each match.

pub mod driver;
pub mod engine;
pub mod error;
pub mod filters;
pub mod shorthand;
pub mod target;
pub mod value;

pub use driver::{Driver, DriverError, Projection};
pub use engine::{ScopePath, Scraper, is_http_url, looks_like_markup};
pub use error::Error;
pub use filters::{FilterRegistry, ItemFilter, SeqFilter};
pub use shorthand::{Shorthand, parse_shorthand};
pub use target::{Refine, Scope, Select, SelectionScope, SliceRange, Source, SubScrape, Target};
pub use value::Value;

/// A selection with inherited cardinality and text projection.
pub fn select<E>(selectors: impl Into<String>) -> Select<E> {
    Select::new(selectors)
}

/// A selection of the first match, as a scalar.
pub fn get<E>(selectors: impl Into<String>) -> Select<E> {
    Select::new(selectors).first()
}

/// A selection of every match, as a sequence.
pub fn all<E>(selectors: impl Into<String>) -> Select<E> {
    Select::new(selectors).all()
}

/// A scope evaluating `content` once per matched element.
pub fn scope<E>(selectors: impl Into<String>, content: impl Into<Target<E>>) -> Scope<E> {
    Scope::new(selectors, content)
}

/// An opaque literal, returned as-is regardless of document state.
pub fn constant<E>(value: impl Into<Value<E>>) -> Target<E> {
    Target::Constant(value.into())
}

/// A post-processing node; attach transforms with [`Refine::action`].
pub fn refine<E>(content: impl Into<Target<E>>) -> Refine<E> {
    Refine::new(content)
}

/// Splices one level of nested sequences out of `content`'s result.
pub fn flatten<E: 'static>(content: impl Into<Target<E>>) -> Refine<E> {
    flatten_depth(1, content)
}

/// Splices up to `depth` levels of nested sequences out of `content`'s
/// result.
pub fn flatten_depth<E: 'static>(depth: usize, content: impl Into<Target<E>>) -> Refine<E> {
    refine(content).action(move |value| value.flattened(depth))
}

/// Rebuilds `content`'s sequence-of-pairs result into a named mapping.
pub fn entries<E: 'static>(content: impl Into<Target<E>>) -> Refine<E> {
    refine(content).action(|value| value.into_entries())
}

/// A nested scrape of a freshly-loaded document whose source (address,
/// markup, or a selection over the outer document) is resolved at walk
/// time.
pub fn subscrape<E>(source: impl Into<Source<E>>, target: impl Into<Target<E>>) -> SubScrape<E> {
    SubScrape::new(source, target)
}
