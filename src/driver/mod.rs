//! The capability boundary between the evaluation engine and a concrete
//! document implementation.
//!
//! The engine never parses markup or matches selectors itself; it is
//! written exclusively against the [`Driver`] trait, so any DOM library
//! (or a plain in-memory tree, see [`mock`]) can back a scrape.

use crate::value::Value;
use std::error::Error as StdError;
use thiserror::Error;

pub mod mock;

/// How a matched element is converted to a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// The element handle itself, as [`Value::Element`].
    Raw,
    /// The concatenated text content of the element's subtree.
    Text,
    /// The value of the named attribute, or null when absent.
    Attribute(String),
    /// The serialized markup of the element's children.
    InnerHtml,
    /// The serialized markup of the element itself.
    OuterHtml,
}

/// A failure reported by a driver. Opaque to the engine: it is propagated
/// unchanged and never retried.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct DriverError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::with_source("i/o error", err)
    }
}

/// The contract a document implementation must satisfy.
///
/// Handles are identity-only values owned by the driver; the engine never
/// inspects them, only passes them back. `select` must return matches in
/// document order: slicing and first/last semantics depend on it.
pub trait Driver {
    /// A loaded document.
    type Document;
    /// A matched element within a document. Cheap to clone.
    type Element: Clone + 'static;

    /// Produces a document from a source string. The engine hands the
    /// source through verbatim; whether a retrievable address is fetched
    /// first is the driver's business.
    fn load(&self, source: &str) -> Result<Self::Document, DriverError>;

    /// All elements matching `selectors`, scoped to `context`'s subtree
    /// when given, else the whole document.
    fn select(
        &self,
        document: &Self::Document,
        selectors: &str,
        context: Option<&Self::Element>,
    ) -> Result<Vec<Self::Element>, DriverError>;

    /// Converts one matched element to a value under a projection mode.
    fn project(
        &self,
        element: &Self::Element,
        projection: &Projection,
    ) -> Result<Value<Self::Element>, DriverError>;
}
