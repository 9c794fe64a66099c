use crate::driver::DriverError;
use thiserror::Error;

/// Errors produced while validating a scrape source or evaluating a target.
///
/// Every error aborts the whole scrape; the engine never returns partial
/// results. Unknown filter names in the shorthand grammar are deliberately
/// *not* an error (they resolve to a no-op, see [`crate::shorthand`]).
#[derive(Error, Debug)]
pub enum Error {
    #[error("source is neither an http(s) address nor markup text")]
    InvalidSource,

    #[error("the root source cannot be a bare selection")]
    SelectionRootSource,

    #[error("sub-scrape source resolved to an empty value")]
    EmptySubScrapeSource,

    #[error("shorthand parse error in '{input}': {message}")]
    Shorthand { input: String, message: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}
