//! A `nom`-based parser for the compact shorthand target grammar.
//!
//! `selector[@attribute]?[|filterName]*` — no `@` segment projects text
//! content, `@html` projects inner markup, any other `@name` projects
//! that attribute's value. Each `|name` references a filter in the
//! registry; an unknown name resolves to a no-op rather than an error,
//! which is an observable part of the contract.

use crate::driver::Projection;
use crate::error::Error;
use crate::filters::FilterRegistry;
use crate::target::Select;
use nom::{
    IResult, Parser,
    bytes::complete::take_till,
    character::complete::char,
    combinator::opt,
    multi::many0,
    sequence::preceded,
};

/// A parsed shorthand expression, not yet bound to a filter registry.
#[derive(Debug, Clone, PartialEq)]
pub struct Shorthand {
    pub selectors: String,
    pub projection: Projection,
    pub filters: Vec<String>,
}

impl Shorthand {
    /// Builds the equivalent selection node, resolving filter names
    /// against `registry`. Unknown names are skipped with a debug note.
    /// The resulting cardinality is unset (inherited from context).
    pub fn into_select<E: 'static>(self, registry: &FilterRegistry<E>) -> Select<E> {
        let mut select = Select::new(self.selectors);
        select = match self.projection {
            Projection::Text => select,
            Projection::InnerHtml => select.inner_html(),
            Projection::Attribute(name) => select.attr(name),
            Projection::Raw => select.raw(),
            Projection::OuterHtml => select.outer_html(),
        };
        for name in self.filters {
            match registry.get(&name) {
                Some(filter) => select = select.pipe([filter]),
                None => log::debug!("unknown shorthand filter '{name}', treating as a no-op"),
            }
        }
        select
    }
}

/// Parses a shorthand expression. Surrounding whitespace of every segment
/// is trimmed.
pub fn parse_shorthand(input: &str) -> Result<Shorthand, Error> {
    match shorthand(input.trim()) {
        Ok(("", parsed)) => Ok(parsed),
        Ok((remainder, _)) => Err(Error::Shorthand {
            input: input.to_string(),
            message: format!("unparsed trailing input: '{remainder}'"),
        }),
        Err(e) => Err(Error::Shorthand {
            input: input.to_string(),
            message: e.to_string(),
        }),
    }
}

fn shorthand(input: &str) -> IResult<&str, Shorthand> {
    let (input, selectors) = take_till(|c| c == '@' || c == '|').parse(input)?;
    let (input, attribute) = opt(preceded(
        char('@'),
        take_till(|c| c == '@' || c == '|'),
    ))
    .parse(input)?;
    // Anything between a second `@` and the filter list is discarded,
    // matching the historical two-segment destructuring.
    let (input, _) = take_till(|c| c == '|').parse(input)?;
    let (input, names) = many0(preceded(char('|'), take_till(|c| c == '|'))).parse(input)?;

    let projection = match attribute.map(str::trim) {
        None | Some("") => Projection::Text,
        Some("html") => Projection::InnerHtml,
        Some(name) => Projection::Attribute(name.to_string()),
    };

    Ok((
        input,
        Shorthand {
            selectors: selectors.trim().to_string(),
            projection,
            filters: names.iter().map(|n| n.trim().to_string()).collect(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn bare_selector_projects_text() {
        let parsed = parse_shorthand("h1").unwrap();
        assert_eq!(parsed.selectors, "h1");
        assert_eq!(parsed.projection, Projection::Text);
        assert!(parsed.filters.is_empty());
    }

    #[test]
    fn html_segment_projects_inner_markup() {
        let parsed = parse_shorthand("div.article@html").unwrap();
        assert_eq!(parsed.selectors, "div.article");
        assert_eq!(parsed.projection, Projection::InnerHtml);
    }

    #[test]
    fn other_attribute_names_project_that_attribute() {
        let parsed = parse_shorthand("h1@data-test").unwrap();
        assert_eq!(
            parsed.projection,
            Projection::Attribute("data-test".to_string())
        );
    }

    #[test]
    fn filters_split_on_pipes() {
        let parsed = parse_shorthand("h1@href | trim | lowercase").unwrap();
        assert_eq!(parsed.selectors, "h1");
        assert_eq!(parsed.projection, Projection::Attribute("href".to_string()));
        assert_eq!(parsed.filters, vec!["trim", "lowercase"]);
    }

    #[test]
    fn segments_are_trimmed() {
        let parsed = parse_shorthand("  h1 @ html ").unwrap();
        assert_eq!(parsed.selectors, "h1");
        assert_eq!(parsed.projection, Projection::InnerHtml);
    }

    #[test]
    fn empty_attribute_segment_falls_back_to_text() {
        let parsed = parse_shorthand("h1@|trim").unwrap();
        assert_eq!(parsed.projection, Projection::Text);
        assert_eq!(parsed.filters, vec!["trim"]);
    }

    #[test]
    fn extra_attribute_segments_are_discarded() {
        let parsed = parse_shorthand("a@href@title|trim").unwrap();
        assert_eq!(parsed.projection, Projection::Attribute("href".to_string()));
        assert_eq!(parsed.filters, vec!["trim"]);
    }

    #[test]
    fn unknown_filter_resolves_to_noop() {
        let registry = FilterRegistry::<()>::default();
        let select = parse_shorthand("h1|no-such-filter|trim")
            .unwrap()
            .into_select(&registry);
        // Only the known filter contributes a pipeline stage.
        assert_eq!(select.pipeline.len(), 1);
        let out = (*select.pipeline[0])(vec![Value::from("  x ")]);
        assert_eq!(out, vec![Value::from("x")]);
    }
}
