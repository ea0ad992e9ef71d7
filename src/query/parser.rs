//! Rule-language parser.
//!
//! ```text
//! rule    := segment (';' segment)*
//! segment := property '=' value        (split on the first '=')
//! ```
//!
//! Malformed segments are skipped rather than reported; a rule with no
//! usable segment parses to `None`.

use crate::query::errors::ParseError;
use crate::query::identifier::Identifier;
use crate::query::rule::Rule;

/// Compile `text` into a [`Rule`], or `None` if no segment is usable.
pub fn parse(text: &str) -> Option<Rule> {
    let identifiers: Vec<Identifier> = segments(text).filter_map(Result::ok).collect();
    if identifiers.is_empty() {
        tracing::trace!(text, "rule has no usable segments");
        return None;
    }
    Some(Rule::new(identifiers))
}

/// Every `;`-separated segment of `text`, compiled or with the reason it
/// was skipped by [`parse`].
pub fn segments(text: &str) -> impl Iterator<Item = Result<Identifier, ParseError>> + '_ {
    text.split(';').map(str::parse::<Identifier>)
}
