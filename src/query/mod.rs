//! Rule engine: predicates, conjunctive rules, root discovery, and search.
//!
//! A rule string such as `ppcl=sidebar;tag=iframe;vis=true` compiles into a
//! [`Rule`] holding one [`Identifier`] per segment. A search first asks each
//! predicate for cheap candidate roots (host id/class/tag indexes), collapses
//! roots nested inside other roots, then walks down from what is left.

pub mod errors;
pub mod identifier;
pub mod parser;
pub mod reduce;
pub mod rule;
pub mod value;

pub use errors::{IdentifierError, ParseError};
pub use identifier::{effectively_visible, Identifier, PredicateKind, Scope};
pub use parser::{parse, segments};
pub use reduce::{reduce_all, reduce_parents};
pub use rule::{Rule, Traversal};
