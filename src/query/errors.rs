use thiserror::Error;

/// Construction failure for a single predicate. A programmer error, never a
/// "no match" outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("invalid property passed to Identifier: property is empty")]
    EmptyProperty,

    #[error("invalid property passed to Identifier: '{property}' contains '{found}'")]
    InvalidProperty { property: String, found: char },
}

/// Why a rule string, or one of its segments, did not compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("segment '{segment}' has no '=' separator")]
    MissingSeparator { segment: String },

    #[error("segment '{segment}': {source}")]
    InvalidIdentifier {
        segment: String,
        #[source]
        source: IdentifierError,
    },

    #[error("rule '{text}' contains no valid identifiers")]
    Empty { text: String },
}
