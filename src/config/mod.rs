//! TOML rule sets: named rules evaluated together against one tree.
//!
//! ```toml
//! [meta]
//! name = "ad-slots"
//! include_frames = true
//!
//! [[rules]]
//! name = "banner"
//! rule = "cl=banner;vis=true"
//!
//! [[rules]]
//! name = "sidebar-frames"
//! mode = "all"
//! predicates = [
//!     { property = "ppid", value = "sidebar" },
//!     { property = "tag", value = "iframe" },
//! ]
//! ```

pub mod loader;
pub mod runner;
pub mod schema;

pub use loader::{load_from_path, load_from_str, load_rule_set, ConfigError};
pub use runner::{CompiledRule, RuleOutcome, RuleSet};
pub use schema::{
    Metadata, Mode, PredicateDefinition, RuleDefinition, RuleSetConfig, ValidationError,
    ValidationIssue,
};
