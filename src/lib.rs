//! Node Locator: rule-based element search over rendered document trees
//!
//! A rule is a `;`-separated conjunction of `property=value` predicates,
//! for example `ppcl=sidebar;tag=iframe;vis=true`. Rules are compiled once
//! and evaluated against any tree that implements [`NodeTree`].
//!
//! # Architecture
//!
//! Search runs in two phases. Every predicate proposes cheap candidate
//! roots from host indexes (id, class, tag); the union is collapsed so no
//! root lies inside another. A depth-first walk from each remaining root
//! then tests the full conjunction on element nodes only.
//!
//! Predicates may target the node itself, its parent (`p` prefix), or any
//! ancestor (`pp` prefix). Ancestor walks are bounded by
//! [`tree::MAX_ANCESTOR_STEPS`], so a host with a broken parent chain cannot
//! hang a search.
//!
//! # Example
//!
//! ```
//! use node_locator::{parse, MemoryTree};
//!
//! let mut tree = MemoryTree::new();
//! let doc = tree.create_document(None);
//! let html = tree.element(doc, "html", &[]);
//! let body = tree.element(html, "body", &[]);
//! let slot = tree.element(body, "div", &[("id", "slot"), ("class", "ad")]);
//!
//! let rule = parse("cl=ad;tag=div").expect("rule has usable segments");
//! assert_eq!(rule.locate_elements(&tree, Some(doc)), vec![slot]);
//! ```

pub mod config;
pub mod query;
pub mod tree;
pub mod unique;

// Re-exports
pub use config::{
    load_from_path, load_from_str, load_rule_set, ConfigError, RuleOutcome, RuleSet, RuleSetConfig,
};
pub use query::{
    parse, reduce_parents, Identifier, IdentifierError, ParseError, PredicateKind, Rule, Scope,
    Traversal,
};
pub use tree::{
    load_snapshot_path, load_snapshot_str, MemoryTree, NodeId, NodeKind, NodeTree,
    SnapshotError, TreeError,
};
