use crate::query::errors::ParseError;
use crate::query::identifier::Identifier;
use crate::query::parser;
use crate::query::reduce::reduce_all;
use crate::tree::{NodeKind, NodeTree};
use crate::unique::unique;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How far a search descends once a node matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Traversal {
    /// Stop at the outermost match on each branch.
    #[default]
    FirstMatch,
    /// Keep searching below matches; nested matches are returned too.
    AllMatches,
}

/// A conjunction of [`Identifier`]s, compiled from `prop=value;prop=value`.
///
/// Stateless: one compiled rule can be evaluated against any number of
/// trees.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rule {
    identifiers: Vec<Identifier>,
}

impl Rule {
    pub fn new(identifiers: Vec<Identifier>) -> Self {
        Self { identifiers }
    }

    pub fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    /// Rule text, predicates in declaration order.
    pub fn encode(&self) -> String {
        self.identifiers
            .iter()
            .map(Identifier::encode)
            .collect::<Vec<_>>()
            .join(";")
    }

    /// `true` when every predicate matches `node`.
    pub fn matches<T: NodeTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        self.identifiers
            .iter()
            .all(|identifier| identifier.matches(tree, node))
    }

    /// Minimal set of search roots under `subtree_root`.
    ///
    /// A document is searched from its document element. The candidate roots
    /// of every predicate are unioned, de-duplicated, and collapsed so no
    /// root lies inside another.
    pub fn locate_roots<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        subtree_root: Option<T::Node>,
    ) -> Vec<T::Node> {
        let Some(root) = subtree_root else {
            return Vec::new();
        };
        let start = if tree.kind(root) == NodeKind::Document {
            match tree.document_element(root) {
                Some(element) => element,
                None => return Vec::new(),
            }
        } else {
            root
        };

        let candidates = unique(
            self.identifiers
                .iter()
                .flat_map(|identifier| identifier.roots(tree, Some(start))),
        );
        let candidate_count = candidates.len();
        let roots = reduce_all(tree, candidates);
        debug!(
            rule = %self,
            candidates = candidate_count,
            roots = roots.len(),
            "located search roots"
        );
        roots
    }

    /// Outermost match along each branch under `subtree_root`.
    pub fn locate_elements<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        subtree_root: Option<T::Node>,
    ) -> Vec<T::Node> {
        self.locate(tree, subtree_root, Traversal::FirstMatch)
    }

    /// Every match under `subtree_root`, including matches nested in matches.
    pub fn locate_all_elements<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        subtree_root: Option<T::Node>,
    ) -> Vec<T::Node> {
        self.locate(tree, subtree_root, Traversal::AllMatches)
    }

    /// Depth-first search from each root, in document order, visiting
    /// element children only.
    pub fn locate<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        subtree_root: Option<T::Node>,
        traversal: Traversal,
    ) -> Vec<T::Node> {
        let mut found = Vec::new();
        for root in self.locate_roots(tree, subtree_root) {
            self.collect(tree, root, traversal, &mut found);
        }
        let found = unique(found);
        debug!(rule = %self, ?traversal, matches = found.len(), "search finished");
        found
    }

    fn collect<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        node: T::Node,
        traversal: Traversal,
        found: &mut Vec<T::Node>,
    ) {
        if self.matches(tree, node) {
            found.push(node);
            if traversal == Traversal::FirstMatch {
                return;
            }
        }
        for child in tree.element_children(node) {
            self.collect(tree, child, traversal, found);
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Rule {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parser::parse(text).ok_or_else(|| ParseError::Empty {
            text: text.to_string(),
        })
    }
}

impl TryFrom<String> for Rule {
    type Error = ParseError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl From<Rule> for String {
    fn from(rule: Rule) -> Self {
        rule.encode()
    }
}
