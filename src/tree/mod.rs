//! Node-tree capability consumed by the rule engine.
//!
//! The engine never owns a document. It is generic over [`NodeTree`], which a
//! host implements once for its own node representation (a browser binding,
//! a parsed HTML arena, a layout snapshot). [`MemoryTree`] is the in-crate
//! arena implementation used by the CLI and the tests.

pub mod errors;
pub mod memory;
pub mod snapshot;

pub use errors::{SnapshotError, TreeError};
pub use memory::{MemoryTree, NodeId};
pub use snapshot::{load_snapshot_path, load_snapshot_str, Snapshot};

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

/// Upper bound on parent-link hops for any ancestor walk.
///
/// Real documents are tens of levels deep; a host with a cyclic parent chain
/// stops here instead of looping forever.
pub const MAX_ANCESTOR_STEPS: usize = 4096;

/// Node classification, mirroring the DOM `nodeType` values the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Other,
}

/// A reflected property value.
///
/// Attributes are always text, but reflected properties such as
/// `clientWidth` are numeric and compare as integers.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Number(f64),
}

/// The subset of computed style that determines visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComputedStyle {
    pub display: String,
    pub visibility: String,
}

impl ComputedStyle {
    /// `display != none` and `visibility != hidden`.
    pub fn is_visible(&self) -> bool {
        !self.display.eq_ignore_ascii_case("none") && !self.visibility.eq_ignore_ascii_case("hidden")
    }
}

/// Live bounding box in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fallback layout size (`clientWidth` / `clientHeight`).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Read-only access to a rendered document tree.
///
/// Only the first five methods are required. Everything else has a
/// scan-based default so a minimal host works out of the box; hosts with
/// real indexes override the lookup methods.
pub trait NodeTree {
    /// Opaque node handle. Equality is node identity.
    type Node: Copy + Eq + Hash + Debug;

    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Parent link (`parentNode`). The parent of a root element is its document.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// All children in document order, including text nodes.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Reflected property (`el[name]`). Defaults to the attribute text.
    fn property(&self, node: Self::Node, name: &str) -> Option<PropertyValue> {
        self.attribute(node, name)
            .map(|value| PropertyValue::Text(value.to_string()))
    }

    fn computed_style(&self, _node: Self::Node) -> Option<ComputedStyle> {
        None
    }

    fn bounding_rect(&self, _node: Self::Node) -> Option<Rect> {
        None
    }

    fn client_size(&self, _node: Self::Node) -> Option<Size> {
        None
    }

    fn is_element(&self, node: Self::Node) -> bool {
        self.kind(node) == NodeKind::Element
    }

    /// Parent link restricted to elements (`parentElement`).
    fn parent_element(&self, node: Self::Node) -> Option<Self::Node> {
        self.parent(node).filter(|p| self.is_element(*p))
    }

    /// Element children only, skipping text and other node kinds.
    fn element_children(&self, node: Self::Node) -> Vec<Self::Node> {
        self.children(node)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// The document that owns `node`; a document owns itself.
    ///
    /// Nested frame documents have no parent, so a node inside a frame
    /// resolves to the frame's document rather than the outer one. Detached
    /// nodes resolve to `None`.
    fn document_of(&self, node: Self::Node) -> Option<Self::Node> {
        let mut current = node;
        for _ in 0..MAX_ANCESTOR_STEPS {
            if self.kind(current) == NodeKind::Document {
                return Some(current);
            }
            current = self.parent(current)?;
        }
        None
    }

    /// First element child of a document (`documentElement`).
    fn document_element(&self, document: Self::Node) -> Option<Self::Node> {
        self.element_children(document).into_iter().next()
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut current = node;
        for _ in 0..MAX_ANCESTOR_STEPS {
            if current == ancestor {
                return true;
            }
            match self.parent(current) {
                Some(p) => current = p,
                None => return false,
            }
        }
        false
    }

    /// `getElementById` on a document, case-insensitive like `id` matching.
    fn element_by_id(&self, document: Self::Node, id: &str) -> Option<Self::Node> {
        let wanted = id.to_lowercase();
        descendants(self, document).into_iter().find(|node| {
            self.attribute(*node, "id")
                .is_some_and(|value| value.to_lowercase() == wanted)
        })
    }

    /// `getElementsByTagName` on `scope`: descendant elements, ASCII
    /// case-insensitive, `*` matching everything.
    fn elements_by_tag_name(&self, scope: Self::Node, tag: &str) -> Vec<Self::Node> {
        descendants(self, scope)
            .into_iter()
            .filter(|node| {
                tag == "*"
                    || self
                        .tag_name(*node)
                        .is_some_and(|name| name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    /// Indexed `getElementsByClassName` on `scope`, if the host has one.
    fn elements_by_class_name(&self, _scope: Self::Node, _class: &str) -> Option<Vec<Self::Node>> {
        None
    }

    /// Document-wide `.class` selector lookup, if the host supports selectors.
    fn select_by_class(&self, _document: Self::Node, _class: &str) -> Option<Vec<Self::Node>> {
        None
    }

    /// Nested document of a frame element (`contentDocument`).
    fn content_document(&self, _node: Self::Node) -> Option<Self::Node> {
        None
    }
}

/// Every frame document nested under `document`, breadth first, so outer
/// frames come before the frames they embed. `document` itself is excluded.
pub fn frame_documents<T: NodeTree + ?Sized>(tree: &T, document: T::Node) -> Vec<T::Node> {
    let mut out: Vec<T::Node> = Vec::new();
    let mut queue = VecDeque::from([document]);
    while let Some(doc) = queue.pop_front() {
        for node in descendants(tree, doc) {
            if let Some(nested) = tree.content_document(node) {
                if nested != document && !out.contains(&nested) {
                    out.push(nested);
                    queue.push_back(nested);
                }
            }
        }
    }
    out
}

/// Descendant elements of `scope` in document order, excluding `scope`.
pub fn descendants<T: NodeTree + ?Sized>(tree: &T, scope: T::Node) -> Vec<T::Node> {
    let mut out = Vec::new();
    let mut stack: Vec<T::Node> = tree.element_children(scope).into_iter().rev().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(tree.element_children(node).into_iter().rev());
    }
    out
}

/// Ancestor elements of `node`, nearest first, bounded by [`MAX_ANCESTOR_STEPS`].
pub fn ancestors<T: NodeTree + ?Sized>(tree: &T, node: T::Node) -> Ancestors<'_, T> {
    Ancestors {
        tree,
        current: tree.parent_element(node),
        origin: node,
        steps: 0,
    }
}

/// Iterator returned by [`ancestors`].
pub struct Ancestors<'a, T: NodeTree + ?Sized> {
    tree: &'a T,
    current: Option<T::Node>,
    origin: T::Node,
    steps: usize,
}

impl<T: NodeTree + ?Sized> Iterator for Ancestors<'_, T> {
    type Item = T::Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current?;
        if node == self.origin || self.steps >= MAX_ANCESTOR_STEPS {
            tracing::trace!(steps = self.steps, "ancestor walk truncated");
            self.current = None;
            return None;
        }
        self.steps += 1;
        self.current = self.tree.parent_element(node);
        Some(node)
    }
}
