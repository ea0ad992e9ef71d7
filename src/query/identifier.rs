use crate::query::errors::IdentifierError;
use crate::query::value::{extract_path, match_text, match_value, parse_int, trim_px};
use crate::tree::{ancestors, NodeTree, PropertyValue, Rect, Size};
use std::fmt;
use std::str::FromStr;

/// What a predicate tests, independent of where it looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateKind {
    /// `id` attribute.
    Id,
    /// Membership in the whitespace-separated `class` list.
    Class,
    /// Tag name.
    Tag,
    /// URL-valued `src`; path-only when the value starts with `/`.
    Src,
    /// Exact pixel width.
    Width,
    /// Exact pixel height.
    Height,
    /// Effective visibility, inherited down the ancestor chain.
    Visible,
    /// Unrecognized property. Stored, never matches.
    Unknown,
}

/// Which node a predicate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    SelfNode,
    Parent,
    AnyAncestor,
}

impl PredicateKind {
    /// Kinds that accept a `p` / `pp` scope prefix.
    fn scopable(base: &str) -> Option<Self> {
        match base {
            "id" => Some(PredicateKind::Id),
            "cl" => Some(PredicateKind::Class),
            "tag" => Some(PredicateKind::Tag),
            _ => None,
        }
    }

    /// Split a rule property such as `ppcl` into its kind and scope.
    pub fn classify(property: &str) -> (PredicateKind, Scope) {
        match property {
            "src" => return (PredicateKind::Src, Scope::SelfNode),
            "w" => return (PredicateKind::Width, Scope::SelfNode),
            "h" => return (PredicateKind::Height, Scope::SelfNode),
            "vis" => return (PredicateKind::Visible, Scope::SelfNode),
            _ => {}
        }
        let prefixes = [
            ("pp", Scope::AnyAncestor),
            ("p", Scope::Parent),
            ("", Scope::SelfNode),
        ];
        for (prefix, scope) in prefixes {
            if let Some(kind) = property.strip_prefix(prefix).and_then(Self::scopable) {
                return (kind, scope);
            }
        }
        (PredicateKind::Unknown, Scope::SelfNode)
    }

    /// Whether [`Identifier::roots`] can use a host index for this kind.
    pub fn is_indexable(self) -> bool {
        matches!(
            self,
            PredicateKind::Id | PredicateKind::Class | PredicateKind::Tag
        )
    }
}

/// A single `property=value` test.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    property: String,
    value: String,
    kind: PredicateKind,
    scope: Scope,
    wildcard: bool,
}

impl Identifier {
    /// Build a predicate. Fails if `property` is empty or contains `=` or
    /// `;`, since such a property could never be written back as rule text.
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Result<Self, IdentifierError> {
        let property = property.into();
        let value = value.into();
        if property.is_empty() {
            return Err(IdentifierError::EmptyProperty);
        }
        if let Some(found) = property.chars().find(|c| *c == '=' || *c == ';') {
            return Err(IdentifierError::InvalidProperty { property, found });
        }
        let (kind, scope) = PredicateKind::classify(&property);
        let wildcard = value.starts_with('~');
        Ok(Self {
            property,
            value,
            kind,
            scope,
            wildcard,
        })
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> PredicateKind {
        self.kind
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// `true` when the value starts with `~` (contains instead of equals).
    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// `property=value`.
    pub fn encode(&self) -> String {
        format!("{}={}", self.property, self.value)
    }

    /// Evaluate the predicate against one node.
    pub fn matches<T: NodeTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        match self.kind {
            PredicateKind::Unknown => false,
            PredicateKind::Width => self.match_dimension(tree, node, |r| r.width, |s| s.width),
            PredicateKind::Height => self.match_dimension(tree, node, |r| r.height, |s| s.height),
            PredicateKind::Visible => self.match_visibility(tree, node),
            PredicateKind::Id | PredicateKind::Class | PredicateKind::Tag | PredicateKind::Src => {
                match self.scope {
                    Scope::SelfNode => self.match_base(tree, node),
                    Scope::Parent => tree
                        .parent_element(node)
                        .filter(|parent| *parent != node)
                        .is_some_and(|parent| self.match_base(tree, parent)),
                    Scope::AnyAncestor => {
                        ancestors(tree, node).any(|ancestor| self.match_base(tree, ancestor))
                    }
                }
            }
        }
    }

    /// The unscoped test for id/class/tag/src kinds.
    fn match_base<T: NodeTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        if !tree.is_element(node) {
            return false;
        }
        match self.kind {
            PredicateKind::Id => match_value(tree.property(node, "id").as_ref(), &self.value),
            PredicateKind::Class => {
                let classes = match tree.attribute(node, "class") {
                    Some(classes) => classes.to_string(),
                    None => match tree.property(node, "className") {
                        Some(PropertyValue::Text(classes)) => classes,
                        _ => return false,
                    },
                };
                classes
                    .split_whitespace()
                    .any(|class| match_text(class, &self.value))
            }
            PredicateKind::Tag => tree
                .tag_name(node)
                .is_some_and(|tag| match_text(tag, &self.value)),
            PredicateKind::Src if self.value.starts_with('/') => {
                let raw = match tree.attribute(node, "src") {
                    Some(raw) if !raw.is_empty() => raw.to_string(),
                    _ => match tree.property(node, "src") {
                        Some(PropertyValue::Text(resolved)) => resolved,
                        _ => String::new(),
                    },
                };
                match_text(&extract_path(&raw), &extract_path(&self.value))
            }
            PredicateKind::Src => match_value(tree.property(node, "src").as_ref(), &self.value),
            _ => false,
        }
    }

    fn match_dimension<T: NodeTree + ?Sized>(
        &self,
        tree: &T,
        node: T::Node,
        from_rect: fn(&Rect) -> f64,
        from_client: fn(&Size) -> f64,
    ) -> bool {
        let Some(expected) = parse_int(trim_px(&self.value)) else {
            return false;
        };
        if let Some(rect) = tree.bounding_rect(node) {
            return from_rect(&rect) == expected;
        }
        tree.client_size(node)
            .is_some_and(|size| from_client(&size) == expected)
    }

    fn match_visibility<T: NodeTree + ?Sized>(&self, tree: &T, node: T::Node) -> bool {
        let want_visible = if self.value.eq_ignore_ascii_case("true") {
            true
        } else if self.value.eq_ignore_ascii_case("false") {
            false
        } else {
            return false;
        };
        effectively_visible(tree, node) == want_visible
    }

    /// Candidate search roots under `subtree_root`.
    ///
    /// Indexable kinds ask the host for hits and keep those inside the
    /// subtree. The subtree root is proposed as well when it, or for `p`/`pp`
    /// its parent or an ancestor, satisfies the test, so matches on the
    /// subtree boundary are still reached. Anything unindexable degrades to
    /// `[subtree_root]`, a full scan.
    pub fn roots<T: NodeTree + ?Sized>(&self, tree: &T, subtree_root: Option<T::Node>) -> Vec<T::Node> {
        let Some(root) = subtree_root else {
            return Vec::new();
        };
        if self.wildcard || !self.kind.is_indexable() {
            return self.full_scan(root);
        }

        let hits = match self.kind {
            PredicateKind::Id => match tree.document_of(root) {
                Some(document) => tree.element_by_id(document, &self.value).into_iter().collect(),
                None => return self.full_scan(root),
            },
            PredicateKind::Class => match tree.elements_by_class_name(root, &self.value) {
                Some(hits) => hits,
                None => match tree
                    .document_of(root)
                    .and_then(|document| tree.select_by_class(document, &self.value))
                {
                    Some(hits) => hits,
                    None => return self.full_scan(root),
                },
            },
            PredicateKind::Tag => tree.elements_by_tag_name(root, &self.value),
            _ => return self.full_scan(root),
        };

        let mut roots = Vec::new();
        if self.boundary_matches(tree, root) {
            roots.push(root);
        }
        roots.extend(
            hits.into_iter()
                .filter(|hit| *hit != root && tree.contains(root, *hit)),
        );
        roots
    }

    fn full_scan<N: fmt::Debug>(&self, root: N) -> Vec<N> {
        tracing::trace!(property = %self.property, ?root, "no index for predicate, scanning subtree");
        vec![root]
    }

    fn boundary_matches<T: NodeTree + ?Sized>(&self, tree: &T, root: T::Node) -> bool {
        if self.match_base(tree, root) {
            return true;
        }
        match self.scope {
            Scope::SelfNode => false,
            Scope::Parent => tree
                .parent_element(root)
                .is_some_and(|parent| self.match_base(tree, parent)),
            Scope::AnyAncestor => ancestors(tree, root).any(|ancestor| self.match_base(tree, ancestor)),
        }
    }
}

/// Visible itself and through every ancestor. Nodes without style count as visible.
pub fn effectively_visible<T: NodeTree + ?Sized>(tree: &T, node: T::Node) -> bool {
    let shown = |n: T::Node| tree.computed_style(n).map_or(true, |style| style.is_visible());
    shown(node) && ancestors(tree, node).all(shown)
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.property, self.value)
    }
}

impl FromStr for Identifier {
    type Err = crate::query::errors::ParseError;

    /// Parse a single `property=value` segment; the value may contain `=`.
    fn from_str(segment: &str) -> Result<Self, Self::Err> {
        use crate::query::errors::ParseError;
        let (property, value) = segment
            .split_once('=')
            .ok_or_else(|| ParseError::MissingSeparator {
                segment: segment.to_string(),
            })?;
        Identifier::new(property, value).map_err(|source| ParseError::InvalidIdentifier {
            segment: segment.to_string(),
            source,
        })
    }
}
