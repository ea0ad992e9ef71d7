//! Arena-backed [`NodeTree`] implementation.
//!
//! Every node lives in one `Vec`; handles are indexes. Several documents can
//! share an arena, which is how embedded frames are modelled: a frame element
//! points at a separate document node that has no parent of its own.
//!
//! Id and class lookups go through indexes keyed by the lowercased name so
//! they agree with the case-insensitive predicate matching.

use crate::tree::errors::TreeError;
use crate::tree::{ComputedStyle, NodeKind, NodeTree, PropertyValue, Rect, Size};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;
use url::Url;

/// Handle into a [`MemoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Document {
        base_url: Option<Url>,
        frame_owner: Option<NodeId>,
    },
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, Default)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    style: ComputedStyle,
    rect: Option<Rect>,
    client: Option<Size>,
    frame: Option<NodeId>,
}

impl ElementData {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// In-memory document arena.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree {
    nodes: Vec<Node>,
    id_index: HashMap<String, Vec<NodeId>>,
    class_index: HashMap<String, Vec<NodeId>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    fn element_data(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.data {
            NodeData::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_data_mut(&mut self, id: NodeId) -> Result<&mut ElementData, TreeError> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Ok(element),
            _ => Err(TreeError::NotAnElement { node: id.0 }),
        }
    }

    /// Create a new, empty document. `base_url` resolves relative `src` values.
    pub fn create_document(&mut self, base_url: Option<Url>) -> NodeId {
        self.push(NodeData::Document {
            base_url,
            frame_owner: None,
        })
    }

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag: tag.to_string(),
            ..ElementData::default()
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    /// Append `child` under `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        for node in [parent, child] {
            if self.node(node).is_none() {
                return Err(TreeError::UnknownNode { node: node.0 });
            }
        }
        if matches!(self.kind(child), NodeKind::Document) {
            return Err(TreeError::DocumentChild { node: child.0 });
        }
        if self.contains(child, parent) {
            return Err(TreeError::Hierarchy {
                parent: parent.0,
                child: child.0,
            });
        }
        if let Some(old) = self.nodes[child.0].parent.take() {
            self.nodes[old.0].children.retain(|c| *c != child);
        }
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    /// Create an element with attributes and append it to `parent`.
    ///
    /// The element stays detached when `parent` is not in this tree.
    pub fn element(&mut self, parent: NodeId, tag: &str, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attributes {
            self.write_attribute(id, name, value);
        }
        self.attach_new(parent, id);
        id
    }

    /// Create a text node and append it to `parent`, detached on failure
    /// like [`MemoryTree::element`].
    pub fn text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_text(text);
        self.attach_new(parent, id);
        id
    }

    fn attach_new(&mut self, parent: NodeId, child: NodeId) {
        if let Err(error) = self.append_child(parent, child) {
            warn!(%parent, %child, %error, "new node left detached");
        }
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), TreeError> {
        self.element_data_mut(node)?;
        self.write_attribute(node, name, value);
        Ok(())
    }

    fn write_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let previous = self
            .element_data(node)
            .and_then(|element| element.attribute(&name))
            .map(str::to_string);

        match name.as_str() {
            "id" => {
                if let Some(old) = &previous {
                    unindex(&mut self.id_index, &old.to_lowercase(), node);
                }
                if !value.is_empty() {
                    index(&mut self.id_index, value.to_lowercase(), node);
                }
            }
            "class" => {
                if let Some(old) = &previous {
                    for token in old.split_whitespace() {
                        unindex(&mut self.class_index, &token.to_lowercase(), node);
                    }
                }
                for token in value.split_whitespace() {
                    index(&mut self.class_index, token.to_lowercase(), node);
                }
            }
            _ => {}
        }

        if let Some(NodeData::Element(element)) = self.nodes.get_mut(node.0).map(|n| &mut n.data) {
            match element.attributes.iter_mut().find(|(key, _)| *key == name) {
                Some((_, slot)) => *slot = value.to_string(),
                None => element.attributes.push((name, value.to_string())),
            }
        }
    }

    pub fn set_style(&mut self, node: NodeId, style: ComputedStyle) -> Result<(), TreeError> {
        self.element_data_mut(node)?.style = style;
        Ok(())
    }

    pub fn set_rect(&mut self, node: NodeId, rect: Rect) -> Result<(), TreeError> {
        self.element_data_mut(node)?.rect = Some(rect);
        Ok(())
    }

    pub fn set_client_size(&mut self, node: NodeId, size: Size) -> Result<(), TreeError> {
        self.element_data_mut(node)?.client = Some(size);
        Ok(())
    }

    /// Embed `document` as the content of the frame element `frame`.
    pub fn attach_frame(&mut self, frame: NodeId, document: NodeId) -> Result<(), TreeError> {
        match self.nodes.get_mut(document.0).map(|n| &mut n.data) {
            Some(NodeData::Document { frame_owner, .. }) => *frame_owner = Some(frame),
            _ => return Err(TreeError::NotADocument { node: document.0 }),
        }
        self.element_data_mut(frame)?.frame = Some(document);
        Ok(())
    }

    /// The frame element embedding `document`, if any.
    pub fn frame_owner(&self, document: NodeId) -> Option<NodeId> {
        match &self.node(document)?.data {
            NodeData::Document { frame_owner, .. } => *frame_owner,
            _ => None,
        }
    }

    pub fn base_url(&self, document: NodeId) -> Option<&Url> {
        match &self.node(document)?.data {
            NodeData::Document { base_url, .. } => base_url.as_ref(),
            _ => None,
        }
    }

    /// Short selector-like label: `div#main.card.wide`.
    pub fn describe(&self, node: NodeId) -> String {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Document { .. }) => "#document".to_string(),
            Some(NodeData::Text(_)) => "#text".to_string(),
            Some(NodeData::Element(element)) => {
                let mut label = element.tag.to_ascii_lowercase();
                if let Some(id) = element.attribute("id").filter(|id| !id.is_empty()) {
                    label.push('#');
                    label.push_str(id);
                }
                for class in element.attribute("class").unwrap_or("").split_whitespace() {
                    label.push('.');
                    label.push_str(class);
                }
                label
            }
            None => format!("<missing {node}>"),
        }
    }

    /// Ancestor path from the document element down to `node`, crossing
    /// frame boundaries: `html > body > iframe | html > body > p`.
    pub fn path(&self, node: NodeId) -> String {
        let mut segments: Vec<String> = Vec::new();
        let mut current = Some(node);
        let mut steps = 0;
        while let Some(id) = current {
            steps += 1;
            if steps > crate::tree::MAX_ANCESTOR_STEPS {
                break;
            }
            match self.kind(id) {
                NodeKind::Document => {
                    current = self.frame_owner(id);
                    if current.is_some() {
                        segments.push("|".to_string());
                    }
                }
                _ => {
                    segments.push(self.describe(id));
                    current = self.parent(id);
                }
            }
        }
        segments.reverse();
        segments.join(" > ").replace(" > | > ", " | ")
    }

    /// Document-order sort key: child positions from the outermost root.
    fn order_key(&self, node: NodeId) -> Vec<usize> {
        let mut key = Vec::new();
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            let position = self.nodes[parent.0]
                .children
                .iter()
                .position(|c| *c == current)
                .unwrap_or(0);
            key.push(position);
            current = parent;
            if key.len() > crate::tree::MAX_ANCESTOR_STEPS {
                break;
            }
        }
        key.push(current.0);
        key.reverse();
        key
    }

    fn in_document_order(&self, mut nodes: Vec<NodeId>) -> Vec<NodeId> {
        nodes.sort_by_cached_key(|node| self.order_key(*node));
        nodes
    }
}

fn index(map: &mut HashMap<String, Vec<NodeId>>, key: String, node: NodeId) {
    let entry = map.entry(key).or_default();
    if !entry.contains(&node) {
        entry.push(node);
    }
}

fn unindex(map: &mut HashMap<String, Vec<NodeId>>, key: &str, node: NodeId) {
    let Some(nodes) = map.get_mut(key) else {
        return;
    };
    nodes.retain(|candidate| *candidate != node);
    if nodes.is_empty() {
        map.remove(key);
    }
}

impl NodeTree for MemoryTree {
    type Node = NodeId;

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.node(node).map(|n| &n.data) {
            Some(NodeData::Document { .. }) => NodeKind::Document,
            Some(NodeData::Element(_)) => NodeKind::Element,
            Some(NodeData::Text(_)) => NodeKind::Text,
            None => NodeKind::Other,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element_data(node).map(|element| element.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element_data(node)?.attribute(name)
    }

    fn property(&self, node: NodeId, name: &str) -> Option<PropertyValue> {
        let element = self.element_data(node)?;
        match name {
            "tagName" => Some(PropertyValue::Text(element.tag.to_ascii_uppercase())),
            "className" => Some(PropertyValue::Text(
                element.attribute("class").unwrap_or("").to_string(),
            )),
            "clientWidth" => Some(PropertyValue::Number(
                element.client.map(|c| c.width).unwrap_or(0.0),
            )),
            "clientHeight" => Some(PropertyValue::Number(
                element.client.map(|c| c.height).unwrap_or(0.0),
            )),
            "src" | "href" => {
                let raw = element.attribute(name)?;
                let resolved = self
                    .document_of(node)
                    .and_then(|doc| self.base_url(doc))
                    .and_then(|base| base.join(raw).ok())
                    .map(String::from)
                    .unwrap_or_else(|| raw.to_string());
                Some(PropertyValue::Text(resolved))
            }
            _ => element
                .attribute(name)
                .map(|value| PropertyValue::Text(value.to_string())),
        }
    }

    fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        self.element_data(node).map(|element| element.style.clone())
    }

    fn bounding_rect(&self, node: NodeId) -> Option<Rect> {
        self.element_data(node)?.rect
    }

    fn client_size(&self, node: NodeId) -> Option<Size> {
        self.element_data(node)?.client
    }

    fn element_by_id(&self, document: NodeId, id: &str) -> Option<NodeId> {
        let candidates = self.id_index.get(&id.to_lowercase())?;
        let attached: Vec<NodeId> = candidates
            .iter()
            .copied()
            .filter(|node| self.document_of(*node) == Some(document))
            .collect();
        self.in_document_order(attached).into_iter().next()
    }

    fn elements_by_class_name(&self, scope: NodeId, class: &str) -> Option<Vec<NodeId>> {
        let hits = match self.class_index.get(&class.to_lowercase()) {
            Some(candidates) => candidates
                .iter()
                .copied()
                .filter(|node| *node != scope && self.contains(scope, *node))
                .collect(),
            None => Vec::new(),
        };
        Some(self.in_document_order(hits))
    }

    fn select_by_class(&self, document: NodeId, class: &str) -> Option<Vec<NodeId>> {
        let hits = match self.class_index.get(&class.to_lowercase()) {
            Some(candidates) => candidates
                .iter()
                .copied()
                .filter(|node| self.document_of(*node) == Some(document))
                .collect(),
            None => Vec::new(),
        };
        Some(self.in_document_order(hits))
    }

    fn content_document(&self, node: NodeId) -> Option<NodeId> {
        self.element_data(node)?.frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> (MemoryTree, NodeId, NodeId, NodeId) {
        let mut tree = MemoryTree::new();
        let doc = tree.create_document(Url::parse("http://localhost:9876/index.html").ok());
        let html = tree.element(doc, "html", &[]);
        let body = tree.element(html, "body", &[]);
        (tree, doc, html, body)
    }

    #[test]
    fn document_element_and_parents() {
        let (tree, doc, html, body) = page();
        assert_eq!(tree.document_element(doc), Some(html));
        assert_eq!(tree.parent(html), Some(doc));
        assert_eq!(tree.parent_element(html), None);
        assert_eq!(tree.parent_element(body), Some(html));
        assert_eq!(tree.document_of(body), Some(doc));
    }

    #[test]
    fn id_index_follows_attribute_changes() {
        let (mut tree, doc, _, body) = page();
        let div = tree.element(body, "div", &[("id", "first")]);
        assert_eq!(tree.element_by_id(doc, "first"), Some(div));
        assert_eq!(tree.element_by_id(doc, "FIRST"), Some(div));

        tree.set_attribute(div, "id", "second").unwrap();
        assert_eq!(tree.element_by_id(doc, "first"), None);
        assert_eq!(tree.element_by_id(doc, "second"), Some(div));
    }

    #[test]
    fn id_lookup_ignores_detached_and_foreign_nodes() {
        let (mut tree, doc, _, _) = page();
        let detached = tree.create_element("div");
        tree.set_attribute(detached, "id", "lost").unwrap();
        assert_eq!(tree.element_by_id(doc, "lost"), None);
        assert_eq!(tree.document_of(detached), None);
    }

    #[test]
    fn class_lookup_is_scoped_and_ordered() {
        let (mut tree, doc, _, body) = page();
        let outer = tree.element(body, "div", &[("class", "card")]);
        let inner = tree.element(outer, "div", &[("class", "wide card")]);
        let late = tree.create_element("section");
        tree.set_attribute(late, "class", "card").unwrap();
        // indexed before it was attached
        tree.append_child(body, late).unwrap();

        assert_eq!(
            tree.elements_by_class_name(body, "card"),
            Some(vec![outer, inner, late])
        );
        assert_eq!(tree.elements_by_class_name(outer, "card"), Some(vec![inner]));
        assert_eq!(tree.select_by_class(doc, "CARD"), Some(vec![outer, inner, late]));
    }

    #[test]
    fn tag_lookup_excludes_scope() {
        let (mut tree, _, html, body) = page();
        let div = tree.element(body, "div", &[]);
        let nested = tree.element(div, "DIV", &[]);
        tree.text(div, "hello");
        assert_eq!(tree.elements_by_tag_name(html, "div"), vec![div, nested]);
        assert_eq!(tree.elements_by_tag_name(div, "div"), vec![nested]);
    }

    #[test]
    fn append_child_rejects_cycles() {
        let (mut tree, doc, html, body) = page();
        assert!(matches!(
            tree.append_child(body, html),
            Err(TreeError::Hierarchy { .. })
        ));
        let other = tree.create_document(None);
        assert!(matches!(
            tree.append_child(html, other),
            Err(TreeError::DocumentChild { .. })
        ));
        assert_eq!(tree.document_element(doc), Some(html));
    }

    #[test]
    fn unknown_ids_are_rejected_without_panicking() {
        let (mut tree, _, html, body) = page();
        let missing = NodeId(tree.len() + 10);
        assert!(matches!(
            tree.append_child(missing, body),
            Err(TreeError::UnknownNode { node }) if node == missing.index()
        ));
        assert!(matches!(
            tree.append_child(body, missing),
            Err(TreeError::UnknownNode { .. })
        ));
        assert_eq!(tree.parent(body), Some(html));

        let orphan = tree.element(missing, "div", &[("id", "orphan")]);
        let note = tree.text(missing, "lost");
        assert_eq!(tree.parent(orphan), None);
        assert_eq!(tree.parent(note), None);
        assert_eq!(tree.children(body), Vec::<NodeId>::new());
    }

    #[test]
    fn append_child_moves_between_parents() {
        let (mut tree, _, html, body) = page();
        let div = tree.element(body, "div", &[]);
        tree.append_child(html, div).unwrap();
        assert_eq!(tree.element_children(body), Vec::<NodeId>::new());
        assert_eq!(tree.element_children(html), vec![body, div]);
    }

    #[test]
    fn src_property_resolves_against_base_url() {
        let (mut tree, _, _, body) = page();
        let img = tree.element(body, "img", &[("src", "/base/foo.html?bar")]);
        assert_eq!(tree.attribute(img, "src"), Some("/base/foo.html?bar"));
        assert_eq!(
            tree.property(img, "src"),
            Some(PropertyValue::Text(
                "http://localhost:9876/base/foo.html?bar".to_string()
            ))
        );
    }

    #[test]
    fn frames_are_separate_documents() {
        let (mut tree, doc, _, body) = page();
        let iframe = tree.element(body, "iframe", &[("id", "ad")]);
        let inner_doc = tree.create_document(None);
        let inner_html = tree.element(inner_doc, "html", &[]);
        let inner_body = tree.element(inner_html, "body", &[("id", "ad")]);
        tree.attach_frame(iframe, inner_doc).unwrap();

        assert_eq!(tree.content_document(iframe), Some(inner_doc));
        assert_eq!(tree.frame_owner(inner_doc), Some(iframe));
        assert_eq!(tree.document_of(inner_body), Some(inner_doc));
        assert_eq!(tree.element_by_id(doc, "ad"), Some(iframe));
        assert_eq!(tree.element_by_id(inner_doc, "ad"), Some(inner_body));
        assert_eq!(crate::tree::frame_documents(&tree, doc), vec![inner_doc]);
        assert_eq!(tree.path(inner_body), "html > body > iframe#ad | html > body#ad");
    }

    #[test]
    fn describe_labels_and_paths() {
        let (mut tree, _, _, body) = page();
        let div = tree.element(body, "div", &[("id", "main"), ("class", "card wide")]);
        let hello = tree.text(div, "hello ");
        let span = tree.element(div, "span", &[]);
        assert_eq!(tree.describe(div), "div#main.card.wide");
        assert_eq!(tree.describe(hello), "#text");
        assert_eq!(tree.path(span), "html > body > div#main.card.wide > span");
    }
}
