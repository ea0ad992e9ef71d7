//! JSON snapshots of rendered documents.
//!
//! A snapshot captures what the engine needs from a live page: tags,
//! attributes, the visibility-relevant slice of computed style, layout
//! boxes, and nested frame documents.
//!
//! ```json
//! {
//!   "base_url": "http://localhost:9876/",
//!   "root": {
//!     "tag": "html",
//!     "children": [
//!       { "tag": "body", "children": [
//!         { "tag": "div", "attributes": { "id": "ad", "class": "banner" },
//!           "style": { "display": "block" },
//!           "rect": { "width": 300, "height": 250 } },
//!         { "text": "hello" }
//!       ] }
//!     ]
//!   }
//! }
//! ```

use crate::tree::errors::SnapshotError;
use crate::tree::memory::{MemoryTree, NodeId};
use crate::tree::{ComputedStyle, Rect, Size};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub base_url: Option<String>,
    pub root: ElementSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NodeSnapshot {
    Text { text: String },
    Element(ElementSnapshot),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ElementSnapshot {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub style: Option<StyleSnapshot>,
    #[serde(default)]
    pub rect: Option<RectSnapshot>,
    #[serde(default)]
    pub client: Option<SizeSnapshot>,
    #[serde(default)]
    pub children: Vec<NodeSnapshot>,
    /// Content document when this element is a frame.
    #[serde(default)]
    pub frame: Option<Box<Snapshot>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleSnapshot {
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub visibility: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RectSnapshot {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SizeSnapshot {
    pub width: f64,
    pub height: f64,
}

impl Snapshot {
    /// Materialize the snapshot into `tree`, returning the new document node.
    pub fn build_into(&self, tree: &mut MemoryTree) -> Result<NodeId, SnapshotError> {
        let base_url = match self.base_url.as_deref() {
            Some(raw) => Some(Url::parse(raw).map_err(|source| SnapshotError::BaseUrl {
                url: raw.to_string(),
                source,
            })?),
            None => None,
        };
        let document = tree.create_document(base_url);
        build_element(tree, document, &self.root)?;
        Ok(document)
    }
}

fn build_element(
    tree: &mut MemoryTree,
    parent: NodeId,
    snapshot: &ElementSnapshot,
) -> Result<NodeId, SnapshotError> {
    let node = tree.create_element(&snapshot.tag);
    for (name, value) in &snapshot.attributes {
        tree.set_attribute(node, name, value)?;
    }
    if let Some(style) = &snapshot.style {
        tree.set_style(
            node,
            ComputedStyle {
                display: style.display.clone(),
                visibility: style.visibility.clone(),
            },
        )?;
    }
    if let Some(rect) = snapshot.rect {
        tree.set_rect(
            node,
            Rect {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
            },
        )?;
    }
    if let Some(client) = snapshot.client {
        tree.set_client_size(
            node,
            Size {
                width: client.width,
                height: client.height,
            },
        )?;
    }
    tree.append_child(parent, node)?;

    for child in &snapshot.children {
        match child {
            NodeSnapshot::Text { text } => {
                tree.text(node, text);
            }
            NodeSnapshot::Element(element) => {
                build_element(tree, node, element)?;
            }
        }
    }

    if let Some(frame) = &snapshot.frame {
        let content = frame.build_into(tree)?;
        tree.attach_frame(node, content)?;
    }

    Ok(node)
}

/// Parse a snapshot and build a fresh tree. Returns the tree and its document.
pub fn load_snapshot_str(input: &str) -> Result<(MemoryTree, NodeId), SnapshotError> {
    let snapshot: Snapshot =
        serde_json::from_str(input).map_err(|source| SnapshotError::Json { path: None, source })?;
    let mut tree = MemoryTree::new();
    let document = snapshot.build_into(&mut tree)?;
    tracing::debug!(nodes = tree.len(), "snapshot loaded");
    Ok((tree, document))
}

pub fn load_snapshot_path(path: impl AsRef<Path>) -> Result<(MemoryTree, NodeId), SnapshotError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_snapshot_str(&contents).map_err(|error| error.with_path(path))
}
