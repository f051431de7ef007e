//! Node Data Structures
//!
//! This module defines the `Node` record held by the index, along with the
//! relation payloads it carries (`Link`, `Embed`, attribute buckets) and the
//! `InitNode` shape used for bulk construction.
//!
//! # Pseudo-pointers
//!
//! Nodes never hold references to each other. Every relation (children, attrs,
//! links, embeds) stores the target's id, and the store resolves that id on
//! each access.
//!
//! # Examples
//!
//! ```rust
//! use nodeweave_core::models::{Node, NodeKind};
//! use serde_json::json;
//!
//! let node = Node::new(
//!     "1".to_string(),
//!     NodeKind::Document,
//!     Some("default".to_string()),
//!     json!({ "uri": "file://data/1", "filename": "one" })
//!         .as_object()
//!         .cloned()
//!         .unwrap_or_default(),
//! );
//! assert!(node.children.is_empty());
//! assert!(!node.is_zombie());
//! ```

use crate::models::Structure;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Default document type assigned when none is given
pub const DEFAULT_NODE_TYPE: &str = "default";

/// Application payload carried by a node
pub type NodeData = Map<String, Value>;

/// Attribute relations: relation type label → target ids
pub type Attrs = BTreeMap<String, BTreeSet<String>>;

/// What a node represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Markdown document
    #[serde(rename = "doc")]
    Document,
    /// Media file (target of embeds)
    Media,
    /// Document that defines doctype attrs
    Template,
    /// Referenced, but no document exists (yet)
    Zombie,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Document => "doc",
            NodeKind::Media => "media",
            NodeKind::Template => "template",
            NodeKind::Zombie => "zombie",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doc" => Ok(NodeKind::Document),
            "media" => Ok(NodeKind::Media),
            "template" => Ok(NodeKind::Template),
            "zombie" => Ok(NodeKind::Zombie),
            other => Err(format!("unknown node kind: {}", other)),
        }
    }
}

/// Media kind of an embed
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Markdown,
    Pdf,
    Audio,
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Markdown => "markdown",
            MediaKind::Pdf => "pdf",
            MediaKind::Audio => "audio",
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Resolve a relation type label to a media kind.
    ///
    /// An empty label means the default (`markdown`).
    pub fn from_label(label: &str) -> Option<Self> {
        if label.is_empty() {
            return Some(MediaKind::Markdown);
        }
        label.parse().ok()
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" => Ok(MediaKind::Markdown),
            "pdf" => Ok(MediaKind::Pdf),
            "audio" => Ok(MediaKind::Audio),
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(format!("invalid media kind: {}", other)),
        }
    }
}

/// A typed, directed link to another node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub link_type: String,
    pub id: String,
}

impl Link {
    pub fn new(link_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            link_type: link_type.into(),
            id: id.into(),
        }
    }
}

/// An embed of another node, tagged by media kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Embed {
    pub media: MediaKind,
    pub id: String,
}

impl Embed {
    pub fn new(media: MediaKind, id: impl Into<String>) -> Self {
        Self {
            media,
            id: id.into(),
        }
    }
}

/// Optional type information supplied when a node is created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl NodeInit {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

/// One item of the construction input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitNode {
    #[serde(default)]
    pub init: NodeInit,
    #[serde(default)]
    pub data: NodeData,
}

impl InitNode {
    pub fn new(init: NodeInit, data: NodeData) -> Self {
        Self { init, data }
    }
}

/// A record in the index.
///
/// The serialized shape `{id, kind, type, data, children, attrs, links, embeds}`
/// is the contract external tooling depends on; `type` is `null` for zombies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(rename = "type")]
    pub node_type: Option<String>,
    pub data: NodeData,
    /// Tree edges (ordered)
    #[serde(default)]
    pub children: Vec<String>,
    /// Web edges
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl Node {
    pub fn new(id: String, kind: NodeKind, node_type: Option<String>, data: NodeData) -> Self {
        Self {
            id,
            kind,
            node_type,
            data,
            children: Vec::new(),
            attrs: Attrs::new(),
            links: Vec::new(),
            embeds: Vec::new(),
        }
    }

    pub fn is_zombie(&self) -> bool {
        self.kind == NodeKind::Zombie
    }

    /// Clear relations of one structure, or all of them with `None`
    pub fn flush(&mut self, structure: Option<Structure>) {
        if matches!(structure, None | Some(Structure::Tree)) {
            self.children.clear();
        }
        if matches!(structure, None | Some(Structure::Web)) {
            self.attrs.clear();
            self.links.clear();
            self.embeds.clear();
        }
    }

    pub fn in_children(&self, id: &str) -> bool {
        self.children.iter().any(|child| child == id)
    }

    pub fn in_attrs(&self, id: &str) -> bool {
        self.attrs.values().any(|ids| ids.contains(id))
    }

    pub fn in_links(&self, id: &str) -> bool {
        self.links.iter().any(|link| link.id == id)
    }

    pub fn in_embeds(&self, id: &str) -> bool {
        self.embeds.iter().any(|embed| embed.id == id)
    }

    /// Ids this node references through attrs, links and embeds, in that order
    pub fn web_targets(&self) -> Vec<String> {
        self.attrs
            .values()
            .flat_map(|ids| ids.iter().cloned())
            .chain(self.links.iter().map(|link| link.id.clone()))
            .chain(self.embeds.iter().map(|embed| embed.id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Node {
        let mut node = Node::new(
            "1".to_string(),
            NodeKind::Document,
            Some(DEFAULT_NODE_TYPE.to_string()),
            json!({ "uri": "file://data/1" }).as_object().cloned().unwrap(),
        );
        node.children.push("2".to_string());
        node.attrs
            .entry("tags".to_string())
            .or_default()
            .insert("3".to_string());
        node.links.push(Link::new("", "4"));
        node.embeds.push(Embed::new(MediaKind::Markdown, "5"));
        node
    }

    #[test]
    fn test_membership_checks() {
        let node = sample();
        assert!(node.in_children("2"));
        assert!(node.in_attrs("3"));
        assert!(node.in_links("4"));
        assert!(node.in_embeds("5"));
        assert!(!node.in_links("2"));
        assert_eq!(node.web_targets(), vec!["3", "4", "5"]);
    }

    #[test]
    fn test_flush_by_structure() {
        let mut node = sample();
        node.flush(Some(Structure::Tree));
        assert!(node.children.is_empty());
        assert!(!node.links.is_empty());

        let mut node = sample();
        node.flush(Some(Structure::Web));
        assert_eq!(node.children, vec!["2"]);
        assert!(node.attrs.is_empty() && node.links.is_empty() && node.embeds.is_empty());

        let mut node = sample();
        node.flush(None);
        assert!(node.children.is_empty() && node.attrs.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["kind"], "doc");
        assert_eq!(json["type"], "default");
        assert_eq!(json["links"][0], json!({ "type": "", "id": "4" }));
        assert_eq!(json["embeds"][0], json!({ "media": "markdown", "id": "5" }));
        assert_eq!(json["attrs"]["tags"], json!(["3"]));
    }

    #[test]
    fn test_zombie_type_serializes_as_null() {
        let zombie = Node::new(
            "404".to_string(),
            NodeKind::Zombie,
            None,
            json!({ "filename": "missing" }).as_object().cloned().unwrap(),
        );
        let json = serde_json::to_value(&zombie).unwrap();
        assert!(json["type"].is_null());
        assert_eq!(json["kind"], "zombie");
    }

    #[test]
    fn test_media_kind_labels() {
        assert_eq!(MediaKind::from_label(""), Some(MediaKind::Markdown));
        assert_eq!(MediaKind::from_label("markdown"), Some(MediaKind::Markdown));
        assert_eq!(MediaKind::from_label("pdf"), Some(MediaKind::Pdf));
        assert_eq!(MediaKind::from_label("gif"), None);
    }

    #[test]
    fn test_init_node_deserialization() {
        let item: InitNode = serde_json::from_value(json!({
            "init": { "id": "1", "kind": "template", "type": "entry" },
            "data": { "filename": "one" }
        }))
        .unwrap();
        assert_eq!(item.init.id.as_deref(), Some("1"));
        assert_eq!(item.init.kind, Some(NodeKind::Template));
        assert_eq!(item.init.node_type.as_deref(), Some("entry"));
        assert_eq!(item.data["filename"], "one");
    }
}
