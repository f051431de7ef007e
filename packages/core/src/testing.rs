//! Shared fixtures for unit tests

use crate::config::IndexConfig;
use crate::models::{InitNode, NodeData, NodeInit};
use serde_json::{json, Value};

pub(crate) const NAMES: [&str; 5] = ["one", "two", "three", "four", "five"];

pub(crate) fn data(value: Value) -> NodeData {
    value.as_object().cloned().unwrap_or_default()
}

/// Data payload for fixture node `n` (1-based)
pub(crate) fn doc(n: usize) -> NodeData {
    let name = NAMES[n - 1];
    let mut title = name.to_string();
    title[..1].make_ascii_uppercase();
    data(json!({
        "uri": format!("file://data/{}", n),
        "filename": name,
        "title": title,
    }))
}

/// Nodes "1" through "5"
pub(crate) fn docs() -> Vec<InitNode> {
    (1..=5)
        .map(|n| InitNode::new(NodeInit::with_id(n.to_string()), doc(n)))
        .collect()
}

pub(crate) fn config() -> IndexConfig {
    IndexConfig::default()
        .with_uniq_keys(["uri", "filename"])
        .with_zombie_key("filename")
}

pub(crate) fn fixed_id() -> String {
    "404".to_string()
}
