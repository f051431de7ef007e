//! Data Models
//!
//! This module contains the data structures shared across the index:
//!
//! - `Node` - the record held by the store, with its tree and web relations
//! - `Query` / `Projection` - field selection for read operations
//! - Relation vocabulary (`RefKind`, `FamilyRelation`, `Family`, ...)

mod node;
mod query;
mod relation;

pub use node::{
    Attrs, Embed, InitNode, Link, MediaKind, Node, NodeData, NodeInit, NodeKind,
    DEFAULT_NODE_TYPE,
};
pub use query::{Projection, Query};
pub use relation::{Family, FamilyRelation, RefKind, Structure, SubtreeEntry};
