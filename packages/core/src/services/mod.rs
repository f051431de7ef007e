//! Index Capabilities
//!
//! The engines that give a `NodeStore` its structure:
//!
//! - `TreeEngine` - single-rooted hierarchy over `children`, family queries,
//!   graft/prune/replace/transplant with rollback
//! - `WebEngine` - attrs, links and embeds with forward and backward lookups
//!
//! Both are traits with provided methods over [`Capability`], composed into
//! the concrete `TreeIndex`, `WebIndex` and `NodeIndex` types.

mod capability;
mod family_search;
mod tree;
mod web;

pub use capability::{Capability, NodeIndex, TreeIndex, WebIndex};
pub use tree::TreeEngine;
pub use web::WebEngine;
