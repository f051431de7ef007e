//! Capability composition
//!
//! `NodeStore` is the arena; the tree and web engines are traits with
//! provided methods that reach the arena through [`Capability`]. A concrete
//! index is a struct that owns a store (plus any state its capabilities
//! need, such as the tree root) and opts into the engines it wants:
//!
//! - [`TreeIndex`] - store + tree engine
//! - [`WebIndex`] - store + web engine
//! - [`NodeIndex`] - store + both engines
//!
//! All three deref to their `NodeStore`, so base operations are available
//! directly on the composite.

use crate::config::IndexConfig;
use crate::db::{NodeStore, Result};
use crate::models::{InitNode, Projection};
use crate::services::{TreeEngine, WebEngine};
use serde_json::Value;
use std::ops::{Deref, DerefMut};

/// Access to the underlying node arena
pub trait Capability {
    fn store(&self) -> &NodeStore;
    fn store_mut(&mut self) -> &mut NodeStore;
}

impl Capability for NodeStore {
    fn store(&self) -> &NodeStore {
        self
    }

    fn store_mut(&mut self) -> &mut NodeStore {
        self
    }
}

macro_rules! store_composite {
    ($name:ident) => {
        impl Capability for $name {
            fn store(&self) -> &NodeStore {
                &self.store
            }

            fn store_mut(&mut self) -> &mut NodeStore {
                &mut self.store
            }
        }

        impl Deref for $name {
            type Target = NodeStore;

            fn deref(&self) -> &NodeStore {
                &self.store
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut NodeStore {
                &mut self.store
            }
        }

        impl From<NodeStore> for $name {
            fn from(store: NodeStore) -> Self {
                Self::from_store(store)
            }
        }
    };
}

/// Node store with a single-rooted tree over `children`
#[derive(Debug)]
pub struct TreeIndex {
    store: NodeStore,
    root: Option<String>,
}

impl TreeIndex {
    pub fn new(items: Vec<InitNode>, config: IndexConfig) -> Result<Self> {
        Ok(Self::from_store(NodeStore::new(items, config)?))
    }

    pub fn from_store(store: NodeStore) -> Self {
        Self { store, root: None }
    }

    pub fn into_store(self) -> NodeStore {
        self.store
    }
}

impl TreeEngine for TreeIndex {
    fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    fn root_slot_mut(&mut self) -> &mut Option<String> {
        &mut self.root
    }
}

store_composite!(TreeIndex);

/// Node store with attribute/link/embed relations
#[derive(Debug)]
pub struct WebIndex {
    store: NodeStore,
}

impl WebIndex {
    pub fn new(items: Vec<InitNode>, config: IndexConfig) -> Result<Self> {
        Ok(Self::from_store(NodeStore::new(items, config)?))
    }

    pub fn from_store(store: NodeStore) -> Self {
        Self { store }
    }

    pub fn into_store(self) -> NodeStore {
        self.store
    }
}

impl WebEngine for WebIndex {}

store_composite!(WebIndex);

/// Node store with both the tree and the web engine
#[derive(Debug)]
pub struct NodeIndex {
    store: NodeStore,
    root: Option<String>,
}

impl NodeIndex {
    pub fn new(items: Vec<InitNode>, config: IndexConfig) -> Result<Self> {
        Ok(Self::from_store(NodeStore::new(items, config)?))
    }

    pub fn from_store(store: NodeStore) -> Self {
        Self { store, root: None }
    }

    pub fn into_store(self) -> NodeStore {
        self.store
    }

    /// Nodes among `ids` that are both orphans and floaters
    pub fn rogues(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.store.check_lock()?;
        let floaters = self.floaters()?;
        Ok(self
            .orphans(ids)?
            .into_iter()
            .filter(|id| floaters.contains(id))
            .collect())
    }

    pub fn rogues_with(&self, ids: &[&str], projection: &Projection) -> Result<Vec<Value>> {
        self.rogues(ids)?
            .iter()
            .filter_map(|id| self.store.node(id))
            .map(|node| self.store.project(node, projection))
            .collect()
    }
}

impl TreeEngine for NodeIndex {
    fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    fn root_slot_mut(&mut self) -> &mut Option<String> {
        &mut self.root
    }
}

impl WebEngine for NodeIndex {}

store_composite!(NodeIndex);
