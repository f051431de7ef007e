//! NodeStore - the node arena
//!
//! `NodeStore` owns the id → Node mapping, the unique-key secondary index and
//! the zombie-node policy. The tree and web engines operate exclusively
//! through it.
//!
//! # Architecture
//!
//! - **Arena + ids**: every relation stores ids; nothing holds a reference to
//!   another node, so all traversal resolves ids through the store per call
//! - **Unique keys**: configured data fields are unique across nodes; with
//!   indexing enabled each keeps a value → id map for O(1) `find`
//! - **Zombies**: placeholders for referenced-but-missing documents. They
//!   carry only the zombie field and are promoted back with `fill`
//! - **Lock discipline**: in safe mode every public operation fails with
//!   `StoreError::LockNotHeld` unless the caller holds the index lock
//!   (see [`ConcurrencyGuard`](crate::db::ConcurrencyGuard))
//!
//! # Error Handling
//!
//! Validation failures are not errors. They go to the diagnostic sink and the
//! operation returns `Ok(false)` / `Ok(None)` with the store unchanged.
//!
//! # Examples
//!
//! ```rust
//! use nodeweave_core::{IndexConfig, NodeInit, NodeStore};
//! use serde_json::json;
//!
//! # fn main() -> nodeweave_core::Result<()> {
//! let config = IndexConfig::default()
//!     .with_uniq_keys(["uri", "filename"])
//!     .with_zombie_key("filename");
//! let mut store = NodeStore::new(Vec::new(), config)?;
//!
//! let data = json!({ "uri": "file://data/1", "filename": "one" });
//! store.add(data.as_object().cloned().unwrap_or_default(), NodeInit::with_id("1"))?;
//!
//! let found = store.find("filename", &json!("one"))?;
//! assert_eq!(found.map(|node| node.id.as_str()), Some("1"));
//! # Ok(())
//! # }
//! ```

use crate::config::IndexConfig;
use crate::db::{Result, StoreError};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::ids::{AlphabetGenerator, IdGenerator, UuidGenerator};
use crate::models::{
    InitNode, Node, NodeData, NodeInit, NodeKind, Projection, Query, DEFAULT_NODE_TYPE,
};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Secondary index: unique field → (value → node id)
#[derive(Debug, Clone, Default)]
struct UniqueKeyIndex {
    fields: HashMap<String, HashMap<String, String>>,
}

impl UniqueKeyIndex {
    fn new<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        Self {
            fields: keys
                .into_iter()
                .map(|key| (key.clone(), HashMap::new()))
                .collect(),
        }
    }

    fn indexes(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    fn lookup(&self, key: &str, value: &Value) -> Option<&String> {
        self.fields.get(key)?.get(&value_key(value))
    }

    fn set(&mut self, key: &str, value: &Value, id: &str) {
        if let Some(values) = self.fields.get_mut(key) {
            values.insert(value_key(value), id.to_string());
        }
    }

    /// Point `value` at `id` unless another node already owns it
    fn claim(&mut self, key: &str, value: &Value, id: &str) {
        if let Some(values) = self.fields.get_mut(key) {
            values
                .entry(value_key(value))
                .or_insert_with(|| id.to_string());
        }
    }

    /// Drop the entry for `value` if it still points at `id`
    fn unset(&mut self, key: &str, value: &Value, id: &str) {
        if let Some(values) = self.fields.get_mut(key) {
            let value_key = value_key(value);
            if values.get(&value_key).is_some_and(|owner| owner == id) {
                values.remove(&value_key);
            }
        }
    }

    fn insert_all(&mut self, id: &str, data: &NodeData) {
        for (key, value) in data {
            self.set(key, value, id);
        }
    }

    fn purge(&mut self, id: &str, data: &NodeData, keep: Option<&str>) {
        for (key, value) in data {
            if Some(key.as_str()) != keep {
                self.unset(key, value, id);
            }
        }
    }

    /// Indexed entries of `data` that currently have no owner
    fn vacant<'a>(&self, data: &'a NodeData) -> Vec<(&'a String, &'a Value)> {
        data.iter()
            .filter(|(key, value)| {
                self.fields
                    .get(key.as_str())
                    .is_some_and(|values| !values.contains_key(&value_key(value)))
            })
            .collect()
    }

    fn clear(&mut self) {
        for values in self.fields.values_mut() {
            values.clear();
        }
    }
}

/// Key used for a data value in the secondary index
fn value_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// In-memory node index
pub struct NodeStore {
    index: BTreeMap<String, Node>,
    uniq_index: UniqueKeyIndex,
    uniq_keys: Vec<String>,
    zombie_key: String,
    config: IndexConfig,
    ids: Arc<dyn IdGenerator>,
    diagnostics: Arc<dyn DiagnosticSink>,
    safe: bool,
    lock_held: bool,
}

impl fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeStore")
            .field("nodes", &self.index.len())
            .field("uniq_keys", &self.uniq_keys)
            .field("zombie_key", &self.zombie_key)
            .field("safe", &self.safe)
            .field("lock_held", &self.lock_held)
            .finish_non_exhaustive()
    }
}

/// Builder for injecting collaborators into a `NodeStore`
pub struct NodeStoreBuilder {
    config: IndexConfig,
    ids: Option<Arc<dyn IdGenerator>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl NodeStoreBuilder {
    /// Use a custom id generator instead of the configured one
    pub fn id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    /// Send diagnostics somewhere other than `tracing`
    pub fn diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Some(Arc::new(sink));
        self
    }

    /// Validate the configuration and populate the store from `items`.
    ///
    /// Every item that fails validation is collected; if any did, the whole
    /// construction fails with `StoreError::RejectedItems` listing them all.
    pub fn build(self, items: Vec<InitNode>) -> Result<NodeStore> {
        let config = self.config;
        config.validate()?;

        let diagnostics: Arc<dyn DiagnosticSink> =
            self.diagnostics.unwrap_or_else(|| Arc::new(TracingSink));

        let uniq_keys = match &config.uniq_keys {
            Some(keys) => keys.clone(),
            None => {
                diagnostics.warn("no \"uniqKeys\" given, this may affect access speeds in some cases");
                Vec::new()
            }
        };
        let zombie_key = match &config.zombie_key {
            Some(key) => key.clone(),
            None => {
                diagnostics.warn(
                    "no \"zombieKey\" given, this will result in zombie nodes with empty data keys",
                );
                String::new()
            }
        };

        let ids: Arc<dyn IdGenerator> = match (self.ids, &config.nanoid) {
            (Some(ids), _) => ids,
            (None, Some(nanoid)) => Arc::new(AlphabetGenerator::from_config(nanoid).ok_or_else(
                || StoreError::invalid_config("nanoid requires a non-empty alphabet and size"),
            )?),
            (None, None) => Arc::new(UuidGenerator),
        };

        let uniq_index = if config.index_uniq_keys {
            UniqueKeyIndex::new(&uniq_keys)
        } else {
            UniqueKeyIndex::default()
        };

        let safe = config.is_safe();
        let mut store = NodeStore {
            index: BTreeMap::new(),
            uniq_index,
            uniq_keys,
            zombie_key,
            config,
            ids,
            diagnostics,
            safe: false,
            lock_held: false,
        };

        let total = items.len();
        let mut rejected = Vec::new();
        for item in items {
            if store.add(item.data.clone(), item.init.clone())?.is_none() {
                rejected.push(item);
            }
        }
        if !rejected.is_empty() {
            return Err(StoreError::rejected_items(rejected));
        }

        // Locking applies once the store is handed out
        store.safe = safe;
        tracing::debug!("Initialized node store with {} node(s)", total);
        Ok(store)
    }
}

impl NodeStore {
    /// Create a store with the default collaborators
    pub fn new(items: Vec<InitNode>, config: IndexConfig) -> Result<Self> {
        Self::builder(config).build(items)
    }

    pub fn builder(config: IndexConfig) -> NodeStoreBuilder {
        NodeStoreBuilder {
            config,
            ids: None,
            diagnostics: None,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn uniq_keys(&self) -> &[String] {
        &self.uniq_keys
    }

    pub fn zombie_key(&self) -> &str {
        &self.zombie_key
    }

    /// Whether operations require the index lock
    pub fn is_safe(&self) -> bool {
        self.safe
    }

    //
    // LOCK DISCIPLINE
    //

    /// Fail if safe mode is on and the index lock is not held
    pub fn check_lock(&self) -> Result<()> {
        if self.safe && !self.lock_held {
            return Err(StoreError::LockNotHeld);
        }
        Ok(())
    }

    pub(crate) fn set_lock_held(&mut self, held: bool) {
        self.lock_held = held;
    }

    //
    // INTERNAL ACCESS (no lock check, no diagnostics)
    //

    pub(crate) fn warn(&self, message: impl AsRef<str>) {
        self.diagnostics.warn(message.as_ref());
    }

    pub(crate) fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id)
    }

    pub(crate) fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index.get_mut(id)
    }

    pub(crate) fn iter_nodes(&self) -> impl Iterator<Item = &Node> {
        self.index.values()
    }

    pub(crate) fn iter_nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.index.values_mut()
    }

    pub(crate) fn gen_id(&self) -> String {
        self.ids.generate()
    }

    /// Delete a node outright and drop its secondary-index entries
    pub(crate) fn remove_node(&mut self, id: &str) -> Option<Node> {
        let node = self.index.remove(id)?;
        self.release(id, &node.data, None);
        Some(node)
    }

    /// Re-insert a node captured earlier (rollback)
    pub(crate) fn restore_node(&mut self, node: Node) {
        for (key, value) in &node.data {
            self.uniq_index.claim(key, value, &node.id);
        }
        self.index.insert(node.id.clone(), node);
    }

    /// Drop the index entries `id` owns for `data` and hand each value over
    /// to any other node still holding it. Zombies may share a value with a
    /// document; the document wins.
    fn release(&mut self, id: &str, data: &NodeData, keep: Option<&str>) {
        self.uniq_index.purge(id, data, keep);
        for (key, value) in self.uniq_index.vacant(data) {
            let holders = self
                .index
                .values()
                .filter(|node| node.id != id && node.data.get(key) == Some(value));
            let heir = holders
                .clone()
                .find(|node| !node.is_zombie())
                .or_else(|| holders.clone().next())
                .map(|node| node.id.clone());
            if let Some(heir) = heir {
                self.uniq_index.set(key, value, &heir);
            }
        }
    }

    /// Whether any node other than `id` and those in `ignore` references `id`
    /// through children, attrs, links or embeds
    pub(crate) fn is_referenced(&self, id: &str, ignore: &[&str]) -> bool {
        self.index.values().any(|node| {
            node.id != id
                && !ignore.contains(&node.id.as_str())
                && (node.in_children(id)
                    || node.in_attrs(id)
                    || node.in_links(id)
                    || node.in_embeds(id))
        })
    }

    /// Delete `id` if it is a zombie nobody references any more
    pub(crate) fn collect_zombie(&mut self, id: &str, ignore: &[&str]) -> bool {
        let is_zombie = self.index.get(id).is_some_and(Node::is_zombie);
        if is_zombie && !self.is_referenced(id, ignore) {
            self.remove_node(id);
            tracing::debug!("Collected unreferenced zombie '{}'", id);
            return true;
        }
        false
    }

    pub(crate) fn project(&self, node: &Node, projection: &Projection) -> Result<Value> {
        match projection {
            Projection::One(query) => self.project_one(node, query),
            Projection::Many(queries) => {
                let mut result = Map::new();
                for query in queries {
                    result.insert(query.name().to_string(), self.project_one(node, query)?);
                }
                Ok(Value::Object(result))
            }
        }
    }

    fn project_one(&self, node: &Node, query: &Query) -> Result<Value> {
        let value = match query {
            Query::Id => Value::String(node.id.clone()),
            Query::Node => serde_json::to_value(node)?,
            Query::Kind => Value::String(node.kind.as_str().to_string()),
            Query::Type => node
                .node_type
                .as_ref()
                .map_or(Value::Null, |t| Value::String(t.clone())),
            Query::Data => Value::Object(node.data.clone()),
            Query::Zombie => node
                .data
                .get(&self.zombie_key)
                .cloned()
                .unwrap_or(Value::Null),
            Query::Field(key) => match node.data.get(key) {
                Some(value) => value.clone(),
                None => {
                    if !node.is_zombie() {
                        self.warn(format!(
                            "query failed for id \"{}\" with type '{}'",
                            node.id, key
                        ));
                    }
                    Value::Null
                }
            },
        };
        Ok(value)
    }

    /// Check every unique field present in `data` against all other nodes
    fn check_unique(&self, data: &NodeData, exclude: Option<&str>) -> bool {
        for key in &self.uniq_keys {
            let Some(value) = data.get(key) else {
                continue;
            };
            let taken = self.index.values().any(|node| {
                Some(node.id.as_str()) != exclude && node.data.get(key) == Some(value)
            });
            if taken {
                self.warn(format!(
                    "data key \"{}\" with value \"{}\" already exists",
                    key,
                    value_key(value)
                ));
                return false;
            }
        }
        true
    }

    //
    // INDEX OPERATIONS
    //

    pub fn has(&self, id: &str) -> Result<bool> {
        self.check_lock()?;
        Ok(self.index.contains_key(id))
    }

    /// Read access to the full id → Node mapping
    pub fn nodes(&self) -> Result<&BTreeMap<String, Node>> {
        self.check_lock()?;
        Ok(&self.index)
    }

    pub fn len(&self) -> Result<usize> {
        self.check_lock()?;
        Ok(self.index.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.check_lock()?;
        Ok(self.index.is_empty())
    }

    pub fn all_ids(&self) -> Result<Vec<String>> {
        self.check_lock()?;
        Ok(self.index.keys().cloned().collect())
    }

    pub fn all_nodes(&self) -> Result<Vec<&Node>> {
        self.check_lock()?;
        Ok(self.index.values().collect())
    }

    /// Project every node
    pub fn all_with(&self, projection: &Projection) -> Result<Vec<Value>> {
        self.check_lock()?;
        self.index
            .values()
            .map(|node| self.project(node, projection))
            .collect()
    }

    /// Non-empty node types currently in use
    pub fn nodetypes(&self) -> Result<BTreeSet<String>> {
        self.check_lock()?;
        Ok(self
            .index
            .values()
            .filter_map(|node| node.node_type.clone())
            .filter(|t| !t.is_empty())
            .collect())
    }

    pub fn zombies(&self) -> Result<Vec<String>> {
        self.check_lock()?;
        Ok(self
            .index
            .values()
            .filter(|node| node.is_zombie())
            .map(|node| node.id.clone())
            .collect())
    }

    pub fn zombies_with(&self, projection: &Projection) -> Result<Vec<Value>> {
        self.check_lock()?;
        self.index
            .values()
            .filter(|node| node.is_zombie())
            .map(|node| self.project(node, projection))
            .collect()
    }

    /// Clear `data` of one node, or of every node with `None`
    pub fn flush_data(&mut self, id: Option<&str>) -> Result<bool> {
        self.check_lock()?;
        match id {
            Some(id) => {
                let Some(node) = self.index.get_mut(id) else {
                    self.warn(format!("node with id \"{}\" does not exist", id));
                    return Ok(false);
                };
                let data = std::mem::take(&mut node.data);
                self.release(id, &data, None);
            }
            None => {
                for node in self.index.values_mut() {
                    node.data.clear();
                }
                self.uniq_index.clear();
            }
        }
        Ok(true)
    }

    /// Hard reset of all relations: zombies are deleted, every other node
    /// loses its children, attrs, links and embeds
    pub fn flush_rels(&mut self) -> Result<bool> {
        self.check_lock()?;
        let zombie_ids: Vec<String> = self
            .index
            .values()
            .filter(|node| node.is_zombie())
            .map(|node| node.id.clone())
            .collect();
        for id in &zombie_ids {
            self.remove_node(id);
        }
        for node in self.index.values_mut() {
            node.flush(None);
        }
        Ok(true)
    }

    pub fn clear(&mut self) -> Result<()> {
        self.check_lock()?;
        self.index.clear();
        self.uniq_index.clear();
        Ok(())
    }

    //
    // NODE OPERATIONS
    //

    /// Whether every unique field in `data` is free (ignoring `exclude`)
    pub fn validate(&self, data: &NodeData, exclude: Option<&str>) -> Result<bool> {
        self.check_lock()?;
        Ok(self.check_unique(data, exclude))
    }

    /// Add a full node.
    ///
    /// Fails (returns `None`) if the id already exists or a unique field
    /// collides. Id defaults to the generator output, kind to `Document` and
    /// type to `"default"`.
    pub fn add(&mut self, data: NodeData, init: NodeInit) -> Result<Option<&Node>> {
        self.check_lock()?;

        let explicit_id = init
            .id
            .clone()
            .or_else(|| data.get("id").and_then(Value::as_str).map(str::to_string));
        if let Some(id) = &explicit_id {
            if self.index.contains_key(id) {
                self.warn(format!("node with \"id\" \"{}\" already exists", id));
                return Ok(None);
            }
        }

        if !self.check_unique(&data, None) {
            return Ok(None);
        }

        let id = match init.id {
            Some(id) => id,
            None => {
                let id = self.gen_id();
                if self.index.contains_key(&id) {
                    self.warn(format!("generated id \"{}\" already exists", id));
                    return Ok(None);
                }
                id
            }
        };
        let kind = init.kind.unwrap_or(NodeKind::Document);
        let node_type = init
            .node_type
            .unwrap_or_else(|| DEFAULT_NODE_TYPE.to_string());

        self.uniq_index.insert_all(&id, &data);
        let node = Node::new(id.clone(), kind, Some(node_type), data);
        self.index.insert(id.clone(), node);
        Ok(self.index.get(&id))
    }

    /// Add a zombie placeholder carrying only the zombie field.
    ///
    /// A zombie with the same value may already exist; that is warned about,
    /// not blocked. Returns `None` only if the generated id is already taken.
    pub fn add_zombie(&mut self, value: &str) -> Result<Option<&Node>> {
        self.check_lock()?;

        let value = Value::String(value.to_string());
        let duplicate = self
            .uniq_index
            .lookup(&self.zombie_key, &value)
            .and_then(|owner| self.index.get(owner))
            .is_some_and(Node::is_zombie);
        if duplicate {
            self.warn(format!(
                "zombie with \"{}\" value \"{}\" already exists",
                self.zombie_key,
                value_key(&value)
            ));
        }

        let id = self.gen_id();
        if self.index.contains_key(&id) {
            self.warn(format!("generated id \"{}\" already exists", id));
            return Ok(None);
        }

        let mut data = NodeData::new();
        data.insert(self.zombie_key.clone(), value.clone());
        self.uniq_index.claim(&self.zombie_key, &value, &id);
        let node = Node::new(id.clone(), NodeKind::Zombie, None, data);
        self.index.insert(id.clone(), node);
        Ok(self.index.get(&id))
    }

    /// Edit a single field.
    ///
    /// `"nodetype"` sets the node's type slot; any other key updates `data`
    /// after revalidating uniqueness against every other node.
    pub fn edit(&mut self, id: &str, key: &str, value: Value) -> Result<bool> {
        self.check_lock()?;
        let Some(node) = self.index.get(id) else {
            self.warn(format!("node with id \"{}\" does not exist", id));
            return Ok(false);
        };

        if Query::from(key) == Query::Type {
            let node_type = match value {
                Value::Null => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            };
            if let Some(node) = self.index.get_mut(id) {
                node.node_type = node_type;
            }
            return Ok(true);
        }

        let mut candidate = node.data.clone();
        let previous = candidate.insert(key.to_string(), value.clone());
        if !self.check_unique(&candidate, Some(id)) {
            return Ok(false);
        }

        if let Some(node) = self.index.get_mut(id) {
            node.data = candidate;
        }
        if self.uniq_index.indexes(key) {
            if let Some(previous) = previous {
                let mut released = NodeData::new();
                released.insert(key.to_string(), previous);
                self.release(id, &released, None);
            }
            self.uniq_index.set(key, &value, id);
        }
        Ok(true)
    }

    /// Replace a node's payload, typically to promote a zombie.
    ///
    /// `kind` and `type` are recomputed from `data` (defaulting as in `add`);
    /// children, attrs, links and embeds are left untouched.
    pub fn fill(&mut self, id: &str, data: NodeData) -> Result<Option<&Node>> {
        self.check_lock()?;

        let target = if self.index.contains_key(id) {
            id.to_string()
        } else {
            match data.get("id").and_then(Value::as_str) {
                Some(data_id) if self.index.contains_key(data_id) => data_id.to_string(),
                _ => {
                    self.warn(format!("node with \"id\" \"{}\" does not exist", id));
                    return Ok(None);
                }
            }
        };

        if !self.check_unique(&data, Some(&target)) {
            return Ok(None);
        }

        let kind = data
            .get("kind")
            .and_then(Value::as_str)
            .and_then(|kind| kind.parse().ok())
            .unwrap_or(NodeKind::Document);
        let node_type = data
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_NODE_TYPE)
            .to_string();

        let Some(node) = self.index.get_mut(&target) else {
            return Ok(None);
        };
        let previous = std::mem::replace(&mut node.data, data);
        node.kind = kind;
        node.node_type = Some(node_type);
        let current = node.data.clone();
        self.release(&target, &previous, None);
        self.uniq_index.insert_all(&target, &current);
        Ok(self.index.get(&target))
    }

    /// Remove a node.
    ///
    /// Unreferenced nodes are deleted outright. A node still referenced by
    /// another node's children, attrs or links is demoted to a zombie in
    /// place instead.
    pub fn rm(&mut self, id: &str) -> Result<bool> {
        self.check_lock()?;
        let Some(node) = self.index.get(id) else {
            self.warn(format!("node with id \"{}\" does not exist", id));
            return Ok(false);
        };

        let has_rel = self.index.values().any(|other| {
            other.id != id && (other.in_children(id) || other.in_attrs(id) || other.in_links(id))
        });

        if !has_rel {
            self.remove_node(id);
            return Ok(!self.index.contains_key(id));
        }

        let previous = node.data.clone();
        let zombie_key = self.zombie_key.clone();
        self.release(id, &previous, Some(zombie_key.as_str()));

        let zombie_value = previous
            .get(&self.zombie_key)
            .cloned()
            .unwrap_or(Value::Null);
        let Some(node) = self.index.get_mut(id) else {
            return Ok(false);
        };
        node.kind = NodeKind::Zombie;
        node.node_type = None;
        node.data = NodeData::new();
        node.data.insert(zombie_key, zombie_value);
        tracing::debug!("Demoted referenced node '{}' to zombie", id);
        Ok(node.is_zombie())
    }

    //
    // LOOKUPS
    //

    /// Raw node by id
    pub fn get(&self, id: &str) -> Result<Option<&Node>> {
        self.check_lock()?;
        let node = self.index.get(id);
        if node.is_none() {
            self.warn(format!("node with id \"{}\" does not exist", id));
        }
        Ok(node)
    }

    /// Projected view of a node
    pub fn query(&self, id: &str, projection: &Projection) -> Result<Option<Value>> {
        self.check_lock()?;
        match self.index.get(id) {
            Some(node) => Ok(Some(self.project(node, projection)?)),
            None => {
                self.warn(format!("node with id \"{}\" does not exist", id));
                Ok(None)
            }
        }
    }

    /// Look a node up by a unique field
    pub fn find(&self, key: &str, value: &Value) -> Result<Option<&Node>> {
        self.check_lock()?;
        if !self.uniq_keys.iter().any(|k| k == key) {
            self.warn(
                "\"dataKey\" must be a unique key in node data. Did you mean \"filter()\"?",
            );
            return Ok(None);
        }
        if self.uniq_index.indexes(key) {
            return Ok(self
                .uniq_index
                .lookup(key, value)
                .and_then(|id| self.index.get(id)));
        }
        Ok(self
            .index
            .values()
            .find(|node| node.data.get(key) == Some(value)))
    }

    /// Linear scan by kind (`"nodekind"`), type (`"nodetype"`) or data field
    pub fn filter(&self, key: &str, value: &Value) -> Result<Vec<&Node>> {
        self.check_lock()?;
        let nodes = self.index.values();
        let matches: Vec<&Node> = match Query::from(key) {
            Query::Kind => nodes
                .filter(|node| Some(node.kind.as_str()) == value.as_str())
                .collect(),
            Query::Type => nodes
                .filter(|node| node.node_type.as_deref() == value.as_str())
                .collect(),
            _ => nodes
                .filter(|node| node.data.get(key) == Some(value))
                .collect(),
        };
        Ok(matches)
    }

    pub fn filter_kind(&self, kind: NodeKind) -> Result<Vec<&Node>> {
        self.check_lock()?;
        Ok(self.index.values().filter(|node| node.kind == kind).collect())
    }
}

#[cfg(test)]
#[path = "node_store_test.rs"]
mod node_store_test;
