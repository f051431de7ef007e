//! Tree engine
//!
//! A single-rooted hierarchy over the nodes' `children` lists. Family
//! relations (ancestors, parent, siblings, children, descendants, lineage)
//! are all derived from `children` by one shared search, see
//! [`FamilySearch`](super::family_search).
//!
//! Structural mutations validate the result with [`TreeEngine::is_tree`] and
//! undo themselves when it fails. `transplant` and the path-based forms
//! snapshot every node they touch so the rollback is all-or-nothing.

use crate::db::{NodeStore, Result};
use crate::models::{Family, FamilyRelation, Node, Projection, Structure, SubtreeEntry};
use crate::services::family_search::{FamilySearch, MissingChild};
use crate::services::Capability;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt::Write;

/// Children lists captured before a structural change
#[derive(Debug, Default)]
struct ChildrenSnapshot {
    saved: Vec<(String, Vec<String>)>,
    seen: HashSet<String>,
}

impl ChildrenSnapshot {
    fn record(&mut self, node: &Node) {
        if self.seen.insert(node.id.clone()) {
            self.saved.push((node.id.clone(), node.children.clone()));
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    fn restore(self, store: &mut NodeStore) {
        for (id, children) in self.saved {
            match store.node_mut(&id) {
                Some(node) => node.children = children,
                None => store.warn(format!(
                    "node with id \"{}\" not found in the index when performing rollback",
                    id
                )),
            }
        }
    }
}

/// Whether `node` sits at `segment` along a path keyed by `field`
fn matches_segment(store: &NodeStore, node: &Node, field: &str, segment: &str) -> bool {
    let carries = |key: &str| node.data.get(key).and_then(Value::as_str) == Some(segment);
    carries(field) || (node.is_zombie() && carries(store.zombie_key()))
}

/// Walk `path` from the root, returning the ids of the matching prefix.
///
/// `None` (with a diagnostic) when `id` is missing, the root is unset, the
/// path is empty or its first entry does not match the root.
fn resolve_path<E: TreeEngine + ?Sized>(
    engine: &E,
    id: &str,
    path: &[&str],
    field: &str,
) -> Option<Vec<String>> {
    let store = engine.store();
    if store.node(id).is_none() {
        store.warn(format!("node with id \"{}\" not in index", id));
        return None;
    }
    let Some(root) = engine.root_id().and_then(|root| store.node(root)) else {
        store.warn("root is not set");
        return None;
    };
    let Some((first, rest)) = path.split_first() else {
        store.warn("path is empty");
        return None;
    };
    if !matches_segment(store, root, field, first) {
        store.warn(format!(
            "path root \"{}\" does not match the tree root \"{}\"",
            first, root.id
        ));
        return None;
    }

    let mut resolved = vec![root.id.clone()];
    let mut current = root;
    for segment in rest {
        let next = current
            .children
            .iter()
            .filter_map(|child| store.node(child))
            .find(|child| matches_segment(store, child, field, segment));
        match next {
            Some(next) => {
                resolved.push(next.id.clone());
                current = next;
            }
            None => break,
        }
    }
    Some(resolved)
}

/// Tree capability over a [`NodeStore`]
///
/// Implementors only supply storage for the root id; every operation is a
/// provided method.
pub trait TreeEngine: Capability {
    fn root_id(&self) -> Option<&str>;
    fn root_slot_mut(&mut self) -> &mut Option<String>;

    //
    // ROOT
    //

    fn set_root(&mut self, id: &str) -> Result<bool> {
        self.store().check_lock()?;
        if self.store().node(id).is_none() {
            self.store()
                .warn(format!("node with id \"{}\" not in index", id));
            return Ok(false);
        }
        *self.root_slot_mut() = Some(id.to_string());
        Ok(true)
    }

    fn root(&self) -> Result<Option<String>> {
        self.store().check_lock()?;
        Ok(self.root_id().map(str::to_string))
    }

    fn root_with(&self, projection: &Projection) -> Result<Option<Value>> {
        self.store().check_lock()?;
        match self.root_id().and_then(|id| self.store().node(id)) {
            Some(node) => Ok(Some(self.store().project(node, projection)?)),
            None => Ok(None),
        }
    }

    //
    // FAMILY
    //

    /// Collect the requested relations of `id` in one search.
    ///
    /// `None` if `id` is not in the index, no root is set or the walk hits a
    /// child id that does not exist; relations of a node that is not
    /// reachable from the root come back empty.
    fn family(&self, id: &str, relations: &[FamilyRelation]) -> Result<Option<Family>> {
        self.store().check_lock()?;
        let store = self.store();
        if store.node(id).is_none() {
            return Ok(None);
        }
        let Some(root) = self.root_id().and_then(|root| store.node(root)) else {
            return Ok(None);
        };
        let requested = Family::requesting(relations);
        match FamilySearch::new(store, id).run(root, requested.clone()) {
            Ok(found) => Ok(Some(found.unwrap_or(requested))),
            Err(MissingChild(child)) => {
                store.warn(format!("node with id \"{}\" not found", child));
                Ok(None)
            }
        }
    }

    /// One relation, each member projected
    fn family_with(
        &self,
        id: &str,
        relation: FamilyRelation,
        projection: &Projection,
    ) -> Result<Option<Vec<Value>>> {
        let Some(mut family) = self.family(id, &[relation])? else {
            return Ok(None);
        };
        let store = self.store();
        family
            .take(relation)
            .iter()
            .filter_map(|member| store.node(member))
            .map(|node| store.project(node, projection))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Root first, target excluded
    fn ancestors(&self, id: &str) -> Result<Option<Vec<String>>> {
        let relation = FamilyRelation::Ancestors;
        Ok(self.family(id, &[relation])?.map(|mut f| f.take(relation)))
    }

    /// Parent id, or an empty string when `id` has none
    fn parent(&self, id: &str) -> Result<Option<String>> {
        let relation = FamilyRelation::Parent;
        Ok(self
            .family(id, &[relation])?
            .map(|mut f| f.take(relation).into_iter().next().unwrap_or_default()))
    }

    fn siblings(&self, id: &str) -> Result<Option<Vec<String>>> {
        let relation = FamilyRelation::Siblings;
        Ok(self.family(id, &[relation])?.map(|mut f| f.take(relation)))
    }

    fn children(&self, id: &str) -> Result<Option<Vec<String>>> {
        let relation = FamilyRelation::Children;
        Ok(self.family(id, &[relation])?.map(|mut f| f.take(relation)))
    }

    /// Top-down in depth-first visit order
    fn descendants(&self, id: &str) -> Result<Option<Vec<String>>> {
        let relation = FamilyRelation::Descendants;
        Ok(self.family(id, &[relation])?.map(|mut f| f.take(relation)))
    }

    /// Ancestors followed by descendants
    fn lineage(&self, id: &str) -> Result<Option<Vec<String>>> {
        let relation = FamilyRelation::Lineage;
        Ok(self.family(id, &[relation])?.map(|mut f| f.take(relation)))
    }

    /// Number of ancestors; the root is at level 0
    fn level(&self, id: &str) -> Result<Option<usize>> {
        Ok(self.ancestors(id)?.map(|ancestors| ancestors.len()))
    }

    /// Nodes among `ids` with no children, no parent and not zombies
    fn orphans(&self, ids: &[&str]) -> Result<Vec<String>> {
        self.store().check_lock()?;
        let mut orphans = Vec::new();
        for node in self.store().iter_nodes() {
            if !ids.contains(&node.id.as_str()) || !node.children.is_empty() || node.is_zombie() {
                continue;
            }
            let parentless = self.parent(&node.id)?.map_or(true, |p| p.is_empty());
            if parentless {
                orphans.push(node.id.clone());
            }
        }
        Ok(orphans)
    }

    fn orphans_with(&self, ids: &[&str], projection: &Projection) -> Result<Vec<Value>> {
        let store = self.store();
        self.orphans(ids)?
            .iter()
            .filter_map(|id| store.node(id))
            .map(|node| store.project(node, projection))
            .collect()
    }

    //
    // STRUCTURE CHECKS
    //

    /// Whether `children` from the root reaches every node at most once and
    /// only references existing nodes
    fn is_tree(&self) -> Result<bool> {
        self.store().check_lock()?;
        match self.root_id() {
            Some(root) => self.is_tree_from(root),
            None => {
                self.store().warn("root is not set");
                Ok(false)
            }
        }
    }

    /// Same check, starting from any node
    fn is_tree_from(&self, id: &str) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        if store.node(id).is_none() {
            store.warn(format!("node with id \"{}\" not found", id));
            return Ok(false);
        }

        let mut visited = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                store.warn(format!("node with id \"{}\" already visited", current));
                return Ok(false);
            }
            let Some(node) = store.node(current) else {
                store.warn(format!("node with id \"{}\" not found", current));
                return Ok(false);
            };
            stack.extend(node.children.iter().rev().map(String::as_str));
        }
        Ok(true)
    }

    /// Whether some node lists `id` as a child
    fn in_tree(&self, id: &str) -> Result<bool> {
        self.store().check_lock()?;
        Ok(self.store().iter_nodes().any(|node| node.in_children(id)))
    }

    fn is_root(&self, id: &str) -> Result<bool> {
        self.store().check_lock()?;
        Ok(self.root_id() == Some(id))
    }

    fn is_leaf(&self, id: &str) -> Result<bool> {
        self.store().check_lock()?;
        Ok(self
            .store()
            .node(id)
            .is_some_and(|node| node.children.is_empty()))
    }

    //
    // MUTATIONS
    //

    /// Append `child` under `parent`.
    ///
    /// The child must exist and not already be in the tree. Unless `force`
    /// is set the result must pass [`is_tree`](Self::is_tree), otherwise the
    /// append is undone.
    #[doc(alias = "attach")]
    fn graft(&mut self, parent: &str, child: &str, force: bool) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        if parent == child {
            store.warn("parent and child are the same");
            return Ok(false);
        }
        if store.node(parent).is_none() {
            store.warn(format!("parent node with id \"{}\" not in index", parent));
            return Ok(false);
        }
        if store.node(child).is_none() {
            store.warn(format!("child node with id \"{}\" not in index", child));
            return Ok(false);
        }
        if self.in_tree(child)? {
            self.store().warn(format!(
                "child node with id \"{}\" already exists in the tree",
                child
            ));
            return Ok(false);
        }

        if let Some(node) = self.store_mut().node_mut(parent) {
            node.children.push(child.to_string());
        }
        if !force && !self.is_tree()? {
            if let Some(node) = self.store_mut().node_mut(parent) {
                node.children.pop();
            }
            tracing::debug!("Rolled back graft of '{}' under '{}'", child, parent);
            return Ok(false);
        }
        Ok(true)
    }

    /// Detach the leaf `child` from `parent`.
    ///
    /// The root and nodes with children cannot be pruned. Unless `force` is
    /// set the result must pass [`is_tree`](Self::is_tree).
    #[doc(alias = "detach")]
    fn prune(&mut self, parent: &str, child: &str, force: bool) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        if parent == child {
            store.warn("parent and child are the same");
            return Ok(false);
        }
        let Some(parent_node) = store.node(parent) else {
            store.warn(format!("parent node with id \"{}\" not in index", parent));
            return Ok(false);
        };
        if store.node(child).is_none() {
            store.warn(format!("child node with id \"{}\" not in index", child));
            return Ok(false);
        }
        if self.is_root(child)? || !self.is_leaf(child)? {
            self.store().warn("cannot prune root or non-leaf child node");
            return Ok(false);
        }
        let Some(position) = parent_node.children.iter().position(|c| c == child) else {
            self.store().warn(format!(
                "child node with id \"{}\" is not a child of parent \"{}\"",
                child, parent
            ));
            return Ok(false);
        };

        if let Some(node) = self.store_mut().node_mut(parent) {
            node.children.remove(position);
        }
        if !force && !self.is_tree()? {
            if let Some(node) = self.store_mut().node_mut(parent) {
                node.children.insert(position, child.to_string());
            }
            tracing::debug!("Rolled back prune of '{}' from '{}'", child, parent);
            return Ok(false);
        }
        Ok(true)
    }

    /// Put `target` in `source`'s place: `target` takes over the parent slot
    /// and the children, `source` is left an orphan.
    fn replace(&mut self, source: &str, target: &str) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        if source == target {
            store.warn("source and target are the same");
            return Ok(false);
        }
        if store.node(source).is_none() {
            store.warn(format!("source node with id \"{}\" not in index", source));
            return Ok(false);
        }
        let Some(target_node) = store.node(target) else {
            store.warn(format!("target node with id \"{}\" not in index", target));
            return Ok(false);
        };
        if !target_node.children.is_empty() || self.in_tree(target)? {
            self.store().warn(format!(
                "target with \"id\" \"{}\" already exists in tree",
                target
            ));
            return Ok(false);
        }
        let parent = self.parent(source)?.unwrap_or_default();
        if parent.is_empty() {
            self.store()
                .warn(format!("no parent exists for node with id \"{}\"", source));
            return Ok(false);
        }

        let store = self.store_mut();
        if let Some(parent_node) = store.node_mut(&parent) {
            for slot in parent_node.children.iter_mut().filter(|c| *c == source) {
                *slot = target.to_string();
            }
        }
        let children = store
            .node_mut(source)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        if let Some(node) = store.node_mut(target) {
            node.children = children;
        }
        Ok(true)
    }

    /// Redefine the subtree under `subroot` in one all-or-nothing step.
    ///
    /// `subtree` lists the new children of each node (the subroot included).
    /// New children lists are applied depth-first from the subroot; if the
    /// result is not a valid tree every touched node is restored.
    fn transplant(&mut self, subroot: &str, subtree: &[SubtreeEntry]) -> Result<bool> {
        self.store().check_lock()?;
        if !subtree.iter().any(|entry| entry.id == subroot) {
            self.store().warn(format!(
                "subroot with id \"{}\" not found in the subtree",
                subroot
            ));
            return Ok(false);
        }
        if self.store().node(subroot).is_none() {
            self.store().warn(format!(
                "subroot with id \"{}\" not found in the index",
                subroot
            ));
            return Ok(false);
        }

        let layout: HashMap<&str, &Vec<String>> = subtree
            .iter()
            .map(|entry| (entry.id.as_str(), &entry.children))
            .collect();
        let mut snapshot = ChildrenSnapshot::default();
        let mut pending = vec![subroot.to_string()];
        while let Some(id) = pending.pop() {
            if snapshot.contains(&id) {
                continue;
            }
            let Some(node) = self.store_mut().node_mut(&id) else {
                continue;
            };
            snapshot.record(node);
            if let Some(children) = layout.get(id.as_str()) {
                node.children = (*children).clone();
                pending.extend(children.iter().rev().cloned());
            }
        }

        if !self.is_tree()? {
            self.store().warn(
                "transplant failed due to invalid resultant tree, rolling back to previous state",
            );
            snapshot.restore(self.store_mut());
            return Ok(false);
        }
        Ok(true)
    }

    /// Graft `id` at the end of `path`.
    ///
    /// `path` lists the `field` values of the nodes from the root down to
    /// the new parent; the first entry must match the root. Missing levels
    /// are created as zombies. Everything is undone if the result is not a
    /// valid tree.
    fn graft_by_path(&mut self, id: &str, path: &[&str], field: &str) -> Result<bool> {
        self.store().check_lock()?;
        let Some(path_nodes) = resolve_path(self, id, path, field) else {
            return Ok(false);
        };
        if self.in_tree(id)? || self.is_root(id)? {
            self.store()
                .warn(format!("node with id \"{}\" already exists in the tree", id));
            return Ok(false);
        }

        let mut snapshot = ChildrenSnapshot::default();
        let mut created: Vec<String> = Vec::new();
        let mut current = path_nodes.last().cloned().unwrap_or_default();
        let mut failed = false;

        for segment in &path[path_nodes.len()..] {
            let zombie = match self.store_mut().add_zombie(segment)? {
                Some(zombie) => zombie.id.clone(),
                None => {
                    failed = true;
                    break;
                }
            };
            created.push(zombie.clone());
            if let Some(node) = self.store_mut().node_mut(&current) {
                snapshot.record(node);
                node.children.push(zombie.clone());
            }
            current = zombie;
        }

        if !failed {
            if let Some(node) = self.store_mut().node_mut(&current) {
                snapshot.record(node);
                node.children.push(id.to_string());
            }
            if self.is_tree()? {
                return Ok(true);
            }
        }

        let store = self.store_mut();
        snapshot.restore(store);
        for zombie in &created {
            store.remove_node(zombie);
        }
        tracing::debug!("Rolled back path graft of '{}'", id);
        Ok(false)
    }

    /// Detach the leaf `id` found at the end of `path`.
    ///
    /// Zombie levels of the path that are left without children and without
    /// any other reference are deleted on the way up.
    fn prune_by_path(&mut self, id: &str, path: &[&str], field: &str) -> Result<bool> {
        self.store().check_lock()?;
        let Some(path_nodes) = resolve_path(self, id, path, field) else {
            return Ok(false);
        };
        if path_nodes.len() < path.len() {
            self.store().warn(format!(
                "path segment \"{}\" not found in the tree",
                path[path_nodes.len()]
            ));
            return Ok(false);
        }
        let parent = path_nodes.last().cloned().unwrap_or_default();
        let is_child = self
            .store()
            .node(&parent)
            .is_some_and(|node| node.in_children(id));
        if !is_child {
            self.store().warn(format!(
                "node with id \"{}\" is not a child of parent \"{}\"",
                id, parent
            ));
            return Ok(false);
        }
        if !self.is_leaf(id)? {
            self.store().warn("cannot prune root or non-leaf child node");
            return Ok(false);
        }

        let mut snapshot = ChildrenSnapshot::default();
        let mut removed: Vec<Node> = Vec::new();
        let store = self.store_mut();
        if let Some(node) = store.node_mut(&parent) {
            snapshot.record(node);
            node.children.retain(|child| child != id);
        }

        // The root is never collected
        for pair in path_nodes.windows(2).rev() {
            let (above, level) = (&pair[0], &pair[1]);
            let collectable = store
                .node(level)
                .is_some_and(|node| node.is_zombie() && node.children.is_empty());
            if !collectable || store.is_referenced(level, &[above.as_str()]) {
                break;
            }
            if let Some(node) = store.node_mut(above) {
                snapshot.record(node);
                node.children.retain(|child| child != level);
            }
            if let Some(node) = store.remove_node(level) {
                removed.push(node);
            }
        }

        if self.is_tree()? {
            return Ok(true);
        }
        let store = self.store_mut();
        for node in removed {
            store.restore_node(node);
        }
        snapshot.restore(store);
        tracing::debug!("Rolled back path prune of '{}'", id);
        Ok(false)
    }

    /// Clear every `children` list and delete zombies that nothing in the
    /// web references any more
    fn flush_rel_fams(&mut self) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        let unreferenced: Vec<String> = store
            .iter_nodes()
            .filter(|node| node.is_zombie())
            .filter(|zombie| {
                !store.iter_nodes().any(|other| {
                    other.id != zombie.id
                        && (other.in_attrs(&zombie.id)
                            || other.in_links(&zombie.id)
                            || other.in_embeds(&zombie.id))
                })
            })
            .map(|zombie| zombie.id.clone())
            .collect();

        let store = self.store_mut();
        for id in &unreferenced {
            store.remove_node(id);
        }
        for node in store.iter_nodes_mut() {
            node.flush(Some(Structure::Tree));
        }
        if self.root_id().is_some_and(|root| unreferenced.iter().any(|id| id == root)) {
            *self.root_slot_mut() = None;
        }
        Ok(true)
    }

    /// Text rendering of the tree, one node per line labelled with `field`
    fn render_tree(&self, field: &str) -> Result<Option<String>> {
        self.store().check_lock()?;
        let store = self.store();
        let Some(root) = self.root_id().and_then(|root| store.node(root)) else {
            store.warn("root is not set");
            return Ok(None);
        };

        let label = |node: &Node| {
            node.data
                .get(field)
                .map_or_else(|| "Untitled".to_string(), Value::to_string)
        };
        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", root.id, label(root));

        let mut visited = HashSet::from([root.id.as_str()]);
        let mut stack: Vec<(&str, String, bool)> = root
            .children
            .iter()
            .enumerate()
            .rev()
            .map(|(i, child)| (child.as_str(), String::new(), i + 1 == root.children.len()))
            .collect();
        while let Some((id, prefix, last)) = stack.pop() {
            let Some(node) = store.node(id) else {
                continue;
            };
            if !visited.insert(id) {
                continue;
            }
            let branch = if last { "└── " } else { "├── " };
            let _ = writeln!(out, "{}{}{}: {}", prefix, branch, node.id, label(node));
            let nested = format!("{}{}", prefix, if last { "    " } else { "│   " });
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((child.as_str(), nested.clone(), i + 1 == node.children.len()));
            }
        }
        Ok(Some(out))
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
