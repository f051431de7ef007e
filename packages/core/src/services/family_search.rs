//! Shared family search
//!
//! A single depth-first walk from the root collects any subset of the family
//! relations of a target node. Until the target is reached every branch works
//! on its own copy of the accumulator, so a branch that turns out not to lead
//! to the target leaves nothing behind. Once the target is reached the walk
//! continues below it only to extend `descendants` and `lineage`.

use crate::db::NodeStore;
use crate::models::{Family, Node};

/// A `children` entry that names no stored node; the walk cannot continue
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MissingChild(pub(crate) String);

pub(crate) struct FamilySearch<'a> {
    store: &'a NodeStore,
    target: &'a str,
    /// Depth bound, so a cyclic children relation cannot recurse forever
    max_depth: usize,
}

impl<'a> FamilySearch<'a> {
    pub(crate) fn new(store: &'a NodeStore, target: &'a str) -> Self {
        Self {
            store,
            target,
            max_depth: store.iter_nodes().count(),
        }
    }

    /// Run from `root`. `Ok(None)` means the target is not reachable from
    /// the root.
    pub(crate) fn run(
        &self,
        root: &Node,
        family: Family,
    ) -> Result<Option<Family>, MissingChild> {
        self.seek(root, family, 0)
    }

    fn child(&self, id: &str) -> Result<&'a Node, MissingChild> {
        self.store
            .node(id)
            .ok_or_else(|| MissingChild(id.to_string()))
    }

    fn seek(
        &self,
        node: &Node,
        mut family: Family,
        depth: usize,
    ) -> Result<Option<Family>, MissingChild> {
        if depth > self.max_depth {
            return Ok(None);
        }
        if node.id == self.target {
            if let Some(children) = family.children.as_mut() {
                children.clone_from(&node.children);
            }
            self.extend_below(node, &mut family, depth)?;
            return Ok(Some(family));
        }

        if let Some(ancestors) = family.ancestors.as_mut() {
            ancestors.push(node.id.clone());
        }
        if let Some(lineage) = family.lineage.as_mut() {
            lineage.push(node.id.clone());
        }

        if node.in_children(self.target) {
            let target = self.child(self.target)?;
            if let Some(parent) = family.parent.as_mut() {
                *parent = vec![node.id.clone()];
            }
            if let Some(siblings) = family.siblings.as_mut() {
                *siblings = node
                    .children
                    .iter()
                    .filter(|child| *child != self.target)
                    .cloned()
                    .collect();
            }
            return self.seek(target, family, depth + 1);
        }

        for child in &node.children {
            let next = self.child(child)?;
            if let Some(found) = self.seek(next, family.clone(), depth + 1)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    fn extend_below(
        &self,
        node: &Node,
        family: &mut Family,
        depth: usize,
    ) -> Result<(), MissingChild> {
        if family.descendants.is_none() && family.lineage.is_none() {
            return Ok(());
        }
        if depth > self.max_depth {
            return Ok(());
        }
        if let Some(descendants) = family.descendants.as_mut() {
            descendants.extend(node.children.iter().cloned());
        }
        if let Some(lineage) = family.lineage.as_mut() {
            lineage.extend(node.children.iter().cloned());
        }
        for child in &node.children {
            let next = self.child(child)?;
            self.extend_below(next, family, depth + 1)?;
        }
        Ok(())
    }
}
