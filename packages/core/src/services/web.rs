//! Web engine
//!
//! Typed, non-hierarchical relations between nodes:
//!
//! - **attrs**: label → set of target ids
//! - **links**: ordered `(label, target)` pairs
//! - **embeds**: ordered `(media kind, target)` pairs
//!
//! Only forward relations are stored. Backward lookups scan every node on
//! each call; there is no reverse index to keep in sync.

use crate::db::{NodeStore, Result};
use crate::models::{Attrs, Embed, Link, MediaKind, Projection, RefKind, Structure};
use crate::services::Capability;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

fn media_kind(store: &NodeStore, label: &str) -> Option<MediaKind> {
    let media = MediaKind::from_label(label);
    if media.is_none() {
        store.warn(format!("invalid media kind: {}", label));
    }
    media
}

fn project_ids<'a>(
    store: &NodeStore,
    ids: impl IntoIterator<Item = &'a String>,
    projection: &Projection,
) -> Result<Vec<Value>> {
    ids.into_iter()
        .filter_map(|id| store.node(id))
        .map(|node| store.project(node, projection))
        .collect()
}

fn project_attrs(
    store: &NodeStore,
    attrs: &Attrs,
    projection: &Projection,
) -> Result<BTreeMap<String, Vec<Value>>> {
    attrs
        .iter()
        .map(|(label, ids)| Ok((label.clone(), project_ids(store, ids, projection)?)))
        .collect()
}

fn project_pairs<'a>(
    store: &NodeStore,
    pairs: impl IntoIterator<Item = (String, &'a String)>,
    projection: &Projection,
) -> Result<Vec<(String, Value)>> {
    pairs
        .into_iter()
        .filter_map(|(label, id)| store.node(id).map(|node| (label, node)))
        .map(|(label, node)| Ok((label, store.project(node, projection)?)))
        .collect()
}

/// Web capability over a [`NodeStore`]
pub trait WebEngine: Capability {
    //
    // VOCABULARY
    //

    /// Attr and link labels in use
    fn reftypes(&self) -> Result<BTreeSet<String>> {
        let mut types = self.attrtypes()?;
        types.extend(self.linktypes()?);
        Ok(types)
    }

    fn attrtypes(&self) -> Result<BTreeSet<String>> {
        self.store().check_lock()?;
        Ok(self
            .store()
            .iter_nodes()
            .flat_map(|node| node.attrs.keys().cloned())
            .collect())
    }

    fn linktypes(&self) -> Result<BTreeSet<String>> {
        self.store().check_lock()?;
        Ok(self
            .store()
            .iter_nodes()
            .flat_map(|node| node.links.iter().map(|link| link.link_type.clone()))
            .collect())
    }

    //
    // FORWARD / BACKWARD
    //

    fn foreattrs(&self, id: &str) -> Result<Option<Attrs>> {
        self.store().check_lock()?;
        Ok(self.store().get(id)?.map(|node| node.attrs.clone()))
    }

    fn foreattrs_with(
        &self,
        id: &str,
        projection: &Projection,
    ) -> Result<Option<BTreeMap<String, Vec<Value>>>> {
        match self.foreattrs(id)? {
            Some(attrs) => Ok(Some(project_attrs(self.store(), &attrs, projection)?)),
            None => Ok(None),
        }
    }

    /// Label → ids of the nodes whose attrs point at `id`
    fn backattrs(&self, id: &str) -> Result<Option<Attrs>> {
        self.store().check_lock()?;
        let store = self.store();
        if store.node(id).is_none() {
            return Ok(None);
        }
        let mut backattrs = Attrs::new();
        for node in store.iter_nodes() {
            for (label, ids) in &node.attrs {
                if ids.contains(id) {
                    backattrs
                        .entry(label.clone())
                        .or_default()
                        .insert(node.id.clone());
                }
            }
        }
        Ok(Some(backattrs))
    }

    fn backattrs_with(
        &self,
        id: &str,
        projection: &Projection,
    ) -> Result<Option<BTreeMap<String, Vec<Value>>>> {
        match self.backattrs(id)? {
            Some(attrs) => Ok(Some(project_attrs(self.store(), &attrs, projection)?)),
            None => Ok(None),
        }
    }

    fn forelinks(&self, id: &str) -> Result<Option<Vec<Link>>> {
        self.store().check_lock()?;
        Ok(self.store().get(id)?.map(|node| node.links.clone()))
    }

    /// `(label, projected target)` pairs
    fn forelinks_with(
        &self,
        id: &str,
        projection: &Projection,
    ) -> Result<Option<Vec<(String, Value)>>> {
        let Some(links) = self.forelinks(id)? else {
            return Ok(None);
        };
        let pairs = links.iter().map(|link| (link.link_type.clone(), &link.id));
        Ok(Some(project_pairs(self.store(), pairs, projection)?))
    }

    /// Links pointing at `id`, each reported as `(label, source id)`
    fn backlinks(&self, id: &str) -> Result<Option<Vec<Link>>> {
        self.store().check_lock()?;
        let store = self.store();
        if store.node(id).is_none() {
            return Ok(None);
        }
        Ok(Some(
            store
                .iter_nodes()
                .flat_map(|node| {
                    node.links
                        .iter()
                        .filter(|link| link.id == id)
                        .map(|link| Link::new(link.link_type.clone(), node.id.clone()))
                })
                .collect(),
        ))
    }

    fn backlinks_with(
        &self,
        id: &str,
        projection: &Projection,
    ) -> Result<Option<Vec<(String, Value)>>> {
        let Some(links) = self.backlinks(id)? else {
            return Ok(None);
        };
        let pairs = links.iter().map(|link| (link.link_type.clone(), &link.id));
        Ok(Some(project_pairs(self.store(), pairs, projection)?))
    }

    fn foreembeds(&self, id: &str) -> Result<Option<Vec<Embed>>> {
        self.store().check_lock()?;
        Ok(self.store().get(id)?.map(|node| node.embeds.clone()))
    }

    fn foreembeds_with(&self, id: &str, projection: &Projection) -> Result<Option<Vec<Value>>> {
        let Some(embeds) = self.foreembeds(id)? else {
            return Ok(None);
        };
        Ok(Some(project_ids(
            self.store(),
            embeds.iter().map(|embed| &embed.id),
            projection,
        )?))
    }

    /// Embeds pointing at `id`, each reported as `(media, source id)`
    fn backembeds(&self, id: &str) -> Result<Option<Vec<Embed>>> {
        self.store().check_lock()?;
        let store = self.store();
        if store.node(id).is_none() {
            return Ok(None);
        }
        Ok(Some(
            store
                .iter_nodes()
                .flat_map(|node| {
                    node.embeds
                        .iter()
                        .filter(|embed| embed.id == id)
                        .map(|embed| Embed::new(embed.media, node.id.clone()))
                })
                .collect(),
        ))
    }

    fn backembeds_with(&self, id: &str, projection: &Projection) -> Result<Option<Vec<Value>>> {
        let Some(embeds) = self.backembeds(id)? else {
            return Ok(None);
        };
        Ok(Some(project_ids(
            self.store(),
            embeds.iter().map(|embed| &embed.id),
            projection,
        )?))
    }

    /// Forward then backward ids for the selected kinds, duplicates kept
    fn neighbors(&self, id: &str, kind: RefKind) -> Result<Option<Vec<String>>> {
        self.store().check_lock()?;
        let Some(node) = self.store().node(id) else {
            return Ok(None);
        };
        let mut neighbors = Vec::new();
        if kind.covers(RefKind::Attr) {
            neighbors.extend(node.attrs.values().flatten().cloned());
            if let Some(backattrs) = self.backattrs(id)? {
                neighbors.extend(backattrs.into_values().flatten());
            }
        }
        if kind.covers(RefKind::Link) {
            neighbors.extend(node.links.iter().map(|link| link.id.clone()));
            if let Some(backlinks) = self.backlinks(id)? {
                neighbors.extend(backlinks.into_iter().map(|link| link.id));
            }
        }
        if kind.covers(RefKind::Embed) {
            neighbors.extend(node.embeds.iter().map(|embed| embed.id.clone()));
            if let Some(backembeds) = self.backembeds(id)? {
                neighbors.extend(backembeds.into_iter().map(|embed| embed.id));
            }
        }
        Ok(Some(neighbors))
    }

    /// Non-zombie nodes without any web neighbor
    fn floaters(&self) -> Result<Vec<String>> {
        self.store().check_lock()?;
        let mut floaters = Vec::new();
        for node in self.store().iter_nodes() {
            if node.is_zombie() {
                continue;
            }
            let isolated = self
                .neighbors(&node.id, RefKind::Ref)?
                .map_or(true, |neighbors| neighbors.is_empty());
            if isolated {
                floaters.push(node.id.clone());
            }
        }
        Ok(floaters)
    }

    fn floaters_with(&self, projection: &Projection) -> Result<Vec<Value>> {
        project_ids(self.store(), &self.floaters()?, projection)
    }

    //
    // MUTATIONS
    //

    /// Add a relation from `source` to `target`.
    ///
    /// `label` is the attr/link type or, for embeds, the media kind (`""`
    /// means markdown). Re-adding an existing relation is a successful no-op.
    fn connect(&mut self, kind: RefKind, source: &str, target: &str, label: &str) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        if kind == RefKind::Ref {
            store.warn("please connect to a more specific relationship ('attr', 'link', or 'embed')");
            return Ok(false);
        }
        if store.node(source).is_none() {
            store.warn(format!("source node with id \"{}\" not found", source));
            return Ok(false);
        }
        if store.node(target).is_none() {
            store.warn(format!("target node with id \"{}\" not found", target));
            return Ok(false);
        }
        let media = if kind == RefKind::Embed {
            match media_kind(store, label) {
                Some(media) => Some(media),
                None => return Ok(false),
            }
        } else {
            None
        };

        let Some(node) = self.store_mut().node_mut(source) else {
            return Ok(false);
        };
        match (kind, media) {
            (RefKind::Attr, _) => {
                node.attrs
                    .entry(label.to_string())
                    .or_default()
                    .insert(target.to_string());
            }
            (RefKind::Link, _) => {
                let link = Link::new(label, target);
                if !node.links.contains(&link) {
                    node.links.push(link);
                }
            }
            (RefKind::Embed, Some(media)) => {
                let embed = Embed::new(media, target);
                if !node.embeds.contains(&embed) {
                    node.embeds.push(embed);
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Remove a relation from `source` to `target`.
    ///
    /// A relation that is not there counts as removed.
    fn disconnect(
        &mut self,
        kind: RefKind,
        source: &str,
        target: &str,
        label: &str,
    ) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store();
        if kind == RefKind::Ref {
            store.warn(
                "please disconnect a more specific relationship ('attr', 'link', or 'embed')",
            );
            return Ok(false);
        }
        if store.node(source).is_none() {
            store.warn(format!("source node with id \"{}\" not found", source));
            return Ok(false);
        }
        let media = if kind == RefKind::Embed {
            match media_kind(store, label) {
                Some(media) => Some(media),
                None => return Ok(false),
            }
        } else {
            None
        };

        let Some(node) = self.store_mut().node_mut(source) else {
            return Ok(false);
        };
        match (kind, media) {
            (RefKind::Attr, _) => {
                if let Some(ids) = node.attrs.get_mut(label) {
                    ids.remove(target);
                    if ids.is_empty() {
                        node.attrs.remove(label);
                    }
                }
            }
            (RefKind::Link, _) => {
                node.links
                    .retain(|link| !(link.link_type == label && link.id == target));
            }
            (RefKind::Embed, Some(media)) => {
                node.embeds
                    .retain(|embed| !(embed.media == media && embed.id == target));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Rename a relation label across every node.
    ///
    /// An attr bucket is only renamed where `new` is not already a bucket on
    /// that node. True if every attempted rename took effect.
    fn retype(&mut self, old: &str, new: &str, kind: RefKind) -> Result<bool> {
        self.store().check_lock()?;
        let mut all_renamed = true;
        for node in self.store_mut().iter_nodes_mut() {
            if kind.covers(RefKind::Attr)
                && node.attrs.contains_key(old)
                && !node.attrs.contains_key(new)
            {
                if let Some(ids) = node.attrs.remove(old) {
                    node.attrs.insert(new.to_string(), ids);
                }
                all_renamed &= node.attrs.contains_key(new);
            }
            if kind.covers(RefKind::Link) {
                for link in node.links.iter_mut().filter(|link| link.link_type == old) {
                    link.link_type = new.to_string();
                    all_renamed &= link.link_type == new;
                }
            }
        }
        Ok(all_renamed)
    }

    /// Move `source`'s relations of the selected kinds onto `target`.
    ///
    /// Edges that would make `target` point at itself are dropped, and
    /// links/embeds `target` already has are not duplicated.
    fn transfer(&mut self, source: &str, target: &str, kind: RefKind) -> Result<bool> {
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
        if store.node(target).is_none() {
            store.warn(format!("target node with id \"{}\" not in index", target));
            return Ok(false);
        }

        let store = self.store_mut();
        let Some(node) = store.node_mut(source) else {
            return Ok(false);
        };
        let mut attrs = Attrs::new();
        let mut links = Vec::new();
        let mut embeds = Vec::new();
        if kind.covers(RefKind::Attr) {
            attrs = std::mem::take(&mut node.attrs);
        }
        if kind.covers(RefKind::Link) {
            links = std::mem::take(&mut node.links);
        }
        if kind.covers(RefKind::Embed) {
            embeds = std::mem::take(&mut node.embeds);
        }

        let Some(node) = store.node_mut(target) else {
            return Ok(false);
        };
        for (label, ids) in attrs {
            let ids: BTreeSet<String> = ids.into_iter().filter(|id| id != target).collect();
            if !ids.is_empty() {
                node.attrs.entry(label).or_default().extend(ids);
            }
        }
        for link in links {
            if link.id != target && !node.links.contains(&link) {
                node.links.push(link);
            }
        }
        for embed in embeds {
            if embed.id != target && !node.embeds.contains(&embed) {
                node.embeds.push(embed);
            }
        }
        Ok(true)
    }

    /// Clear web relations and collect zombies left unreferenced.
    ///
    /// With an id only that node's attrs, links and embeds are cleared, and
    /// each zombie it pointed at is deleted if nothing else references it.
    /// Without an id every node is cleared and zombies that are no longer
    /// anyone's child are deleted.
    fn flush_rel_refs(&mut self, id: Option<&str>) -> Result<bool> {
        self.store().check_lock()?;
        let store = self.store_mut();
        match id {
            Some(id) => {
                let Some(node) = store.node_mut(id) else {
                    store.warn(format!("node with id \"{}\" does not exist", id));
                    return Ok(false);
                };
                let targets = node.web_targets();
                node.flush(Some(Structure::Web));
                for target in targets {
                    if target != id {
                        store.collect_zombie(&target, &[]);
                    }
                }
            }
            None => {
                for node in store.iter_nodes_mut() {
                    node.flush(Some(Structure::Web));
                }
                let zombies: Vec<String> = store
                    .iter_nodes()
                    .filter(|node| node.is_zombie())
                    .map(|node| node.id.clone())
                    .collect();
                for zombie in zombies {
                    store.collect_zombie(&zombie, &[]);
                }
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
#[path = "web_test.rs"]
mod web_test;
