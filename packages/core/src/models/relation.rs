//! Relation vocabulary shared by the tree and web engines

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which relation storage of a node an operation touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Structure {
    /// `children`
    Tree,
    /// `attrs`, `links`, `embeds`
    Web,
}

/// Web relation kinds. `Ref` is the umbrella selector for all three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    #[default]
    Ref,
    Attr,
    Link,
    Embed,
}

impl RefKind {
    /// Whether this selector covers `kind`
    pub fn covers(self, kind: RefKind) -> bool {
        self == RefKind::Ref || self == kind
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefKind::Ref => "ref",
            RefKind::Attr => "attr",
            RefKind::Link => "link",
            RefKind::Embed => "embed",
        })
    }
}

/// Family relations derived from the children relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyRelation {
    /// All up, root first
    Ancestors,
    /// One up
    Parent,
    /// Same parent, excluding self
    Siblings,
    /// One down
    Children,
    /// All down
    Descendants,
    /// Ancestors followed by descendants
    Lineage,
}

/// Accumulated family search result.
///
/// A relation that was not requested stays `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Family {
    pub ancestors: Option<Vec<String>>,
    pub parent: Option<Vec<String>>,
    pub siblings: Option<Vec<String>>,
    pub children: Option<Vec<String>>,
    pub descendants: Option<Vec<String>>,
    pub lineage: Option<Vec<String>>,
}

impl Family {
    /// Empty accumulators for the requested relations
    pub fn requesting(relations: &[FamilyRelation]) -> Self {
        let mut family = Family::default();
        for relation in relations {
            *family.slot_mut(*relation) = Some(Vec::new());
        }
        family
    }

    pub fn get(&self, relation: FamilyRelation) -> Option<&Vec<String>> {
        match relation {
            FamilyRelation::Ancestors => self.ancestors.as_ref(),
            FamilyRelation::Parent => self.parent.as_ref(),
            FamilyRelation::Siblings => self.siblings.as_ref(),
            FamilyRelation::Children => self.children.as_ref(),
            FamilyRelation::Descendants => self.descendants.as_ref(),
            FamilyRelation::Lineage => self.lineage.as_ref(),
        }
    }

    /// Take one relation out, empty if it was not requested
    pub fn take(&mut self, relation: FamilyRelation) -> Vec<String> {
        self.slot_mut(relation).take().unwrap_or_default()
    }

    pub(crate) fn slot_mut(&mut self, relation: FamilyRelation) -> &mut Option<Vec<String>> {
        match relation {
            FamilyRelation::Ancestors => &mut self.ancestors,
            FamilyRelation::Parent => &mut self.parent,
            FamilyRelation::Siblings => &mut self.siblings,
            FamilyRelation::Children => &mut self.children,
            FamilyRelation::Descendants => &mut self.descendants,
            FamilyRelation::Lineage => &mut self.lineage,
        }
    }
}

/// One entry of a subtree redefinition passed to `transplant`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtreeEntry {
    pub id: String,
    pub children: Vec<String>,
}

impl SubtreeEntry {
    pub fn new<I, S>(id: impl Into<String>, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            children: children.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_kind_covers() {
        assert!(RefKind::Ref.covers(RefKind::Attr));
        assert!(RefKind::Link.covers(RefKind::Link));
        assert!(!RefKind::Link.covers(RefKind::Embed));
    }

    #[test]
    fn test_family_requesting_only_sets_requested_slots() {
        let mut family = Family::requesting(&[FamilyRelation::Parent, FamilyRelation::Lineage]);
        assert_eq!(family.get(FamilyRelation::Parent), Some(&Vec::new()));
        assert!(family.get(FamilyRelation::Ancestors).is_none());
        assert!(family.take(FamilyRelation::Children).is_empty());
    }
}
