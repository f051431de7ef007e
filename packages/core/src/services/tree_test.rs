//! Unit tests for the tree engine
//!
//! Fixture (5 is an orphan):
//!
//! ```text
//!     1
//!     |
//!     2
//!    / \
//!   3   4
//! ```

use super::*;
use crate::diagnostics::CapturingSink;
use crate::services::TreeIndex;
use crate::testing::{config, docs, fixed_id};
use serde_json::json;

fn bonsai_with(sink: &CapturingSink) -> TreeIndex {
    let store = NodeStore::builder(config())
        .id_generator(fixed_id)
        .diagnostics(sink.clone())
        .build(docs())
        .unwrap();
    let mut tree = TreeIndex::from_store(store);
    assert!(tree.set_root("1").unwrap());
    assert!(tree.graft("1", "2", false).unwrap());
    assert!(tree.graft("2", "3", false).unwrap());
    assert!(tree.graft("2", "4", false).unwrap());
    tree
}

fn bonsai() -> TreeIndex {
    bonsai_with(&CapturingSink::new())
}

fn children_of(tree: &TreeIndex, id: &str) -> Vec<String> {
    tree.get(id).unwrap().unwrap().children.clone()
}

#[test]
fn test_set_root_requires_existing_node() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    assert!(!tree.set_root("-1").unwrap());
    assert!(sink.contains("node with id \"-1\" not in index"));
    assert_eq!(tree.root().unwrap().as_deref(), Some("1"));
    assert_eq!(
        tree.root_with(&Projection::from("title")).unwrap(),
        Some(json!("One"))
    );
}

#[test]
fn test_ancestors() {
    let tree = bonsai();
    assert_eq!(tree.ancestors("1").unwrap(), Some(vec![]));
    assert_eq!(tree.ancestors("2").unwrap(), Some(vec!["1".to_string()]));
    assert_eq!(
        tree.ancestors("3").unwrap(),
        Some(vec!["1".to_string(), "2".to_string()])
    );
    assert_eq!(tree.ancestors("5").unwrap(), Some(vec![]));
    assert_eq!(tree.ancestors("-1").unwrap(), None);
}

#[test]
fn test_parent_and_siblings() {
    let tree = bonsai();
    assert_eq!(tree.parent("1").unwrap().as_deref(), Some(""));
    assert_eq!(tree.parent("3").unwrap().as_deref(), Some("2"));
    assert_eq!(tree.siblings("3").unwrap(), Some(vec!["4".to_string()]));
    assert_eq!(tree.siblings("2").unwrap(), Some(vec![]));
}

#[test]
fn test_children_descendants_lineage() {
    let tree = bonsai();
    assert_eq!(
        tree.children("2").unwrap(),
        Some(vec!["3".to_string(), "4".to_string()])
    );
    assert_eq!(
        tree.descendants("1").unwrap(),
        Some(vec!["2".to_string(), "3".to_string(), "4".to_string()])
    );
    assert_eq!(
        tree.lineage("2").unwrap(),
        Some(vec!["1".to_string(), "3".to_string(), "4".to_string()])
    );
    assert_eq!(tree.level("4").unwrap(), Some(2));
}

#[test]
fn test_family_collects_several_relations() {
    let tree = bonsai();
    let family = tree
        .family(
            "3",
            &[FamilyRelation::Ancestors, FamilyRelation::Parent, FamilyRelation::Siblings],
        )
        .unwrap()
        .unwrap();
    assert_eq!(family.ancestors, Some(vec!["1".to_string(), "2".to_string()]));
    assert_eq!(family.parent, Some(vec!["2".to_string()]));
    assert_eq!(family.siblings, Some(vec!["4".to_string()]));
    assert_eq!(family.children, None);

    let titles = tree
        .family_with("2", FamilyRelation::Children, &Projection::from("title"))
        .unwrap();
    assert_eq!(titles, Some(vec![json!("Three"), json!("Four")]));
}

#[test]
fn test_family_without_root() {
    let store = NodeStore::new(docs(), config()).unwrap();
    let tree = TreeIndex::from_store(store);
    assert_eq!(tree.ancestors("1").unwrap(), None);
    assert!(!tree.is_tree().unwrap());
}

#[test]
fn test_orphans() {
    let tree = bonsai();
    assert_eq!(
        tree.orphans(&["1", "2", "3", "4", "5"]).unwrap(),
        vec!["5".to_string()]
    );
    assert_eq!(
        tree.orphans_with(&["5"], &Projection::from("filename")).unwrap(),
        vec![json!("five")]
    );
}

#[test]
fn test_structure_checks() {
    let tree = bonsai();
    assert!(tree.is_tree().unwrap());
    assert!(tree.is_tree_from("2").unwrap());
    assert!(tree.in_tree("3").unwrap());
    assert!(!tree.in_tree("5").unwrap());
    assert!(tree.is_root("1").unwrap());
    assert!(!tree.is_root("2").unwrap());
    assert!(tree.is_leaf("3").unwrap());
    assert!(!tree.is_leaf("2").unwrap());
}

#[test]
fn test_is_tree_detects_cycle() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    tree.store_mut()
        .node_mut("4")
        .unwrap()
        .children
        .push("1".to_string());
    assert!(!tree.is_tree().unwrap());
    assert!(sink.contains("node with id \"1\" already visited"));

    // Family search stays bounded on a cyclic tree
    assert_eq!(tree.ancestors("5").unwrap(), Some(vec![]));
}

#[test]
fn test_is_tree_detects_missing_child() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    tree.store_mut()
        .node_mut("3")
        .unwrap()
        .children
        .push("-1".to_string());
    assert!(!tree.is_tree().unwrap());
    assert!(sink.contains("node with id \"-1\" not found"));
}

#[test]
fn test_family_fails_on_missing_child() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    tree.store_mut()
        .node_mut("3")
        .unwrap()
        .children
        .push("-1".to_string());

    assert_eq!(tree.descendants("2").unwrap(), None);
    assert_eq!(tree.lineage("3").unwrap(), None);
    assert!(sink.contains("node with id \"-1\" not found"));

    // The walk to "4" never passes the broken entry
    assert_eq!(
        tree.ancestors("4").unwrap(),
        Some(vec!["1".to_string(), "2".to_string()])
    );
}

#[test]
fn test_graft() {
    let mut tree = bonsai();
    assert!(tree.graft("4", "5", false).unwrap());
    assert_eq!(children_of(&tree, "4"), vec!["5"]);
    assert_eq!(
        tree.ancestors("5").unwrap(),
        Some(vec!["1".to_string(), "2".to_string(), "4".to_string()])
    );
}

#[test]
fn test_graft_rejections() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);

    assert!(!tree.graft("4", "2", false).unwrap());
    assert!(sink.contains("child node with id \"2\" already exists in the tree"));
    assert!(!tree.graft("1", "1", false).unwrap());
    assert!(!tree.graft("-1", "5", false).unwrap());
    assert!(!tree.graft("1", "-1", false).unwrap());
    assert_eq!(children_of(&tree, "1"), vec!["2"]);
}

#[test]
fn test_graft_rolls_back_invalid_tree() {
    let mut tree = bonsai();
    // Grafting the root under a leaf would close a cycle
    assert!(!tree.graft("3", "1", false).unwrap());
    assert!(children_of(&tree, "3").is_empty());
    assert!(tree.is_tree().unwrap());
}

#[test]
fn test_graft_force_skips_validation() {
    let mut tree = bonsai();
    assert!(tree.graft("3", "1", true).unwrap());
    assert_eq!(children_of(&tree, "3"), vec!["1"]);
    assert!(!tree.is_tree().unwrap());
}

#[test]
fn test_prune() {
    let mut tree = bonsai();
    assert!(tree.prune("2", "4", false).unwrap());
    assert_eq!(children_of(&tree, "2"), vec!["3"]);
    assert_eq!(tree.orphans(&["4", "5"]).unwrap(), vec!["4", "5"]);
}

#[test]
fn test_prune_rejections() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);

    assert!(!tree.prune("1", "2", false).unwrap());
    assert!(sink.contains("cannot prune root or non-leaf child node"));
    assert!(!tree.prune("1", "1", false).unwrap());
    assert!(!tree.prune("1", "3", false).unwrap());
    assert!(sink.contains("is not a child of parent \"1\""));
    assert_eq!(children_of(&tree, "2"), vec!["3", "4"]);
}

#[test]
fn test_replace() {
    let mut tree = bonsai();
    assert!(tree.replace("2", "5").unwrap());
    assert_eq!(children_of(&tree, "1"), vec!["5"]);
    assert_eq!(children_of(&tree, "5"), vec!["3", "4"]);
    assert!(children_of(&tree, "2").is_empty());
    assert_eq!(tree.orphans(&["2"]).unwrap(), vec!["2"]);
    assert!(tree.is_tree().unwrap());
}

#[test]
fn test_replace_rejections() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    assert!(!tree.replace("2", "3").unwrap());
    assert!(sink.contains("target with \"id\" \"3\" already exists in tree"));
    assert!(!tree.replace("1", "5").unwrap());
    assert!(sink.contains("no parent exists"));
    assert!(!tree.replace("2", "2").unwrap());
}

#[test]
fn test_transplant() {
    let mut tree = bonsai();
    let subtree = vec![
        SubtreeEntry::new("2", ["4", "3"]),
        SubtreeEntry::new("4", ["5"]),
    ];
    assert!(tree.transplant("2", &subtree).unwrap());
    assert_eq!(children_of(&tree, "2"), vec!["4", "3"]);
    assert_eq!(children_of(&tree, "4"), vec!["5"]);
    assert!(tree.is_tree().unwrap());
}

#[test]
fn test_transplant_rolls_back_cycle() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    let before = tree.nodes().unwrap().clone();

    let subtree = vec![
        SubtreeEntry::new("2", ["3", "4"]),
        SubtreeEntry::new("4", ["2"]),
    ];
    assert!(!tree.transplant("2", &subtree).unwrap());
    assert!(sink.contains("rolling back to previous state"));
    assert_eq!(tree.nodes().unwrap(), &before);
}

#[test]
fn test_transplant_requires_subroot_entry() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    assert!(!tree.transplant("2", &[SubtreeEntry::new("3", ["5"])]).unwrap());
    assert!(sink.contains("subroot with id \"2\" not found in the subtree"));
}

#[test]
fn test_graft_by_path_walks_existing_levels() {
    let mut tree = bonsai();
    assert!(tree.graft_by_path("5", &["one", "two", "four"], "filename").unwrap());
    assert_eq!(children_of(&tree, "4"), vec!["5"]);
}

#[test]
fn test_graft_by_path_creates_zombie_levels() {
    let mut tree = bonsai();
    assert!(tree.graft_by_path("5", &["one", "two", "six"], "filename").unwrap());

    let zombie = tree.get("404").unwrap().unwrap();
    assert!(zombie.is_zombie());
    assert_eq!(zombie.data["filename"], "six");
    assert_eq!(children_of(&tree, "2"), vec!["3", "4", "404"]);
    assert_eq!(children_of(&tree, "404"), vec!["5"]);
    assert_eq!(
        tree.ancestors("5").unwrap(),
        Some(vec!["1".to_string(), "2".to_string(), "404".to_string()])
    );
}

#[test]
fn test_graft_by_path_rejections() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    assert!(!tree.graft_by_path("5", &["two"], "filename").unwrap());
    assert!(sink.contains("does not match the tree root"));
    assert!(!tree.graft_by_path("3", &["one"], "filename").unwrap());
    assert!(!tree.graft_by_path("-1", &["one"], "filename").unwrap());
    assert!(!tree.has("404").unwrap());
}

#[test]
fn test_graft_by_path_rolls_back_zombies() {
    let mut tree = bonsai();
    // Generated ids collide on the second level, so the path cannot be built
    assert!(!tree.graft_by_path("5", &["one", "six", "seven"], "filename").unwrap());
    assert!(!tree.has("404").unwrap());
    assert_eq!(children_of(&tree, "1"), vec!["2"]);
}

#[test]
fn test_prune_by_path_collects_zombie_levels() {
    let mut tree = bonsai();
    assert!(tree.graft_by_path("5", &["one", "two", "six"], "filename").unwrap());

    assert!(tree.prune_by_path("5", &["one", "two", "six"], "filename").unwrap());
    assert!(!tree.has("404").unwrap());
    assert_eq!(children_of(&tree, "2"), vec!["3", "4"]);
    assert!(tree.is_tree().unwrap());
}

#[test]
fn test_prune_by_path_keeps_referenced_zombie() {
    let mut tree = bonsai();
    assert!(tree.graft_by_path("5", &["one", "two", "six"], "filename").unwrap());
    tree.store_mut()
        .node_mut("3")
        .unwrap()
        .links
        .push(crate::models::Link::new("", "404"));

    assert!(tree.prune_by_path("5", &["one", "two", "six"], "filename").unwrap());
    assert!(tree.has("404").unwrap());
    assert_eq!(children_of(&tree, "2"), vec!["3", "4", "404"]);
}

#[test]
fn test_path_zombie_leaves_document_lookup_intact() {
    let mut tree = bonsai();
    let five = json!("five");

    // "five" is a document outside the tree, so the level becomes a zombie
    assert!(tree.graft_by_path("5", &["one", "five"], "filename").unwrap());
    assert!(tree.has("404").unwrap());
    assert_eq!(tree.find("filename", &five).unwrap().unwrap().id, "5");

    assert!(tree.prune_by_path("5", &["one", "five"], "filename").unwrap());
    assert!(!tree.has("404").unwrap());
    assert_eq!(tree.find("filename", &five).unwrap().unwrap().id, "5");
}

#[test]
fn test_graft_by_path_rollback_keeps_document_lookup() {
    let mut tree = bonsai();
    // The second zombie level collides with the first generated id
    assert!(!tree.graft_by_path("5", &["one", "five", "seven"], "filename").unwrap());
    assert!(!tree.has("404").unwrap());
    assert_eq!(
        tree.find("filename", &json!("five")).unwrap().unwrap().id,
        "5"
    );
}

#[test]
fn test_prune_by_path_rejections() {
    let sink = CapturingSink::new();
    let mut tree = bonsai_with(&sink);
    assert!(!tree.prune_by_path("-1", &["one"], "filename").unwrap());
    assert!(!tree.prune_by_path("4", &["one", "nine"], "filename").unwrap());
    assert!(sink.contains("path segment \"nine\" not found"));
    assert!(!tree.prune_by_path("2", &["one"], "filename").unwrap());
}

#[test]
fn test_flush_rel_fams() {
    let mut tree = bonsai();
    assert!(tree.graft_by_path("5", &["one", "two", "six"], "filename").unwrap());

    assert!(tree.flush_rel_fams().unwrap());
    assert!(!tree.has("404").unwrap());
    assert!(tree
        .all_nodes()
        .unwrap()
        .iter()
        .all(|node| node.children.is_empty()));
}

#[test]
fn test_render_tree() {
    let tree = bonsai();
    let rendered = tree.render_tree("title").unwrap().unwrap();
    assert_eq!(
        rendered,
        "1: \"One\"\n└── 2: \"Two\"\n    ├── 3: \"Three\"\n    └── 4: \"Four\"\n"
    );
}

#[test]
fn test_safe_mode_rejects_unlocked_calls() {
    let store = NodeStore::new(docs(), config().thread_safe(None)).unwrap();
    let tree = TreeIndex::from_store(store);
    assert!(matches!(
        tree.lineage("1"),
        Err(crate::db::StoreError::LockNotHeld)
    ));
}
