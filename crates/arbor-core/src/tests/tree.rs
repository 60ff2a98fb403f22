use crate::*;
use serde_json::json;
use std::sync::Arc;

fn sample() -> Tree {
    Tree::from_root(
        Node::new("root", "AI")
            .with_child(
                Node::new("ml", "Machine Learning")
                    .with_relationship("type")
                    .with_child(Node::new("supervised", "Supervised Learning")),
            )
            .with_child(Node::new("dl", "Deep Learning").with_relationship("type")),
    )
    .unwrap()
}

#[test]
fn new_tree_has_a_single_root() {
    let tree = Tree::new("Artificial Intelligence");
    assert_eq!(tree.root().id, ROOT_ID);
    assert_eq!(tree.root().name, "Artificial Intelligence");
    assert!(tree.root().is_leaf());
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.max_depth(), 0);
}

#[test]
fn pre_order_visits_parents_before_children_left_to_right() {
    let tree = sample();
    let order: Vec<(usize, &str)> = tree.iter().map(|(d, n)| (d, n.id.as_str())).collect();
    assert_eq!(
        order,
        vec![(0, "root"), (1, "ml"), (2, "supervised"), (1, "dl")]
    );
}

#[test]
fn find_node_returns_first_pre_order_match() {
    let tree = Tree::from_root(
        Node::new("root", "AI")
            .with_child(Node::new("a", "A").with_child(Node::new("x", "first")))
            .with_child(Node::new("x", "second")),
    )
    .unwrap();
    assert_eq!(tree.find_node("x").unwrap().name, "first");
    assert_eq!(tree.find_path("x"), Some(vec![0, 0]));
    assert!(tree.find_node("missing").is_none());
}

#[test]
fn find_path_tracks_sibling_indices() {
    let tree = sample();
    assert_eq!(tree.find_path("root"), Some(vec![]));
    assert_eq!(tree.find_path("dl"), Some(vec![1]));
    assert_eq!(tree.find_path("supervised"), Some(vec![0, 0]));
}

#[test]
fn rename_replaces_only_the_target_name() {
    let tree = sample();
    let renamed = tree.rename("dl", "Deep Nets");
    assert_eq!(renamed.find_node("dl").unwrap().name, "Deep Nets");
    assert_eq!(tree.find_node("dl").unwrap().name, "Deep Learning");
    assert!(Arc::ptr_eq(
        &tree.root().children[0],
        &renamed.root().children[0]
    ));
}

#[test]
fn rename_to_same_name_still_copies() {
    let tree = sample();
    let renamed = tree.rename("ml", "Machine Learning");
    assert_eq!(renamed, tree);
    assert!(!renamed.same_snapshot(&tree));
}

#[test]
fn rename_of_missing_id_returns_the_same_snapshot() {
    let tree = sample();
    let renamed = tree.rename("does-not-exist", "X");
    assert_eq!(renamed, tree);
    assert!(renamed.same_snapshot(&tree));
}

#[test]
fn with_response_sets_and_clears_the_annotation() {
    let tree = sample();
    let answered = tree.with_response("ml", Some("ML learns from data.".to_string()));
    assert_eq!(
        answered.find_node("ml").unwrap().response.as_deref(),
        Some("ML learns from data.")
    );
    assert_eq!(answered.find_node("ml").unwrap().children.len(), 1);
    let cleared = answered.with_response("ml", None);
    assert_eq!(cleared, tree);
}

#[test]
fn from_root_rejects_non_root_id() {
    let err = Tree::from_root(Node::new("top", "AI")).unwrap_err();
    assert!(err.to_string().contains("root id must be `root`"));
}

#[test]
fn from_root_rejects_duplicate_sibling_ids() {
    let err = Tree::from_root(
        Node::new("root", "AI")
            .with_child(Node::new("ml", "ML"))
            .with_child(Node::new("ml", "ML again")),
    )
    .unwrap_err();
    assert!(err.to_string().contains("duplicate child id `ml` under `root`"));
}

#[test]
fn from_root_allows_repeated_ids_under_different_parents() {
    let tree = Tree::from_root(
        Node::new("root", "AI")
            .with_child(Node::new("a", "A").with_child(Node::new("x", "X")))
            .with_child(Node::new("b", "B").with_child(Node::new("x", "X"))),
    );
    assert!(tree.is_ok());
}

#[test]
fn json_document_round_trips_through_serde() {
    let doc = json!({
        "id": "root",
        "name": "AI",
        "children": [
            { "id": "ml", "name": "Machine Learning", "relationship": "type", "children": [] }
        ]
    });
    let tree: Tree = serde_json::from_value(doc.clone()).unwrap();
    assert_eq!(tree.find_node("ml").unwrap().relationship.as_deref(), Some("type"));
    assert_eq!(tree.to_json_value(), doc);
}

#[test]
fn json_document_with_missing_children_defaults_to_leaf() {
    let tree = Tree::from_json(r#"{"id":"root","name":"AI"}"#).unwrap();
    assert!(tree.root().is_leaf());
    assert!(Tree::from_json(r#"{"id":"x","name":"AI"}"#).is_err());
}

#[test]
fn rename_updates_every_node_with_a_repeated_id() {
    let tree = Tree::from_root(
        Node::new("root", "AI")
            .with_child(Node::new("a", "A").with_child(Node::new("x", "X")))
            .with_child(Node::new("b", "B").with_child(Node::new("x", "X"))),
    )
    .unwrap();
    let renamed = tree.rename("x", "Renamed");
    for parent in ["a", "b"] {
        let parent = renamed.find_node(parent).unwrap();
        assert_eq!(parent.children[0].name, "Renamed");
    }
    assert_eq!(tree.find_node("x").unwrap().name, "X");
}
