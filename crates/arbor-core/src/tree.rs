//! Canonical knowledge-tree model.
//!
//! A [`Tree`] is a cheap handle to a reference-counted root [`Node`]. Mutations never touch a
//! node that another snapshot can see: they clone the nodes on the path from the root to the
//! matching node and reuse every other subtree as-is.

use crate::merge::{CandidateChild, merge_candidates};
use crate::{Error, Result};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::Arc;

/// Identifier carried by the root of every tree.
pub const ROOT_ID: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    /// How this node relates to its parent ("type", "company", ...). Presentation only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default)]
    pub children: Vec<Arc<Node>>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            relationship: None,
            response: None,
            children: Vec::new(),
        }
    }

    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(Arc::new(child));
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, id: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.id == id).map(|c| c.as_ref())
    }

    pub fn child_ids(&self) -> Vec<&str> {
        self.children.iter().map(|c| c.id.as_str()).collect()
    }
}

/// Pre-order (parent before children, children left to right) walk yielding `(depth, node)`.
pub struct PreOrder<'a> {
    stack: Vec<(usize, &'a Node)>,
}

impl<'a> PreOrder<'a> {
    pub fn new(root: &'a Node) -> Self {
        Self {
            stack: vec![(0, root)],
        }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (usize, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push((depth + 1, child.as_ref()));
        }
        Some((depth, node))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    root: Arc<Node>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new("Root")
    }
}

impl Tree {
    /// Creates a tree holding a single root with no children.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: Arc::new(Node::new(ROOT_ID, root_name)),
        }
    }

    /// Wraps an existing node hierarchy after checking the structural invariants: the root is
    /// named [`ROOT_ID`], every id is non-blank and no parent has two children with one id.
    pub fn from_root(root: Node) -> Result<Self> {
        if root.id != ROOT_ID {
            return Err(Error::InvalidTree {
                message: format!("root id must be `{ROOT_ID}`, got `{}`", root.id),
            });
        }
        for (_, node) in PreOrder::new(&root) {
            if node.id.trim().is_empty() {
                return Err(Error::InvalidTree {
                    message: format!("node named `{}` has a blank id", node.name),
                });
            }
            let mut seen: FxHashSet<&str> = FxHashSet::default();
            for child in &node.children {
                if !seen.insert(child.id.as_str()) {
                    return Err(Error::InvalidTree {
                        message: format!(
                            "duplicate child id `{}` under `{}`",
                            child.id, node.id
                        ),
                    });
                }
            }
        }
        Ok(Self {
            root: Arc::new(root),
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let root: Node = serde_json::from_str(text)?;
        Self::from_root(root)
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::to_value(self.root.as_ref()).unwrap_or(serde_json::Value::Null)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_arc(&self) -> &Arc<Node> {
        &self.root
    }

    /// `true` when both handles point at the very same snapshot (not merely equal content).
    pub fn same_snapshot(&self, other: &Tree) -> bool {
        Arc::ptr_eq(&self.root, &other.root)
    }

    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder::new(&self.root)
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    pub fn max_depth(&self) -> usize {
        self.iter().map(|(depth, _)| depth).max().unwrap_or(0)
    }

    /// Depth-first pre-order lookup; the first match wins when ids repeat across subtrees.
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.iter().map(|(_, node)| node).find(|node| node.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find_node(id).is_some()
    }

    /// Child-index path from the root to the first pre-order match of `id`.
    pub fn find_path(&self, id: &str) -> Option<Vec<usize>> {
        // (node, path-len to restore, child index taken to reach it)
        let mut path: Vec<usize> = Vec::new();
        let mut stack: Vec<(&Node, usize, Option<usize>)> = vec![(self.root.as_ref(), 0, None)];
        while let Some((node, depth, index)) = stack.pop() {
            path.truncate(depth);
            if let Some(index) = index {
                path.push(index);
            }
            if node.id == id {
                return Some(path);
            }
            let next_depth = path.len();
            for (i, child) in node.children.iter().enumerate().rev() {
                stack.push((child.as_ref(), next_depth, Some(i)));
            }
        }
        None
    }

    /// Applies `edit` to a private copy of every node matching `id` and returns the new tree
    /// together with the number of matches.
    ///
    /// A matched node's own subtree is not searched further. Returns `None` when the id is
    /// absent. Nodes off the root-to-match paths are shared with `self`.
    pub fn update_node(
        &self,
        id: &str,
        mut edit: impl FnMut(&mut Node),
    ) -> Option<(Tree, usize)> {
        let mut matches = 0;
        let root = copy_matching(&self.root, id, &mut edit, &mut matches)?;
        Some((Tree { root }, matches))
    }

    /// Replaces the display name of every node with `id`. A missing id returns `self`
    /// unchanged; an unchanged name still yields a fresh copy.
    pub fn rename(&self, id: &str, new_name: impl Into<String>) -> Tree {
        let new_name = new_name.into();
        match self.update_node(id, |node| node.name.clone_from(&new_name)) {
            Some((tree, _)) => tree,
            None => {
                tracing::debug!(node_id = id, "rename target not found; tree unchanged");
                self.clone()
            }
        }
    }

    /// Sets (or clears) the response annotation of `id`; same lookup policy as [`Tree::rename`].
    pub fn with_response(&self, id: &str, response: Option<String>) -> Tree {
        match self.update_node(id, |node| node.response.clone_from(&response)) {
            Some((tree, _)) => tree,
            None => {
                tracing::debug!(node_id = id, "response target not found; tree unchanged");
                self.clone()
            }
        }
    }

    /// Appends the not-yet-present `candidates` under `id`. See [`merge_candidates`].
    pub fn with_merged_children(&self, id: &str, candidates: &[CandidateChild]) -> Tree {
        merge_candidates(self, id, candidates).tree
    }
}

fn copy_matching<F>(
    node: &Arc<Node>,
    id: &str,
    edit: &mut F,
    matches: &mut usize,
) -> Option<Arc<Node>>
where
    F: FnMut(&mut Node),
{
    if node.id == id {
        let mut copy = Node::clone(node);
        edit(&mut copy);
        *matches += 1;
        return Some(Arc::new(copy));
    }

    let mut children: Option<Vec<Arc<Node>>> = None;
    for (i, child) in node.children.iter().enumerate() {
        if let Some(updated) = copy_matching(child, id, edit, matches) {
            children.get_or_insert_with(|| node.children.clone())[i] = updated;
        }
    }
    let children = children?;
    Some(Arc::new(Node {
        id: node.id.clone(),
        name: node.name.clone(),
        relationship: node.relationship.clone(),
        response: node.response.clone(),
        children,
    }))
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let root = Node::deserialize(deserializer)?;
        Tree::from_root(root).map_err(serde::de::Error::custom)
    }
}
