//! Merge engine: grafts expansion candidates under a target node.

use crate::tree::{Node, Tree};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A child concept proposed by the expansion service, not yet part of any tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateChild {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl CandidateChild {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            relationship: None,
        }
    }

    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.relationship = Some(relationship.into());
        self
    }

    /// Blank ids or names are rejected before merging.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.name.trim().is_empty()
    }

    fn to_node(&self) -> Node {
        Node {
            id: self.id.clone(),
            name: self.name.clone(),
            relationship: self.relationship.clone(),
            response: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub tree: Tree,
    pub target_found: bool,
    /// Number of nodes carrying `target_id` that received the candidates.
    pub targets: usize,
    /// Ids appended under the (first) target, in order.
    pub added: Vec<String>,
    /// Candidates dropped because the id was already a child or repeated earlier in the batch.
    pub duplicates: usize,
    /// Candidates dropped because of a blank id or name.
    pub malformed: usize,
}

/// Children to append after `existing`: well-formed candidates whose id is neither an existing
/// child id nor taken by an earlier candidate of the same batch. Input order is kept.
pub fn new_children(
    existing: &[Arc<Node>],
    candidates: &[CandidateChild],
) -> (Vec<Arc<Node>>, usize, usize) {
    let mut taken: FxHashSet<&str> = existing.iter().map(|c| c.id.as_str()).collect();
    let mut additions = Vec::new();
    let mut duplicates = 0;
    let mut malformed = 0;

    for candidate in candidates {
        if !candidate.is_well_formed() {
            malformed += 1;
            continue;
        }
        if !taken.insert(candidate.id.as_str()) {
            duplicates += 1;
            continue;
        }
        additions.push(Arc::new(candidate.to_node()));
    }

    (additions, duplicates, malformed)
}

/// Produces a new tree where every node with `target_id` has `existing ++ dedupe(candidates)`
/// as children. Ids normally identify a single node; when they repeat across subtrees each
/// occurrence is grafted, and the counters describe the first one in pre-order.
///
/// When the target is missing, the returned tree is the input snapshot itself
/// (`target_found == false`). Otherwise the root-to-target paths are always copied, even if
/// nothing was appended.
pub fn merge_candidates(
    tree: &Tree,
    target_id: &str,
    candidates: &[CandidateChild],
) -> MergeOutcome {
    let mut added = Vec::new();
    let mut duplicates = 0;
    let mut malformed = 0;
    let mut first = true;

    let merged = tree.update_node(target_id, |node| {
        let (additions, dup, bad) = new_children(&node.children, candidates);
        if first {
            first = false;
            duplicates = dup;
            malformed = bad;
            added = additions.iter().map(|c| c.id.clone()).collect();
        }
        node.children.extend(additions);
    });

    match merged {
        Some((tree, targets)) => MergeOutcome {
            tree,
            target_found: true,
            targets,
            added,
            duplicates,
            malformed,
        },
        None => {
            tracing::debug!(node_id = target_id, "merge target not found; tree unchanged");
            MergeOutcome {
                tree: tree.clone(),
                target_found: false,
                targets: 0,
                added,
                duplicates,
                malformed,
            }
        }
    }
}
