//! Expansion orchestrator: one session over one tree.
//!
//! Every node is independently `Idle` or `Expanding`. [`Explorer::ask`] moves a node to
//! `Expanding` for the duration of the service call and always moves it back, whatever the
//! result. Replies are merged against the latest committed tree (not a snapshot taken when the
//! request started), after which the layout is recomputed from scratch.
//!
//! The explorer is single-threaded and executor-agnostic: `ask` futures borrow the explorer and
//! can be driven concurrently with `futures::join!`, a `LocalPool` or any local task spawner.

use crate::client::ExpansionClient;
use crate::store::TreeStore;
use crate::wire::{DecodedReply, ExpansionError, ExpansionRequest, decode_reply};
use arbor_core::{ArborConfig, Error, Tree, merge_candidates};
use arbor_layout::{LayoutConfig, TreeLayout, Viewport, layout_tree};
use futures::future::{AbortHandle, Abortable, Aborted};
use indexmap::{IndexMap, IndexSet};
use std::cell::{Cell, RefCell};
use std::sync::Arc;

/// What to do when a node that is already expanding is asked again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpansionPolicy {
    /// Start another request; both replies are merged as they arrive.
    #[default]
    Concurrent,
    /// Reject the new request with [`ExpansionError::Busy`].
    SerializePerNode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExplorerOptions {
    pub policy: ExpansionPolicy,
}

impl ExplorerOptions {
    /// Reads `explorer.policy` (`"concurrent"` or `"serialize"`).
    pub fn from_config(config: &ArborConfig) -> arbor_core::Result<Self> {
        let policy = match config.get("explorer.policy") {
            None => ExpansionPolicy::default(),
            Some(value) => match value.as_str() {
                Some("concurrent") => ExpansionPolicy::Concurrent,
                Some("serialize") => ExpansionPolicy::SerializePerNode,
                _ => {
                    return Err(Error::InvalidConfig {
                        path: "explorer.policy".to_string(),
                        message: format!("expected \"concurrent\" or \"serialize\", got {value}"),
                    });
                }
            },
        };
        Ok(Self { policy })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExpansionOutcome {
    /// The reply was merged. `added` lists the new child ids in order.
    Merged {
        node_id: String,
        added: Vec<String>,
        duplicates: usize,
        rejected: usize,
    },
    /// The reply arrived but the node is no longer in the tree (e.g. after a reset).
    TargetMissing { node_id: String },
    /// The request never started.
    Rejected {
        node_id: String,
        error: ExpansionError,
    },
    /// The request ran and failed; the tree is unchanged.
    Failed {
        node_id: String,
        error: ExpansionError,
    },
    /// The request was cancelled before its reply was applied.
    Cancelled { node_id: String },
}

impl ExpansionOutcome {
    pub fn node_id(&self) -> &str {
        match self {
            Self::Merged { node_id, .. }
            | Self::TargetMissing { node_id }
            | Self::Rejected { node_id, .. }
            | Self::Failed { node_id, .. }
            | Self::Cancelled { node_id } => node_id,
        }
    }

    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }

    pub fn error(&self) -> Option<&ExpansionError> {
        match self {
            Self::Rejected { error, .. } | Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct InFlight {
    node_id: String,
    abort: AbortHandle,
}

type InFlightTable = RefCell<IndexMap<u64, InFlight>>;

/// Removes a request from the in-flight table when its `ask` future finishes or is dropped.
struct InFlightGuard<'a> {
    table: &'a InFlightTable,
    request_id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table.borrow_mut().shift_remove(&self.request_id);
    }
}

pub struct Explorer<C> {
    client: C,
    options: ExplorerOptions,
    store: TreeStore,
    layout_config: LayoutConfig,
    viewport: Cell<Viewport>,
    layout: RefCell<Arc<TreeLayout>>,
    in_flight: InFlightTable,
    next_request_id: Cell<u64>,
    closed: Cell<bool>,
}

impl<C: ExpansionClient> Explorer<C> {
    pub fn new(client: C, tree: Tree) -> Self {
        let layout_config = LayoutConfig::default();
        let viewport = Viewport::default();
        let layout = layout_tree(&tree, viewport, &layout_config);
        Self {
            client,
            options: ExplorerOptions::default(),
            store: TreeStore::new(tree),
            layout_config,
            viewport: Cell::new(viewport),
            layout: RefCell::new(Arc::new(layout)),
            in_flight: RefCell::new(IndexMap::new()),
            next_request_id: Cell::new(0),
            closed: Cell::new(false),
        }
    }

    /// Builds an explorer with `layout.*` and `explorer.*` settings from `config`.
    pub fn from_config(client: C, tree: Tree, config: &ArborConfig) -> arbor_core::Result<Self> {
        Ok(Self::new(client, tree)
            .with_options(ExplorerOptions::from_config(config)?)
            .with_layout_config(LayoutConfig::from_config(config)?))
    }

    pub fn with_options(mut self, options: ExplorerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_layout_config(mut self, layout_config: LayoutConfig) -> Self {
        self.layout_config = layout_config;
        self.relayout();
        self
    }

    pub fn with_viewport(self, viewport: Viewport) -> Self {
        self.set_viewport(viewport);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn options(&self) -> ExplorerOptions {
        self.options
    }

    /// The current tree snapshot.
    pub fn tree(&self) -> Tree {
        self.store.snapshot()
    }

    /// Increases whenever a new tree is committed.
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Layout of the current tree for the current viewport.
    pub fn layout(&self) -> Arc<TreeLayout> {
        self.layout.borrow().clone()
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport.get()
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.viewport.set(viewport);
        self.relayout();
    }

    pub fn is_loading(&self, node_id: &str) -> bool {
        self.in_flight
            .borrow()
            .values()
            .any(|req| req.node_id == node_id)
    }

    /// Nodes with at least one request in flight, in the order their first request started.
    pub fn loading_ids(&self) -> Vec<String> {
        let table = self.in_flight.borrow();
        let ids: IndexSet<&str> = table.values().map(|req| req.node_id.as_str()).collect();
        ids.into_iter().map(str::to_string).collect()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.borrow().len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.get()
    }

    /// Asks `question` about `node_id` and merges the returned children.
    ///
    /// Never fails: every problem is reported through the returned [`ExpansionOutcome`] and
    /// leaves the tree as it was.
    pub async fn ask(&self, node_id: &str, question: &str) -> ExpansionOutcome {
        let question = question.trim();
        if let Some(error) = self.admission_error(node_id, question) {
            tracing::warn!(node_id = %node_id, error = %error, "expansion rejected");
            return ExpansionOutcome::Rejected {
                node_id: node_id.to_string(),
                error,
            };
        }

        let (abort, registration) = AbortHandle::new_pair();
        let request_id = self.next_request_id.get();
        self.next_request_id.set(request_id + 1);
        self.in_flight.borrow_mut().insert(
            request_id,
            InFlight {
                node_id: node_id.to_string(),
                abort,
            },
        );
        let _guard = InFlightGuard {
            table: &self.in_flight,
            request_id,
        };
        tracing::debug!(request_id, node_id = %node_id, question, "expansion started");

        let request = ExpansionRequest::new(node_id, question);
        let reply = Abortable::new(self.client.expand(request), registration).await;

        let node_id = node_id.to_string();
        match reply {
            Err(Aborted) => {
                tracing::debug!(request_id, node_id = %node_id, "expansion cancelled");
                ExpansionOutcome::Cancelled { node_id }
            }
            Ok(_) if self.closed.get() => {
                tracing::debug!(request_id, node_id = %node_id, "reply after shutdown dropped");
                ExpansionOutcome::Cancelled { node_id }
            }
            Ok(Err(error)) => {
                tracing::warn!(
                    request_id,
                    node_id = %node_id,
                    error = %error,
                    "expansion failed; tree unchanged"
                );
                ExpansionOutcome::Failed { node_id, error }
            }
            Ok(Ok(raw)) => match decode_reply(raw) {
                Err(error) => {
                    tracing::warn!(
                        request_id,
                        node_id = %node_id,
                        error = %error,
                        "expansion failed; tree unchanged"
                    );
                    ExpansionOutcome::Failed { node_id, error }
                }
                Ok(decoded) => self.apply_reply(request_id, node_id, decoded),
            },
        }
    }

    fn admission_error(&self, node_id: &str, question: &str) -> Option<ExpansionError> {
        if self.closed.get() {
            return Some(ExpansionError::ShutDown);
        }
        if question.is_empty() {
            return Some(ExpansionError::EmptyQuestion);
        }
        if self.options.policy == ExpansionPolicy::SerializePerNode && self.is_loading(node_id) {
            return Some(ExpansionError::Busy {
                node_id: node_id.to_string(),
            });
        }
        None
    }

    fn apply_reply(
        &self,
        request_id: u64,
        node_id: String,
        reply: DecodedReply,
    ) -> ExpansionOutcome {
        let DecodedReply {
            candidates,
            answer,
            rejected,
        } = reply;

        let (changed, merged) = self.store.update_with(|prev| {
            let merged = merge_candidates(prev, &node_id, &candidates);
            let mut next = merged.tree.clone();
            if merged.target_found {
                if let Some(answer) = &answer {
                    next = next.with_response(&node_id, Some(answer.clone()));
                }
            }
            (next, merged)
        });
        if changed {
            self.relayout();
        }

        if !merged.target_found {
            tracing::warn!(
                request_id,
                node_id = %node_id,
                "expansion target no longer in tree; reply dropped"
            );
            return ExpansionOutcome::TargetMissing { node_id };
        }

        tracing::info!(
            request_id,
            node_id = %node_id,
            added = merged.added.len(),
            duplicates = merged.duplicates,
            rejected = rejected + merged.malformed,
            "expansion merged"
        );
        ExpansionOutcome::Merged {
            node_id,
            added: merged.added,
            duplicates: merged.duplicates,
            rejected: rejected + merged.malformed,
        }
    }

    /// Renames `node_id`. Returns `false` when the node does not exist or the session is shut
    /// down.
    pub fn rename(&self, node_id: &str, new_name: &str) -> bool {
        if self.closed.get() {
            return false;
        }
        let (_, found) = self.store.update_with(|prev| {
            let found = prev.contains(node_id);
            (prev.rename(node_id, new_name), found)
        });
        if found {
            self.relayout();
        }
        found
    }

    /// Sets or clears the response annotation of `node_id`.
    pub fn set_response(&self, node_id: &str, response: Option<String>) -> bool {
        if self.closed.get() {
            return false;
        }
        let (_, found) = self.store.update_with(|prev| {
            let found = prev.contains(node_id);
            (prev.with_response(node_id, response), found)
        });
        if found {
            self.relayout();
        }
        found
    }

    /// Aborts every in-flight request for `node_id`; returns how many were cancelled.
    pub fn cancel(&self, node_id: &str) -> usize {
        let mut table = self.in_flight.borrow_mut();
        let before = table.len();
        table.retain(|_, req| {
            if req.node_id == node_id {
                req.abort.abort();
                false
            } else {
                true
            }
        });
        before - table.len()
    }

    fn cancel_all(&self) -> usize {
        let drained: Vec<InFlight> =
            self.in_flight.borrow_mut().drain(..).map(|(_, r)| r).collect();
        for req in &drained {
            req.abort.abort();
        }
        drained.len()
    }

    /// Starts over from a single root. Outstanding requests are cancelled.
    ///
    /// Returns `false` without touching the tree once the session is shut down.
    pub fn reset(&self, root_name: &str) -> bool {
        if self.closed.get() {
            return false;
        }
        let cancelled = self.cancel_all();
        tracing::debug!(cancelled, "explorer reset");
        self.store.replace(Tree::new(root_name));
        self.relayout();
        true
    }

    /// Ends the session: cancels outstanding requests and refuses further changes.
    pub fn shutdown(&self) {
        if self.closed.replace(true) {
            return;
        }
        let cancelled = self.cancel_all();
        tracing::debug!(cancelled, "explorer shut down");
    }

    fn relayout(&self) {
        let tree = self.store.snapshot();
        let layout = layout_tree(&tree, self.viewport.get(), &self.layout_config);
        *self.layout.borrow_mut() = Arc::new(layout);
    }
}
