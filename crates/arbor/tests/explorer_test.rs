use arbor::{
    ArborConfig, CandidateChild, ExpansionClient, ExpansionError, ExpansionOutcome,
    ExpansionPolicy, ExpansionRequest, Explorer, ExplorerOptions, Node, RawReply, ScriptedClient,
    Tree,
};
use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::poll_fn;
use futures::join;
use serde_json::json;
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::task::Poll;

type Reply = Result<RawReply, ExpansionError>;

/// Holds every request until the test releases it.
#[derive(Default)]
struct GatedClient {
    pending: RefCell<Vec<(ExpansionRequest, oneshot::Sender<Reply>)>>,
}

impl GatedClient {
    fn pending_nodes(&self) -> Vec<String> {
        self.pending
            .borrow()
            .iter()
            .map(|(req, _)| req.node_id.clone())
            .collect()
    }

    fn release_where(&self, pred: impl Fn(&ExpansionRequest) -> bool, reply: Reply) {
        let mut pending = self.pending.borrow_mut();
        let idx = pending
            .iter()
            .position(|(req, _)| pred(req))
            .expect("no matching request");
        let (_, tx) = pending.remove(idx);
        let _ = tx.send(reply);
    }

    fn release(&self, node_id: &str, reply: Reply) {
        self.release_where(|req| req.node_id == node_id, reply);
    }
}

impl ExpansionClient for GatedClient {
    async fn expand(&self, request: ExpansionRequest) -> Reply {
        let (tx, rx) = oneshot::channel();
        self.pending.borrow_mut().push((request, tx));
        rx.await
            .unwrap_or_else(|_| Err(ExpansionError::transport("gate dropped")))
    }
}

/// Lets the other futures of a `join!` make progress once.
fn yield_now() -> impl Future<Output = ()> {
    let mut yielded = false;
    poll_fn(move |cx| {
        if yielded {
            Poll::Ready(())
        } else {
            yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    })
}

fn children(ids: &[&str]) -> Reply {
    let candidates: Vec<CandidateChild> = ids
        .iter()
        .map(|id| CandidateChild::new(*id, id.to_uppercase()))
        .collect();
    Ok(RawReply::children(&candidates))
}

fn ml_dl_tree() -> Tree {
    Tree::from_root(
        Node::new("root", "AI")
            .with_child(Node::new("ml", "Machine Learning").with_relationship("type"))
            .with_child(Node::new("dl", "Deep Learning").with_relationship("type")),
    )
    .unwrap()
}

fn gated(tree: Tree) -> (Rc<GatedClient>, Explorer<Rc<GatedClient>>) {
    let gate = Rc::new(GatedClient::default());
    let explorer = Explorer::new(gate.clone(), tree);
    (gate, explorer)
}

#[test]
fn expansion_end_to_end() {
    let (gate, explorer) = gated(Tree::new("AI"));
    let (outcome, ()) = block_on(async {
        join!(explorer.ask("root", "what are the types?"), async {
            assert!(explorer.is_loading("root"));
            assert_eq!(gate.pending_nodes(), vec!["root"]);
            let reply = RawReply::children(&[
                CandidateChild::new("ml", "Machine Learning").with_relationship("type"),
                CandidateChild::new("dl", "Deep Learning").with_relationship("type"),
            ]);
            gate.release("root", Ok(reply));
        })
    });

    assert!(outcome.is_merged(), "{outcome:?}");
    assert!(!explorer.is_loading("root"));
    let tree = explorer.tree();
    assert_eq!(tree.root().child_ids(), vec!["ml", "dl"]);
    for child in &tree.root().children {
        assert!(child.is_leaf());
        assert_eq!(child.relationship.as_deref(), Some("type"));
    }

    let layout = explorer.layout();
    assert_eq!(layout.nodes.len(), 3);
    let root = layout.position("root").unwrap();
    let ml = layout.position("ml").unwrap();
    let dl = layout.position("dl").unwrap();
    assert!(ml.y > root.y);
    assert_eq!(ml.y, dl.y);
    assert!(ml.x < dl.x);
    assert!((root.x - (ml.x + dl.x) / 2.0).abs() < 1e-9);
}

fn concurrent_expansions(first: &str, second: &str) -> Tree {
    let (gate, explorer) = gated(ml_dl_tree());
    let (ml, dl, ()) = block_on(async {
        join!(
            explorer.ask("ml", "Tell me more"),
            explorer.ask("dl", "Tell me more"),
            async {
                assert_eq!(explorer.loading_ids(), vec!["ml", "dl"]);
                let reply = |id: &str| {
                    if id == "ml" {
                        children(&["supervised", "unsupervised"])
                    } else {
                        children(&["cnn", "rnn"])
                    }
                };

                gate.release(first, reply(first));
                yield_now().await;
                assert!(!explorer.is_loading(first));
                assert!(explorer.is_loading(second));
                assert!(!explorer.tree().find_node(first).unwrap().is_leaf());
                assert!(explorer.tree().find_node(second).unwrap().is_leaf());

                gate.release(second, reply(second));
            }
        )
    });
    assert!(ml.is_merged());
    assert!(dl.is_merged());
    assert!(explorer.loading_ids().is_empty());
    explorer.tree()
}

#[test]
fn concurrent_expansions_of_different_nodes_both_land() {
    let ml_first = concurrent_expansions("ml", "dl");
    let dl_first = concurrent_expansions("dl", "ml");
    for tree in [&ml_first, &dl_first] {
        assert_eq!(
            tree.find_node("ml").unwrap().child_ids(),
            vec!["supervised", "unsupervised"]
        );
        assert_eq!(tree.find_node("dl").unwrap().child_ids(), vec!["cnn", "rnn"]);
    }
    assert_eq!(ml_first, dl_first);
}

fn assert_failure_leaves_tree_unchanged(reply: Reply) -> ExpansionError {
    let (gate, explorer) = gated(ml_dl_tree());
    let before = explorer.tree();
    let (outcome, ()) = block_on(async {
        join!(explorer.ask("ml", "Tell me more"), async {
            gate.release("ml", reply);
        })
    });
    assert!(explorer.tree().same_snapshot(&before));
    assert_eq!(explorer.revision(), 0);
    assert!(!explorer.is_loading("ml"));
    match outcome {
        ExpansionOutcome::Failed { node_id, error } => {
            assert_eq!(node_id, "ml");
            error
        }
        other => panic!("expected a failure, got {other:?}"),
    }
}

#[test]
fn transport_failure_clears_loading() {
    let err = assert_failure_leaves_tree_unchanged(Err(ExpansionError::transport("offline")));
    assert_eq!(err, ExpansionError::transport("offline"));
}

#[test]
fn error_status_clears_loading() {
    let reply = RawReply::error(500, "Failed to process question");
    let err = assert_failure_leaves_tree_unchanged(Ok(reply));
    assert_eq!(
        err,
        ExpansionError::Status {
            status: 500,
            message: "Failed to process question".to_string(),
        }
    );
}

#[test]
fn malformed_reply_clears_loading() {
    let err = assert_failure_leaves_tree_unchanged(Ok(RawReply::ok(json!({ "nodes": "nope" }))));
    assert!(err.is_validation());
}

#[test]
fn same_node_requests_union_under_concurrent_policy() {
    let (gate, explorer) = gated(Tree::new("AI"));
    let (a, b, ()) = block_on(async {
        join!(
            explorer.ask("root", "What are the types?"),
            explorer.ask("root", "Which companies?"),
            async {
                assert_eq!(gate.pending_nodes(), vec!["root", "root"]);
                assert_eq!(explorer.loading_ids(), vec!["root"]);
                gate.release_where(|r| r.question.contains("compan"), children(&["openai", "ml"]));
                yield_now().await;
                assert!(explorer.is_loading("root"));
                gate.release_where(|r| r.question.contains("type"), children(&["ml", "dl"]));
            }
        )
    });
    assert!(a.is_merged());
    assert!(b.is_merged());
    assert!(!explorer.is_loading("root"));
    assert_eq!(explorer.tree().root().child_ids(), vec!["openai", "ml", "dl"]);
}

#[test]
fn serialize_policy_rejects_overlapping_request() {
    let (gate, explorer) = gated(Tree::new("AI"));
    let explorer = explorer.with_options(ExplorerOptions {
        policy: ExpansionPolicy::SerializePerNode,
    });
    let (a, b, ()) = block_on(async {
        join!(
            explorer.ask("root", "What are the types?"),
            explorer.ask("root", "Which companies?"),
            async {
                assert_eq!(gate.pending_nodes(), vec!["root"]);
                gate.release("root", children(&["ml"]));
            }
        )
    });
    assert!(a.is_merged());
    assert_eq!(
        b.error(),
        Some(&ExpansionError::Busy {
            node_id: "root".to_string()
        })
    );
    assert_eq!(explorer.tree().root().child_ids(), vec!["ml"]);
}

#[test]
fn cancel_drops_the_reply() {
    let (gate, explorer) = gated(ml_dl_tree());
    let (outcome, ()) = block_on(async {
        join!(explorer.ask("ml", "Tell me more"), async {
            assert_eq!(explorer.cancel("ml"), 1);
            assert!(!explorer.is_loading("ml"));
            assert_eq!(explorer.cancel("ml"), 0);
            gate.release("ml", children(&["supervised"]));
        })
    });
    assert_eq!(
        outcome,
        ExpansionOutcome::Cancelled {
            node_id: "ml".to_string()
        }
    );
    assert!(explorer.tree().find_node("ml").unwrap().is_leaf());
}

#[test]
fn reset_cancels_outstanding_requests() {
    let (gate, explorer) = gated(ml_dl_tree());
    let (outcome, ()) = block_on(async {
        join!(explorer.ask("ml", "Tell me more"), async {
            assert!(explorer.reset("Biology"));
            assert!(explorer.loading_ids().is_empty());
            gate.release("ml", children(&["supervised"]));
        })
    });
    assert!(matches!(outcome, ExpansionOutcome::Cancelled { .. }));
    let tree = explorer.tree();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.root().name, "Biology");
    assert_eq!(explorer.layout().nodes.len(), 1);
}

#[test]
fn shutdown_cancels_outstanding_requests() {
    let (gate, explorer) = gated(ml_dl_tree());
    let before = explorer.tree();
    let (outcome, ()) = block_on(async {
        join!(explorer.ask("dl", "Tell me more"), async {
            explorer.shutdown();
            gate.release("dl", children(&["cnn"]));
        })
    });
    assert!(matches!(outcome, ExpansionOutcome::Cancelled { .. }));
    assert!(explorer.tree().same_snapshot(&before));
    assert_eq!(explorer.in_flight_count(), 0);
}

#[test]
fn dropped_ask_clears_loading() {
    let (_gate, explorer) = gated(Tree::new("AI"));
    {
        let mut ask = Box::pin(explorer.ask("root", "What are the types?"));
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        assert!(ask.as_mut().poll(&mut cx).is_pending());
        assert!(explorer.is_loading("root"));
    }
    assert!(!explorer.is_loading("root"));
}

#[test]
fn reply_for_unknown_node_reports_target_missing() {
    let explorer = Explorer::new(ScriptedClient::demo(), Tree::new("AI"));
    let outcome = block_on(explorer.ask("ml", "Tell me more"));
    assert_eq!(
        outcome,
        ExpansionOutcome::TargetMissing {
            node_id: "ml".to_string()
        }
    );
    assert_eq!(explorer.revision(), 0);
}

#[test]
fn explorer_from_config() {
    let cfg = ArborConfig::from_value(json!({
        "layout": { "minHorizontalSpacing": 400, "topMargin": 10 },
        "explorer": { "policy": "serialize" }
    }));
    let explorer = Explorer::from_config(ScriptedClient::demo(), Tree::new("AI"), &cfg).unwrap();
    assert_eq!(explorer.options().policy, ExpansionPolicy::SerializePerNode);
    assert_eq!(explorer.layout().position("root").unwrap().y, 10.0);

    block_on(explorer.ask("root", "What are the types?"));
    let layout = explorer.layout();
    assert_eq!(layout.spacing.horizontal, 400.0);
}

#[test]
fn viewport_change_relayouts() {
    let explorer = Explorer::new(ScriptedClient::demo(), Tree::new("AI"));
    explorer.set_viewport(arbor::Viewport::new(600.0, 400.0));
    assert_eq!(explorer.layout().position("root").unwrap().x, 300.0);
}
