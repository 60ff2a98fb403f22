use crate::*;
use futures::executor::block_on;
use serde_json::json;

#[test]
fn routes_by_question_keyword() {
    let key = |q: &str| ScriptedClient::reply_key(&ExpansionRequest::new("root", q));
    assert_eq!(key("What are the TYPES of AI?"), "root-types");
    assert_eq!(key("Which companies build it?"), "root-companies");
    assert_eq!(key("Name some products"), "root-products");
    assert_eq!(key("Tell me more"), "root");
}

#[test]
fn demo_root_types() {
    let client = ScriptedClient::demo();
    let reply =
        block_on(client.expand(ExpansionRequest::new("root", "What are the types?"))).unwrap();
    let decoded = decode_reply(reply).unwrap();
    let ids: Vec<&str> = decoded.candidates.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["ml", "dl", "nlp"]);
    assert!(
        decoded
            .candidates
            .iter()
            .all(|c| c.relationship.as_deref() == Some("type"))
    );
}

#[test]
fn unknown_node_gets_empty_children() {
    let reply = ScriptedClient::demo().respond(&ExpansionRequest::new("quantum", "More?"));
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, json!({ "type": "children", "nodes": [] }));
}

#[test]
fn blank_input_is_a_400() {
    let client = ScriptedClient::demo();
    for req in [
        ExpansionRequest::new("", "What are the types?"),
        ExpansionRequest::new("root", "  "),
    ] {
        let reply = client.respond(&req);
        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["error"], "Node ID and question are required");
    }
}

#[test]
fn answers_ride_along() {
    let client = ScriptedClient::new()
        .with_reply("ml", vec![CandidateChild::new("svm", "Support Vector Machines")])
        .with_answer("ml", "Classic methods.");
    let reply = client.respond(&ExpansionRequest::new("ml", "More?"));
    assert_eq!(reply.body["answer"], "Classic methods.");
    assert_eq!(client.keys().collect::<Vec<_>>(), vec!["ml"]);
}
