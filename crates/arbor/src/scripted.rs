//! In-memory expansion backend with canned replies.
//!
//! Replies are looked up by node id, refined by keywords in the question:
//! "type" → `<id>-types`, "compan" → `<id>-companies`, "product" → `<id>-products`.
//! Unknown keys get an empty (but valid) `children` reply.

use crate::client::ExpansionClient;
use crate::wire::{ExpansionError, ExpansionRequest, RawReply};
use arbor_core::CandidateChild;
use indexmap::IndexMap;
use serde_json::json;

#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    replies: IndexMap<String, Vec<CandidateChild>>,
    answers: IndexMap<String, String>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, key: impl Into<String>, candidates: Vec<CandidateChild>) -> Self {
        self.replies.insert(key.into(), candidates);
        self
    }

    /// Attaches a free-text `answer` to the reply stored under `key`.
    pub fn with_answer(mut self, key: impl Into<String>, answer: impl Into<String>) -> Self {
        self.answers.insert(key.into(), answer.into());
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.replies.keys().map(String::as_str)
    }

    pub fn reply_key(request: &ExpansionRequest) -> String {
        let question = request.question.to_lowercase();
        if question.contains("type") {
            format!("{}-types", request.node_id)
        } else if question.contains("compan") {
            format!("{}-companies", request.node_id)
        } else if question.contains("product") {
            format!("{}-products", request.node_id)
        } else {
            request.node_id.clone()
        }
    }

    pub fn respond(&self, request: &ExpansionRequest) -> RawReply {
        if request.node_id.trim().is_empty() || request.question.trim().is_empty() {
            return RawReply::error(400, "Node ID and question are required");
        }
        let key = Self::reply_key(request);
        let nodes = self.replies.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let mut body = json!({ "type": "children", "nodes": nodes });
        if let Some(answer) = self.answers.get(&key) {
            body["answer"] = json!(answer);
        }
        RawReply::ok(body)
    }

    /// The artificial-intelligence catalogue used by the demo CLI.
    pub fn demo() -> Self {
        let typed = |id: &str, name: &str, rel: &str| {
            CandidateChild::new(id, name).with_relationship(rel)
        };
        let plain = |id: &str, name: &str| CandidateChild::new(id, name);
        Self::new()
            .with_reply(
                "root-types",
                vec![
                    typed("ml", "Machine Learning", "type"),
                    typed("dl", "Deep Learning", "type"),
                    typed("nlp", "Natural Language Processing", "type"),
                ],
            )
            .with_reply(
                "root-companies",
                vec![
                    typed("openai", "OpenAI", "company"),
                    typed("google", "Google AI", "company"),
                    typed("anthropic", "Anthropic", "company"),
                ],
            )
            .with_reply(
                "root-products",
                vec![
                    typed("chatgpt", "ChatGPT", "product"),
                    typed("bard", "Bard", "product"),
                    typed("claude", "Claude", "product"),
                ],
            )
            .with_reply(
                "ml",
                vec![
                    plain("supervised", "Supervised Learning"),
                    plain("unsupervised", "Unsupervised Learning"),
                    plain("reinforcement", "Reinforcement Learning"),
                ],
            )
            .with_reply(
                "dl",
                vec![
                    plain("cnn", "Convolutional Neural Networks"),
                    plain("rnn", "Recurrent Neural Networks"),
                    plain("transformers", "Transformers"),
                ],
            )
            .with_reply(
                "nlp",
                vec![
                    plain("nlp_tasks", "NLP Tasks"),
                    plain("embeddings", "Word Embeddings"),
                    plain("llm", "Large Language Models"),
                ],
            )
    }
}

impl ExpansionClient for ScriptedClient {
    async fn expand(&self, request: ExpansionRequest) -> Result<RawReply, ExpansionError> {
        Ok(self.respond(&request))
    }
}
