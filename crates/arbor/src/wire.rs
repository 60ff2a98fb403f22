//! Wire shapes of the expansion service and their conversion into validated candidates.
//!
//! Nothing past [`decode_reply`] sees untyped JSON: a reply is either a list of well-formed
//! [`CandidateChild`] values or an [`ExpansionError`].

use arbor_core::CandidateChild;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionRequest {
    pub node_id: String,
    pub question: String,
}

impl ExpansionRequest {
    pub fn new(node_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            question: question.into(),
        }
    }
}

/// A reply as delivered by the transport: an HTTP-like status and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub body: Value,
}

impl RawReply {
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// `{ "error": message }` with the given status.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    /// A well-formed `children` reply.
    pub fn children(candidates: &[CandidateChild]) -> Self {
        Self::ok(json!({ "type": "children", "nodes": candidates }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpansionError {
    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("expansion service returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed expansion reply: {message}")]
    Malformed { message: String },

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("node `{node_id}` is already expanding")]
    Busy { node_id: String },

    #[error("explorer has been shut down")]
    ShutDown,
}

impl ExpansionError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Validation failures: the service answered, but not with a usable reply.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ReplyBody {
    Children {
        nodes: Vec<Value>,
        #[serde(default)]
        answer: Option<Value>,
    },
}

#[derive(Deserialize)]
struct WireCandidate {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    relationship: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedReply {
    /// Well-formed candidates in reply order; duplicates are left to the merge engine.
    pub candidates: Vec<CandidateChild>,
    /// Free-text answer attached to the reply, if any.
    pub answer: Option<String>,
    /// Entries dropped for a missing, non-string or blank `id`/`name`.
    pub rejected: usize,
}

pub fn decode_reply(reply: RawReply) -> Result<DecodedReply, ExpansionError> {
    if !reply.is_success() {
        let message = reply
            .body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(ExpansionError::Status {
            status: reply.status,
            message,
        });
    }

    let body: ReplyBody =
        serde_json::from_value(reply.body).map_err(|e| ExpansionError::Malformed {
            message: e.to_string(),
        })?;
    let ReplyBody::Children { nodes, answer } = body;

    let mut out = DecodedReply {
        answer: answer.as_ref().and_then(Value::as_str).map(str::to_string),
        ..Default::default()
    };
    for entry in nodes {
        let candidate = match serde_json::from_value::<WireCandidate>(entry) {
            Ok(WireCandidate {
                id: Some(id),
                name: Some(name),
                relationship,
            }) => CandidateChild {
                id,
                name,
                relationship,
            },
            _ => {
                out.rejected += 1;
                continue;
            }
        };
        if !candidate.is_well_formed() {
            out.rejected += 1;
            continue;
        }
        out.candidates.push(candidate);
    }
    Ok(out)
}
