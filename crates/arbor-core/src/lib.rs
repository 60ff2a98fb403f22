#![forbid(unsafe_code)]

//! Knowledge-tree data model + child merge engine (headless).
//!
//! Design goals:
//! - immutable-by-convention snapshots: every mutation path-copies from the root to the target
//!   and shares every untouched subtree by reference count
//! - deterministic, pure merge semantics (append-only, first occurrence wins)
//! - no I/O and no executor; orchestration lives in the `arbor` crate

pub mod config;
pub mod error;
pub mod merge;
pub mod tree;

pub use config::ArborConfig;
pub use error::{Error, Result};
pub use merge::{CandidateChild, MergeOutcome, merge_candidates};
pub use tree::{Node, PreOrder, ROOT_ID, Tree};

#[cfg(test)]
mod tests;
