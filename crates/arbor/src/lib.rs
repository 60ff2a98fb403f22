#![forbid(unsafe_code)]

//! `arbor` is a headless, incremental knowledge-tree explorer.
//!
//! A session starts from a single root. Each [`Explorer::ask`] sends one question about one node
//! to an external [`ExpansionClient`], merges the returned children into the latest tree and
//! recomputes a tidy top-down layout. Rendering, transport and persistence are left to the host.
//!
//! ```
//! use arbor::{Explorer, ScriptedClient, Tree};
//!
//! let explorer = Explorer::new(ScriptedClient::demo(), Tree::new("Artificial Intelligence"));
//! let outcome = futures::executor::block_on(explorer.ask("root", "What are the types?"));
//! assert!(outcome.is_merged());
//! assert_eq!(explorer.tree().root().child_ids(), ["ml", "dl", "nlp"]);
//! assert_eq!(explorer.layout().level(1).len(), 3);
//! ```

pub use arbor_core::*;

pub mod client;
pub mod explorer;
pub mod scripted;
pub mod store;
pub mod wire;

/// Tidy tree layout (re-exported from `arbor-layout`).
pub mod layout {
    pub use arbor_layout::model::{DEFAULT_VIEWPORT_HEIGHT, DEFAULT_VIEWPORT_WIDTH};
    pub use arbor_layout::tidy::tidy_x;
    pub use arbor_layout::{
        Bounds, LayoutConfig, LayoutEdge, LayoutPoint, PositionedNode, Spacing, TreeLayout,
        Viewport, layout_tree,
    };
}

pub use client::{ExpansionClient, FnClient, from_fn};
pub use explorer::{ExpansionOutcome, ExpansionPolicy, Explorer, ExplorerOptions};
pub use layout::{LayoutConfig, TreeLayout, Viewport, layout_tree};
pub use scripted::ScriptedClient;
pub use store::TreeStore;
pub use wire::{DecodedReply, ExpansionError, ExpansionRequest, RawReply, decode_reply};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests;
