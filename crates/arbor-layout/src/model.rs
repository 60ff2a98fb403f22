//! Layout configuration and output types.

use arbor_core::{ArborConfig, Node};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_VIEWPORT_WIDTH: f64 = 1000.0;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 800.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_VIEWPORT_WIDTH,
            height: DEFAULT_VIEWPORT_HEIGHT,
        }
    }
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Replaces unmeasured (zero, negative or non-finite) dimensions with the defaults.
    pub fn or_default(self) -> Self {
        let usable = |v: f64| v.is_finite() && v > 0.0;
        Self {
            width: if usable(self.width) {
                self.width
            } else {
                DEFAULT_VIEWPORT_WIDTH
            },
            height: if usable(self.height) {
                self.height
            } else {
                DEFAULT_VIEWPORT_HEIGHT
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Rendered node box size; siblings are never placed closer than `node_width`.
    pub node_width: f64,
    pub node_height: f64,
    pub min_horizontal_spacing: f64,
    pub min_vertical_spacing: f64,
    pub top_margin: f64,
    /// Separation (in horizontal-spacing units) between siblings of one parent.
    pub sibling_separation: f64,
    /// Separation between adjacent nodes with different parents.
    pub subtree_separation: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 120.0,
            node_height: 60.0,
            min_horizontal_spacing: 200.0,
            min_vertical_spacing: 100.0,
            top_margin: 40.0,
            sibling_separation: 1.2,
            subtree_separation: 2.0,
        }
    }
}

impl LayoutConfig {
    /// Reads `layout.*` overrides (camelCase keys) on top of the defaults.
    pub fn from_config(config: &ArborConfig) -> arbor_core::Result<Self> {
        let mut out = Self::default();
        let fields: [(&str, &mut f64); 7] = [
            ("layout.nodeWidth", &mut out.node_width),
            ("layout.nodeHeight", &mut out.node_height),
            ("layout.minHorizontalSpacing", &mut out.min_horizontal_spacing),
            ("layout.minVerticalSpacing", &mut out.min_vertical_spacing),
            ("layout.topMargin", &mut out.top_margin),
            ("layout.siblingSeparation", &mut out.sibling_separation),
            ("layout.subtreeSeparation", &mut out.subtree_separation),
        ];
        for (path, slot) in fields {
            if let Some(v) = config.positive_f64(path)? {
                *slot = v;
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Spacing {
    pub horizontal: f64,
    pub vertical: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionedNode {
    #[serde(skip)]
    pub node: Arc<Node>,
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    pub parent: Option<String>,
    pub depth: usize,
    pub x: f64,
    pub y: f64,
}

impl PositionedNode {
    pub fn point(&self) -> LayoutPoint {
        LayoutPoint {
            x: self.x,
            y: self.y,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    pub source: LayoutPoint,
    pub target: LayoutPoint,
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeLayout {
    pub viewport: Viewport,
    pub spacing: Spacing,
    /// Node count per depth, root level first.
    pub level_counts: Vec<usize>,
    pub max_depth: usize,
    /// Nodes in pre-order.
    pub nodes: Vec<PositionedNode>,
    pub edges: Vec<LayoutEdge>,
    /// Box around every node, including the node size.
    pub bounds: Option<Bounds>,
}

impl TreeLayout {
    /// First pre-order node with `id`.
    pub fn node(&self, id: &str) -> Option<&PositionedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn position(&self, id: &str) -> Option<LayoutPoint> {
        self.node(id).map(PositionedNode::point)
    }

    /// Nodes at `depth`, left to right.
    pub fn level(&self, depth: usize) -> Vec<&PositionedNode> {
        let mut level: Vec<&PositionedNode> =
            self.nodes.iter().filter(|n| n.depth == depth).collect();
        level.sort_by(|a, b| a.x.total_cmp(&b.x));
        level
    }
}
