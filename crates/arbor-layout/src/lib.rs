#![forbid(unsafe_code)]

//! Top-down tidy tree layout for arbor knowledge trees.
//!
//! The layout is a pure function of the tree shape, the viewport and a [`LayoutConfig`]: it
//! never looks at previous positions, so re-running it on the same inputs reproduces the same
//! coordinates.

pub mod model;
pub mod tidy;

pub use model::{
    Bounds, LayoutConfig, LayoutEdge, LayoutPoint, PositionedNode, Spacing, TreeLayout, Viewport,
};

use arbor_core::{Node, Tree};
use std::sync::Arc;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

struct Flat {
    nodes: Vec<Arc<Node>>,
    depth: Vec<usize>,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
}

/// Pre-order index arena over the tree. Index 0 is the root.
fn flatten(tree: &Tree) -> Flat {
    let mut flat = Flat {
        nodes: Vec::new(),
        depth: Vec::new(),
        parent: Vec::new(),
        children: Vec::new(),
    };
    let mut stack: Vec<(Arc<Node>, usize, Option<usize>)> =
        vec![(tree.root_arc().clone(), 0, None)];
    while let Some((node, depth, parent)) = stack.pop() {
        let idx = flat.nodes.len();
        if let Some(p) = parent {
            flat.children[p].push(idx);
        }
        for child in node.children.iter().rev() {
            stack.push((child.clone(), depth + 1, Some(idx)));
        }
        flat.nodes.push(node);
        flat.depth.push(depth);
        flat.parent.push(parent);
        flat.children.push(Vec::new());
    }
    flat
}

/// Spacing for the busiest level and the deepest branch, floored by the configured minimums.
///
/// The horizontal floor is additionally raised so that the tightest separation still clears a
/// node box.
fn spacing_for(level_counts: &[usize], viewport: Viewport, config: &LayoutConfig) -> Spacing {
    let busiest = level_counts.iter().copied().max().unwrap_or(1).max(1) as f64;
    let levels = level_counts.len().max(1) as f64;
    let tightest = config.sibling_separation.min(config.subtree_separation);
    let min_horizontal = if tightest > 0.0 {
        config.min_horizontal_spacing.max(config.node_width / tightest)
    } else {
        config.min_horizontal_spacing
    };
    Spacing {
        horizontal: min_horizontal.max(viewport.width / busiest),
        vertical: config.min_vertical_spacing.max(viewport.height / levels),
    }
}

pub fn layout_tree(tree: &Tree, viewport: Viewport, config: &LayoutConfig) -> TreeLayout {
    let viewport = viewport.or_default();
    let flat = flatten(tree);

    let max_depth = flat.depth.iter().copied().max().unwrap_or(0);
    let mut level_counts = vec![0usize; max_depth + 1];
    for &d in &flat.depth {
        level_counts[d] += 1;
    }

    let spacing = spacing_for(&level_counts, viewport, config);

    let units = tidy::tidy_x(&flat.children, |a, b| {
        if flat.parent[a] == flat.parent[b] {
            config.sibling_separation
        } else {
            config.subtree_separation
        }
    });

    let xs: Vec<f64> = units.iter().map(|u| u * spacing.horizontal).collect();
    let (min_x, max_x) = xs
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let offset = (viewport.width - (max_x - min_x)) / 2.0 - min_x;

    let nodes: Vec<PositionedNode> = flat
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| PositionedNode {
            node: node.clone(),
            id: node.id.clone(),
            name: node.name.clone(),
            relationship: node.relationship.clone(),
            parent: flat.parent[i].map(|p| flat.nodes[p].id.clone()),
            depth: flat.depth[i],
            x: xs[i] + offset,
            y: config.top_margin + flat.depth[i] as f64 * spacing.vertical,
        })
        .collect();

    let edges: Vec<LayoutEdge> = nodes
        .iter()
        .enumerate()
        .filter_map(|(i, child)| {
            let p = flat.parent[i]?;
            let parent = &nodes[p];
            Some(LayoutEdge {
                from: parent.id.clone(),
                to: child.id.clone(),
                relationship: child.relationship.clone(),
                source: parent.point(),
                target: child.point(),
            })
        })
        .collect();

    let bounds = compute_bounds(&nodes, config);

    TreeLayout {
        viewport,
        spacing,
        level_counts,
        max_depth,
        nodes,
        edges,
        bounds,
    }
}

fn compute_bounds(nodes: &[PositionedNode], config: &LayoutConfig) -> Option<Bounds> {
    let first = nodes.first()?;
    let hw = config.node_width / 2.0;
    let hh = config.node_height / 2.0;
    let mut b = Bounds {
        min_x: first.x - hw,
        min_y: first.y - hh,
        max_x: first.x + hw,
        max_y: first.y + hh,
    };
    for n in nodes.iter().skip(1) {
        b.min_x = b.min_x.min(n.x - hw);
        b.min_y = b.min_y.min(n.y - hh);
        b.max_x = b.max_x.max(n.x + hw);
        b.max_y = b.max_y.max(n.y + hh);
    }
    Some(b)
}
