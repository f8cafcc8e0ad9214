//! Distance-decayed reachability from a developer to files.
//!
//! Edges carry the day of their change set. Crossing an edge costs the inverse
//! of its recency inside the window, so yesterday's edge costs ~1 and an edge
//! from the first window day costs ~window_size. Commit edges are free.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use petgraph::stable_graph::{EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;

use super::{ArtifactEdge, ArtifactGraph, other_end};
use crate::types::NodeKind;

/// Edge cost model for one window position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecayedDistance {
    pub first_included: NaiveDate,
    pub window_size_days: u32,
}

impl DecayedDistance {
    pub fn new(first_included: NaiveDate, window_size_days: u32) -> Self {
        Self {
            first_included,
            window_size_days,
        }
    }

    /// Cost of crossing an edge dated `date`.
    ///
    /// `None` costs 0. Otherwise the cost is `window_size / day` where `day`
    /// is the 1-based offset of `date` from the first included day; dates on
    /// or before the day preceding the window cost infinity.
    #[allow(clippy::cast_precision_loss)]
    pub fn edge_cost(&self, date: Option<NaiveDate>) -> f64 {
        let Some(date) = date else {
            return 0.0;
        };
        let which_day = (date - self.first_included).num_days() + 1;
        let recency = which_day as f64 / f64::from(self.window_size_days);
        if recency <= 0.0 {
            f64::INFINITY
        } else {
            1.0 / recency
        }
    }
}

struct Frame<'a> {
    distance: f64,
    edges: std::vec::IntoIter<EdgeReference<'a, ArtifactEdge>>,
    node: NodeIndex,
}

/// Files reachable from `developer` within `distance_limit`.
///
/// Depth-first over an explicit stack. Each frame resumes its node's edges in
/// creation order, so which path first claims a shared node (and with it the
/// cost of everything behind it) is reproducible. Traversal never passes
/// through another developer, and a node is expanded at most once. Returns
/// `None` when the developer has no node in the graph.
pub fn reachable_files(
    graph: &ArtifactGraph,
    developer: &str,
    cost: &DecayedDistance,
    distance_limit: f64,
) -> Option<BTreeSet<String>> {
    let start = graph.node(NodeKind::Developer, developer)?;
    let g = graph.inner();

    let mut files = BTreeSet::new();
    let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
    let mut stack = vec![Frame {
        distance: 0.0,
        edges: graph.ordered_edges(start).into_iter(),
        node: start,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(edge) = frame.edges.next() else {
            stack.pop();
            continue;
        };
        let child = other_end(edge.source(), edge.target(), frame.node);
        if visited.contains(&child) {
            continue;
        }
        let distance = frame.distance + cost.edge_cost(edge.weight().date);
        if distance > distance_limit {
            continue;
        }
        let node = &g[child];
        match node.kind {
            NodeKind::Developer => continue,
            NodeKind::File => {
                files.insert(node.name.clone());
            }
            NodeKind::ChangeSet | NodeKind::Issue => {}
        }
        visited.insert(child);
        stack.push(Frame {
            distance,
            edges: graph.ordered_edges(child).into_iter(),
            node: child,
        });
    }

    Some(files)
}
