//! Developer graph weighted by the Reciprocal Sum of Reciprocal Distances (RSRD).
//!
//! Two developers are linked when a simple path of at most `PATH_CUTOFF` edges
//! joins them in the artifact graph. The edge weight is the reciprocal of the
//! summed reciprocal path lengths, 1 / Σ(1 / len), over all such paths. Many
//! short paths make two developers close.
#![allow(clippy::cast_precision_loss)]

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::stable_graph::NodeIndex as ArtifactIndex;
use petgraph::visit::EdgeRef;
use tracing::debug;

use crate::graph::ArtifactGraph;
use crate::types::NodeKind;

/// Longest path, in edges, considered between two developers.
pub const PATH_CUTOFF: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct DeveloperGraph {
    graph: UnGraph<String, f64>,
    index: HashMap<String, NodeIndex>,
}

impl DeveloperGraph {
    /// Build the developer graph of the current artifact graph.
    ///
    /// Developers are paired in name order; each unordered pair is
    /// evaluated once. Developers without any partner are left out.
    pub fn build(artifacts: &ArtifactGraph) -> Self {
        let devs: Vec<(String, ArtifactIndex)> = artifacts
            .developers()
            .into_iter()
            .filter_map(|name| {
                artifacts
                    .node(NodeKind::Developer, name)
                    .map(|idx| (name.to_string(), idx))
            })
            .collect();

        let mut out = Self::default();
        for (i, (name, source)) in devs.iter().enumerate() {
            let later = &devs[i + 1..];
            if later.is_empty() {
                break;
            }
            let targets: HashSet<ArtifactIndex> = later.iter().map(|(_, idx)| *idx).collect();
            let lengths = simple_path_lengths(artifacts, *source, &targets, PATH_CUTOFF);

            // Iterate targets in name order for a stable edge insertion order.
            for (other, idx) in later {
                let Some(found) = lengths.get(idx) else {
                    continue;
                };
                if let Some(distance) = rsrd(found) {
                    out.add_edge(name, other, distance);
                }
            }
        }

        debug!(
            developers = out.node_count(),
            edges = out.edge_count(),
            "Built developer graph"
        );
        out
    }

    fn add_edge(&mut self, a: &str, b: &str, distance: f64) {
        let a = self.ensure_node(a);
        let b = self.ensure_node(b);
        self.graph.update_edge(a, b, distance);
    }

    fn ensure_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, developer: &str) -> bool {
        self.index.contains_key(developer)
    }

    /// Developers with at least one edge, sorted.
    pub fn developers(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self.index.keys().map(String::as_str).collect();
        names.into_iter().collect()
    }

    /// Developers adjacent to `developer` (empty if absent).
    pub fn neighbors(&self, developer: &str) -> BTreeSet<&str> {
        self.index.get(developer).map_or_else(BTreeSet::new, |&idx| {
            self.graph
                .neighbors(idx)
                .map(|n| self.graph[n].as_str())
                .collect()
        })
    }

    /// RSRD between two developers, if they are linked.
    pub fn distance(&self, a: &str, b: &str) -> Option<f64> {
        let a = *self.index.get(a)?;
        let b = *self.index.get(b)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e])
    }

    /// Every edge as `(developer, developer, rsrd)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                *e.weight(),
            )
        })
    }

    /// Adjacency as a name-ordered map, for reports.
    pub fn adjacency(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        self.developers()
            .into_iter()
            .map(|dev| (dev, self.neighbors(dev)))
            .collect()
    }

    pub(crate) fn inner(&self) -> &UnGraph<String, f64> {
        &self.graph
    }
}

/// Combine path lengths into one distance: `1 / Σ(1 / len)`.
///
/// `None` when there is no path.
pub fn rsrd(path_lengths: &[usize]) -> Option<f64> {
    let inverse: f64 = path_lengths
        .iter()
        .filter(|&&len| len > 0)
        .map(|&len| 1.0 / len as f64)
        .sum();
    (inverse > 0.0).then(|| 1.0 / inverse)
}

/// Lengths of all simple paths from `source` to each member of `targets`,
/// up to `cutoff` edges. Paths may run through a target to reach another one.
fn simple_path_lengths(
    artifacts: &ArtifactGraph,
    source: ArtifactIndex,
    targets: &HashSet<ArtifactIndex>,
    cutoff: usize,
) -> HashMap<ArtifactIndex, Vec<usize>> {
    let g = artifacts.inner();
    let mut found: HashMap<ArtifactIndex, Vec<usize>> = HashMap::new();
    if cutoff == 0 {
        return found;
    }

    let mut path = vec![source];
    let mut on_path: HashSet<ArtifactIndex> = HashSet::from([source]);
    let mut stack = vec![g.neighbors(source)];

    while let Some(children) = stack.last_mut() {
        let Some(child) = children.next() else {
            stack.pop();
            if let Some(done) = path.pop() {
                on_path.remove(&done);
            }
            continue;
        };
        if on_path.contains(&child) {
            continue;
        }
        let len = path.len();
        if targets.contains(&child) {
            found.entry(child).or_default().push(len);
        }
        if len < cutoff {
            path.push(child);
            on_path.insert(child);
            stack.push(g.neighbors(child));
        }
    }

    found
}
