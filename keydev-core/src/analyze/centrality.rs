//! Connector scores: weighted betweenness centrality on the developer graph.
//!
//! Brandes' algorithm with Dijkstra single-source shortest paths, since RSRD
//! weights are real-valued distances.
#![allow(clippy::cast_precision_loss)]

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use super::developer_graph::DeveloperGraph;

// ── Heap entry ─────────────────────────────────────────────────────

/// Tentative distance to `node`, reached from `pred`. Ordered as a min-heap on
/// `(distance, seq)` so that ties pop in discovery order.
#[derive(Debug, Clone, Copy)]
struct Visit {
    distance: f64,
    seq: usize,
    pred: NodeIndex,
    node: NodeIndex,
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Visit {}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

// ── Betweenness Centrality (Brandes algorithm) ─────────────────────

/// Normalized weighted betweenness of every developer in the graph.
///
/// Scores are scaled by `1 / ((n - 1)(n - 2))`; graphs of two or fewer
/// developers score 0 everywhere.
pub fn connector_scores(devs: &DeveloperGraph) -> HashMap<String, f64> {
    let graph = devs.inner();
    let cb = weighted_betweenness(graph);

    let n = graph.node_count();
    let scale = if n > 2 {
        1.0 / ((n - 1) as f64 * (n - 2) as f64)
    } else {
        1.0
    };

    graph
        .node_indices()
        .map(|idx| (graph[idx].clone(), cb[idx.index()] * scale))
        .collect()
}

/// Raw (unnormalized) Brandes betweenness, every ordered source counted.
#[allow(clippy::float_cmp)]
fn weighted_betweenness(graph: &UnGraph<String, f64>) -> Vec<f64> {
    let n = graph.node_count();
    let mut cb = vec![0.0_f64; n];

    for s in graph.node_indices() {
        let mut order: Vec<NodeIndex> = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<NodeIndex>> = vec![vec![]; n];
        let mut sigma = vec![0.0_f64; n];
        let mut settled: Vec<Option<f64>> = vec![None; n];
        let mut seen: Vec<Option<f64>> = vec![None; n];
        sigma[s.index()] = 1.0;
        seen[s.index()] = Some(0.0);

        let mut seq = 0usize;
        let mut heap = BinaryHeap::new();
        heap.push(Visit {
            distance: 0.0,
            seq,
            pred: s,
            node: s,
        });

        while let Some(Visit {
            distance,
            pred,
            node: v,
            ..
        }) = heap.pop()
        {
            if settled[v.index()].is_some() {
                continue;
            }
            if v != s {
                sigma[v.index()] += sigma[pred.index()];
            }
            order.push(v);
            settled[v.index()] = Some(distance);

            for edge in graph.edges(v) {
                let w = if edge.source() == v { edge.target() } else { edge.source() };
                let vw = distance + *edge.weight();
                let unsettled = settled[w.index()].is_none();
                match seen[w.index()] {
                    Some(best) if unsettled && vw < best => {}
                    None if unsettled => {}
                    // Exact ties are additional shortest paths.
                    Some(best) if vw == best => {
                        sigma[w.index()] += sigma[v.index()];
                        predecessors[w.index()].push(v);
                        continue;
                    }
                    _ => continue,
                }
                seen[w.index()] = Some(vw);
                seq += 1;
                heap.push(Visit {
                    distance: vw,
                    seq,
                    pred: v,
                    node: w,
                });
                sigma[w.index()] = 0.0;
                predecessors[w.index()] = vec![v];
            }
        }

        // Back-propagation of dependencies
        let mut delta = vec![0.0_f64; n];
        while let Some(w) = order.pop() {
            let w_idx = w.index();
            let coeff = (1.0 + delta[w_idx]) / sigma[w_idx];
            for &v in &predecessors[w_idx] {
                delta[v.index()] += sigma[v.index()] * coeff;
            }
            if w != s {
                cb[w_idx] += delta[w_idx];
            }
        }
    }

    cb
}

// ── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str, f64)]) -> UnGraph<String, f64> {
        let mut g = UnGraph::<String, f64>::new_undirected();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();
        for (a, b, w) in edges {
            let a = *index
                .entry((*a).to_string())
                .or_insert_with(|| g.add_node((*a).to_string()));
            let b = *index
                .entry((*b).to_string())
                .or_insert_with(|| g.add_node((*b).to_string()));
            g.add_edge(a, b, *w);
        }
        g
    }

    #[test]
    fn path_middle_carries_all_pairs() {
        // A - B - C: B lies on both ordered A/C shortest paths.
        let g = graph(&[("A", "B", 1.0), ("B", "C", 1.0)]);
        let cb = weighted_betweenness(&g);
        assert!((cb[1] - 2.0).abs() < 1e-12);
        assert!(cb[0].abs() < 1e-12);
        assert!(cb[2].abs() < 1e-12);
    }

    #[test]
    fn weights_choose_the_shortest_route() {
        // A-C direct is longer (5) than A-B-C (2), so B is a broker.
        let g = graph(&[("A", "B", 1.0), ("B", "C", 1.0), ("A", "C", 5.0)]);
        let cb = weighted_betweenness(&g);
        assert!((cb[1] - 2.0).abs() < 1e-12);

        // With a cheap direct edge, nobody brokers.
        let g = graph(&[("A", "B", 1.0), ("B", "C", 1.0), ("A", "C", 0.5)]);
        let cb = weighted_betweenness(&g);
        assert!(cb.iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn equal_paths_split_credit() {
        // Square A-B-D and A-C-D with equal weights: B and C share A/D traffic.
        let g = graph(&[
            ("A", "B", 1.0),
            ("B", "D", 1.0),
            ("A", "C", 1.0),
            ("C", "D", 1.0),
        ]);
        let cb = weighted_betweenness(&g);
        let b = g.node_indices().find(|&i| g[i] == "B").unwrap();
        let c = g.node_indices().find(|&i| g[i] == "C").unwrap();
        assert!((cb[b.index()] - 1.0).abs() < 1e-12);
        assert!((cb[c.index()] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn star_center_is_normalized_to_one() {
        let g = graph(&[("hub", "a", 1.0), ("hub", "b", 1.0), ("hub", "c", 1.0)]);
        let cb = weighted_betweenness(&g);
        let n = g.node_count();
        let scale = 1.0 / ((n - 1) as f64 * (n - 2) as f64);
        assert!((cb[0] * scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_graph_no_panic() {
        let g = UnGraph::<String, f64>::new_undirected();
        assert!(weighted_betweenness(&g).is_empty());
        assert!(connector_scores(&DeveloperGraph::default()).is_empty());
    }
}
