//! Artifact traceability graph over the current window.
//!
//! Developers, change sets, files and issues are nodes of one undirected
//! multi-kind graph. Nodes are addressed by `(kind, natural key)`; the graph is
//! mutated only through window deltas (`apply_added` / `apply_removed`).
//!
//! Nodes and edges carry an insertion sequence. A node's neighbors are
//! visited in the order their edges were created, which keeps reachability
//! reproducible across removals and renames.

pub mod reach;

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::NaiveDate;
use petgraph::stable_graph::{EdgeReference, NodeIndex, StableUnGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use tracing::debug;

use crate::types::{ChangeSet, EdgeKind, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNode {
    pub kind: NodeKind,
    /// Natural key: developer name, commit hash, file path or issue id.
    pub name: String,
    seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactEdge {
    pub kind: EdgeKind,
    /// Day of the change set that produced the edge. `None` for commit edges.
    pub date: Option<NaiveDate>,
    seq: u64,
}

#[derive(Debug, Clone)]
pub struct ArtifactGraph {
    graph: StableUnGraph<ArtifactNode, ArtifactEdge>,
    /// One key → index map per node kind.
    index: [HashMap<String, NodeIndex>; 4],
    large_change_set_limit: usize,
    num_files_in_project: usize,
    next_seq: u64,
}

const fn slot(kind: NodeKind) -> usize {
    match kind {
        NodeKind::Developer => 0,
        NodeKind::ChangeSet => 1,
        NodeKind::File => 2,
        NodeKind::Issue => 3,
    }
}

impl ArtifactGraph {
    pub fn new(large_change_set_limit: usize) -> Self {
        Self {
            graph: StableUnGraph::default(),
            index: Default::default(),
            large_change_set_limit,
            num_files_in_project: 0,
            next_seq: 0,
        }
    }

    // ── Window deltas ──────────────────────────────────────────────

    /// Insert change sets entering the window.
    ///
    /// Per change set: renames first (as one mapping), then deletions, then
    /// (unless the change set includes more files than the large-change-set
    /// limit) its nodes and edges. The project-wide file count is taken from
    /// the last change set.
    pub fn apply_added<'a, I>(&mut self, change_sets: I)
    where
        I: IntoIterator<Item = &'a ChangeSet>,
    {
        let mut newest = None;
        for cs in change_sets {
            newest = Some(cs.num_files_in_project);

            let mapping: HashMap<&str, &str> = cs.renames().collect();
            self.rename_files(&mapping);

            let deleted: Vec<&str> = cs.deleted_files().collect();
            self.remove_nodes(NodeKind::File, &deleted);

            let touched: Vec<&str> = cs.touched_files().collect();
            if touched.len() > self.large_change_set_limit {
                debug!(
                    commit = %cs.commit_hash,
                    files = touched.len(),
                    limit = self.large_change_set_limit,
                    "Skipping large change set"
                );
                continue;
            }

            let cs_node = self.ensure_node(NodeKind::ChangeSet, &cs.commit_hash);
            let dev_node = self.ensure_node(NodeKind::Developer, &cs.author);
            self.link(dev_node, cs_node, EdgeKind::Commit, None);

            for path in touched {
                let file_node = self.ensure_node(NodeKind::File, path);
                self.link(cs_node, file_node, EdgeKind::Include, Some(cs.date));
            }

            for issue in &cs.issues {
                let issue_node = self.ensure_node(NodeKind::Issue, issue);
                self.link(cs_node, issue_node, EdgeKind::Link, Some(cs.date));
            }
        }

        if let Some(count) = newest {
            self.num_files_in_project = count;
        }
    }

    /// Remove change sets leaving the window, plus whatever they leave isolated.
    pub fn apply_removed<'a, I>(&mut self, change_sets: I)
    where
        I: IntoIterator<Item = &'a ChangeSet>,
    {
        let hashes: Vec<&str> = change_sets
            .into_iter()
            .map(|cs| cs.commit_hash.as_str())
            .collect();
        self.remove_nodes(NodeKind::ChangeSet, &hashes);
    }

    // ── Mutation primitives ────────────────────────────────────────

    /// Rename File nodes, applying `mapping` (old path → new path) at once.
    ///
    /// Chains and swaps inside one mapping do not cascade: `A → B` plus
    /// `B → C` leaves two nodes. A new path that names an existing file merges
    /// the two nodes; on a shared neighbor the edge met last in graph order
    /// wins. The graph is rebuilt in node order, so every neighbor order is
    /// renumbered the same way a relabelled copy of the graph would be.
    pub fn rename_files(&mut self, mapping: &HashMap<&str, &str>) {
        if mapping.is_empty() {
            return;
        }

        let order = self.nodes_in_order();
        let mut rebuilt: StableUnGraph<ArtifactNode, ArtifactEdge> =
            StableUnGraph::with_capacity(order.len(), self.graph.edge_count());
        let mut index: [HashMap<String, NodeIndex>; 4] = Default::default();
        let mut moved: HashMap<NodeIndex, NodeIndex> = HashMap::with_capacity(order.len());

        for &old in &order {
            let node = &self.graph[old];
            let name = match node.kind {
                NodeKind::File => mapping
                    .get(node.name.as_str())
                    .map_or_else(|| node.name.clone(), |new| (*new).to_string()),
                _ => node.name.clone(),
            };
            let kind = node.kind;
            let seq = node.seq;
            let new = *index[slot(kind)]
                .entry(name)
                .or_insert_with_key(|name| {
                    rebuilt.add_node(ArtifactNode {
                        kind,
                        name: name.clone(),
                        seq,
                    })
                });
            moved.insert(old, new);
        }

        let mut seen: HashSet<NodeIndex> = HashSet::with_capacity(order.len());
        let mut next_seq = self.next_seq;
        let mut merged = 0usize;
        for &old in &order {
            for edge in self.ordered_edges(old) {
                let neighbor = other_end(edge.source(), edge.target(), old);
                if seen.contains(&neighbor) {
                    continue;
                }
                let (a, b) = (moved[&old], moved[&neighbor]);
                let weight = *edge.weight();
                match rebuilt.find_edge(a, b) {
                    Some(kept) => {
                        let kept = &mut rebuilt[kept];
                        kept.kind = weight.kind;
                        kept.date = weight.date;
                        merged += 1;
                    }
                    None => {
                        rebuilt.add_edge(
                            a,
                            b,
                            ArtifactEdge {
                                seq: next_seq,
                                ..weight
                            },
                        );
                        next_seq += 1;
                    }
                }
            }
            seen.insert(old);
        }

        debug!(
            renames = mapping.len(),
            merged_edges = merged,
            "Renamed file nodes"
        );
        self.graph = rebuilt;
        self.index = index;
        self.next_seq = next_seq;
    }

    /// Remove the named nodes of one kind, then every node left without edges.
    pub fn remove_nodes(&mut self, kind: NodeKind, names: &[&str]) {
        let mut touched: Vec<NodeIndex> = Vec::new();
        for name in names {
            let Some(idx) = self.index[slot(kind)].remove(*name) else {
                continue;
            };
            touched.extend(self.graph.neighbors(idx));
            self.graph.remove_node(idx);
        }

        let mut pruned = 0usize;
        for idx in touched {
            let isolated = self.graph.contains_node(idx)
                && self.graph.neighbors(idx).next().is_none();
            if isolated {
                if let Some(node) = self.graph.remove_node(idx) {
                    self.index[slot(node.kind)].remove(&node.name);
                    pruned += 1;
                }
            }
        }
        if pruned > 0 {
            debug!(kind = %kind, removed = names.len(), pruned, "Pruned isolated nodes");
        }
    }

    fn ensure_node(&mut self, kind: NodeKind, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index[slot(kind)].get(name) {
            return idx;
        }
        let idx = self.graph.add_node(ArtifactNode {
            kind,
            name: name.to_string(),
            seq: self.next_seq,
        });
        self.next_seq += 1;
        self.index[slot(kind)].insert(name.to_string(), idx);
        idx
    }

    /// Add an edge, or overwrite the kind and date of an existing one while
    /// keeping its place in neighbor order.
    fn link(&mut self, a: NodeIndex, b: NodeIndex, kind: EdgeKind, date: Option<NaiveDate>) {
        match self.graph.find_edge(a, b) {
            Some(idx) => {
                let edge = &mut self.graph[idx];
                edge.kind = kind;
                edge.date = date;
            }
            None => {
                self.graph.add_edge(
                    a,
                    b,
                    ArtifactEdge {
                        kind,
                        date,
                        seq: self.next_seq,
                    },
                );
                self.next_seq += 1;
            }
        }
    }

    /// Live nodes, oldest first.
    fn nodes_in_order(&self) -> Vec<NodeIndex> {
        let mut nodes: Vec<NodeIndex> = self.graph.node_indices().collect();
        nodes.sort_by_key(|&idx| self.graph[idx].seq);
        nodes
    }

    // ── Queries ────────────────────────────────────────────────────

    pub fn node(&self, kind: NodeKind, name: &str) -> Option<NodeIndex> {
        self.index[slot(kind)].get(name).copied()
    }

    pub fn contains(&self, kind: NodeKind, name: &str) -> bool {
        self.index[slot(kind)].contains_key(name)
    }

    /// Names of every node of `kind`, sorted.
    pub fn names_of_kind(&self, kind: NodeKind) -> Vec<&str> {
        let names: BTreeSet<&str> = self.index[slot(kind)].keys().map(String::as_str).collect();
        names.into_iter().collect()
    }

    pub fn developers(&self) -> Vec<&str> {
        self.names_of_kind(NodeKind::Developer)
    }

    pub fn files(&self) -> Vec<&str> {
        self.names_of_kind(NodeKind::File)
    }

    pub fn count_of_kind(&self, kind: NodeKind) -> usize {
        self.index[slot(kind)].len()
    }

    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    pub fn num_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// Project-wide file count carried by the newest applied change set.
    pub fn num_files_in_project(&self) -> usize {
        self.num_files_in_project
    }

    /// Number of edges attached to a node, if it exists.
    pub fn degree(&self, kind: NodeKind, name: &str) -> Option<usize> {
        self.node(kind, name)
            .map(|idx| self.graph.edges(idx).count())
    }

    /// Number of commit edges of a developer (0 if absent).
    pub fn commit_count(&self, developer: &str) -> usize {
        self.node(NodeKind::Developer, developer).map_or(0, |idx| {
            self.graph
                .edges(idx)
                .filter(|e| e.weight().kind == EdgeKind::Commit)
                .count()
        })
    }

    /// The edge between two named nodes, if any.
    pub fn edge_between(
        &self,
        a: (NodeKind, &str),
        b: (NodeKind, &str),
    ) -> Option<&ArtifactEdge> {
        let a = self.node(a.0, a.1)?;
        let b = self.node(b.0, b.1)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// Every edge as `(endpoint, endpoint, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&ArtifactNode, &ArtifactNode, &ArtifactEdge)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    /// Number of nodes without any edge. Always 0 between mutations.
    pub fn num_isolated_nodes(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.neighbors(idx).next().is_none())
            .count()
    }

    pub(crate) fn inner(&self) -> &StableUnGraph<ArtifactNode, ArtifactEdge> {
        &self.graph
    }

    /// Edges of `node` in creation order.
    ///
    /// petgraph lists an undirected node's edges newest first, split by the
    /// side the node was added on; sorting by sequence undoes both.
    pub(crate) fn ordered_edges(&self, node: NodeIndex) -> Vec<EdgeReference<'_, ArtifactEdge>> {
        let mut edges: Vec<_> = self.graph.edges(node).collect();
        edges.sort_by_key(|e| e.weight().seq);
        edges
    }
}

/// The endpoint of an edge that is not `from`.
pub(crate) fn other_end(source: NodeIndex, target: NodeIndex, from: NodeIndex) -> NodeIndex {
    if source == from { target } else { source }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeChange;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
    }

    fn cs(hash: &str, author: &str, d: u32, changes: Vec<CodeChange>, issues: &[&str]) -> ChangeSet {
        ChangeSet {
            commit_hash: hash.into(),
            author: author.into(),
            date: day(d),
            issues: issues.iter().map(ToString::to_string).collect(),
            code_changes: changes,
            num_files_in_project: 10,
        }
    }

    fn add(path: &str) -> CodeChange {
        CodeChange::Add { path: path.into() }
    }

    fn modify(path: &str) -> CodeChange {
        CodeChange::Modify { path: path.into() }
    }

    #[test]
    fn added_change_set_creates_all_node_kinds() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("a.java"), add("b.java")], &["I-1"]);
        graph.apply_added([&c1]);

        assert_eq!(graph.developers(), vec!["alice"]);
        assert_eq!(graph.files(), vec!["a.java", "b.java"]);
        assert!(graph.contains(NodeKind::Issue, "I-1"));
        assert_eq!(graph.num_nodes(), 5);
        assert_eq!(graph.num_edges(), 4);
        assert_eq!(graph.num_files_in_project(), 10);

        let commit = graph
            .edge_between((NodeKind::Developer, "alice"), (NodeKind::ChangeSet, "c1"))
            .unwrap();
        assert_eq!(commit.kind, EdgeKind::Commit);
        assert_eq!(commit.date, None);

        let include = graph
            .edge_between((NodeKind::ChangeSet, "c1"), (NodeKind::File, "a.java"))
            .unwrap();
        assert_eq!(include.kind, EdgeKind::Include);
        assert_eq!(include.date, Some(day(1)));

        let link = graph
            .edge_between((NodeKind::ChangeSet, "c1"), (NodeKind::Issue, "I-1"))
            .unwrap();
        assert_eq!(link.kind, EdgeKind::Link);
    }

    #[test]
    fn large_change_sets_are_skipped() {
        let mut graph = ArtifactGraph::new(2);
        let big = cs("big", "bob", 1, vec![add("a"), add("b"), add("c")], &[]);
        graph.apply_added([&big]);
        assert_eq!(graph.num_nodes(), 0);
        // The file count still follows the newest change set.
        assert_eq!(graph.num_files_in_project(), 10);
    }

    #[test]
    fn removing_change_set_prunes_isolates() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("a"), add("shared")], &["I-1"]);
        let c2 = cs("c2", "bob", 2, vec![modify("shared")], &[]);
        graph.apply_added([&c1, &c2]);

        graph.apply_removed([&c1]);
        assert!(!graph.contains(NodeKind::ChangeSet, "c1"));
        assert!(!graph.contains(NodeKind::Developer, "alice"));
        assert!(!graph.contains(NodeKind::File, "a"));
        assert!(!graph.contains(NodeKind::Issue, "I-1"));
        assert!(graph.contains(NodeKind::File, "shared"));
        assert_eq!(graph.developers(), vec!["bob"]);
        assert_eq!(graph.num_isolated_nodes(), 0);
    }

    #[test]
    fn rename_then_modify_keeps_single_node() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("A")], &[]);
        let c2 = cs(
            "c2",
            "bob",
            2,
            vec![CodeChange::Rename {
                old_path: "A".into(),
                path: "B".into(),
            }],
            &[],
        );
        let c3 = cs("c3", "carol", 3, vec![modify("B")], &[]);
        graph.apply_added([&c1, &c2, &c3]);

        assert_eq!(graph.files(), vec!["B"]);
        assert!(!graph.contains(NodeKind::File, "A"));
        assert!(graph
            .edge_between((NodeKind::ChangeSet, "c1"), (NodeKind::File, "B"))
            .is_some());
        assert!(graph
            .edge_between((NodeKind::ChangeSet, "c3"), (NodeKind::File, "B"))
            .is_some());
        // The rename-only change set includes no file.
        assert_eq!(graph.degree(NodeKind::ChangeSet, "c2"), Some(1));
    }

    #[test]
    fn rename_onto_existing_file_merges_edges() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("A")], &[]);
        let c2 = cs("c2", "bob", 2, vec![add("B")], &[]);
        graph.apply_added([&c1, &c2]);
        graph.rename_files(&HashMap::from([("A", "B")]));

        assert_eq!(graph.files(), vec!["B"]);
        assert_eq!(graph.degree(NodeKind::File, "B"), Some(2));
    }

    fn rename(old: &str, new: &str) -> CodeChange {
        CodeChange::Rename {
            old_path: old.into(),
            path: new.into(),
        }
    }

    fn neighbor_names<'g>(graph: &'g ArtifactGraph, kind: NodeKind, name: &str) -> Vec<&'g str> {
        let idx = graph.node(kind, name).unwrap();
        graph
            .ordered_edges(idx)
            .into_iter()
            .map(|e| graph.inner()[other_end(e.source(), e.target(), idx)].name.as_str())
            .collect()
    }

    #[test]
    fn chained_renames_in_one_change_set_do_not_cascade() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("A"), add("B")], &[]);
        let c2 = cs("c2", "bob", 2, vec![rename("A", "B"), rename("B", "C")], &[]);
        graph.apply_added([&c1, &c2]);

        assert_eq!(graph.files(), vec!["B", "C"]);
        assert_eq!(graph.degree(NodeKind::File, "B"), Some(1));
        assert_eq!(graph.degree(NodeKind::File, "C"), Some(1));
    }

    #[test]
    fn swapped_names_keep_their_edges() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("A")], &[]);
        let c2 = cs("c2", "bob", 2, vec![add("B")], &[]);
        let c3 = cs("c3", "carol", 3, vec![rename("A", "B"), rename("B", "A")], &[]);
        graph.apply_added([&c1, &c2, &c3]);

        assert_eq!(graph.files(), vec!["A", "B"]);
        assert!(graph
            .edge_between((NodeKind::ChangeSet, "c1"), (NodeKind::File, "B"))
            .is_some());
        assert!(graph
            .edge_between((NodeKind::ChangeSet, "c2"), (NodeKind::File, "A"))
            .is_some());
        assert_eq!(graph.num_isolated_nodes(), 0);
    }

    #[test]
    fn neighbor_order_follows_edge_creation() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("x"), add("other")], &[]);
        let c2 = cs("c2", "bob", 2, vec![modify("x")], &["I-1"]);
        graph.apply_added([&c1, &c2]);
        assert_eq!(neighbor_names(&graph, NodeKind::File, "x"), vec!["c1", "c2"]);
        assert_eq!(neighbor_names(&graph, NodeKind::ChangeSet, "c2"), vec!["bob", "x", "I-1"]);

        // Removing a neighbor leaves the rest in place.
        graph.apply_removed([&c1]);
        assert_eq!(neighbor_names(&graph, NodeKind::File, "x"), vec!["c2"]);
    }

    #[test]
    fn renames_renumber_neighbors_in_node_order() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("x"), add("other")], &[]);
        let c2 = cs("c2", "bob", 2, vec![modify("x")], &[]);
        graph.apply_added([&c1, &c2]);
        assert_eq!(neighbor_names(&graph, NodeKind::ChangeSet, "c2"), vec!["bob", "x"]);

        // x was created before c2, so the rebuilt graph links c2 to x first.
        let c3 = cs("c3", "carol", 3, vec![rename("other", "renamed")], &[]);
        graph.apply_added([&c3]);
        assert_eq!(neighbor_names(&graph, NodeKind::ChangeSet, "c2"), vec!["x", "bob"]);
        assert_eq!(neighbor_names(&graph, NodeKind::ChangeSet, "c1"), vec!["alice", "x", "renamed"]);
    }

    #[test]
    fn delete_removes_file_and_cascades() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("gone")], &[]);
        graph.apply_added([&c1]);
        let c2 = cs(
            "c2",
            "bob",
            2,
            vec![CodeChange::Delete {
                path: "gone".into(),
            }, add("kept")],
            &[],
        );
        graph.apply_added([&c2]);

        assert!(!graph.contains(NodeKind::File, "gone"));
        // c1 lost its only file but keeps its commit edge to alice.
        assert!(graph.contains(NodeKind::ChangeSet, "c1"));
        assert!(graph.contains(NodeKind::File, "kept"));
        assert_eq!(graph.num_isolated_nodes(), 0);
    }

    #[test]
    fn commit_count_counts_change_sets() {
        let mut graph = ArtifactGraph::new(50);
        let c1 = cs("c1", "alice", 1, vec![add("a")], &[]);
        let c2 = cs("c2", "alice", 2, vec![add("b")], &[]);
        let c3 = cs("c3", "bob", 2, vec![add("c")], &[]);
        graph.apply_added([&c1, &c2, &c3]);
        assert_eq!(graph.commit_count("alice"), 2);
        assert_eq!(graph.commit_count("bob"), 1);
        assert_eq!(graph.commit_count("nobody"), 0);
    }
}
