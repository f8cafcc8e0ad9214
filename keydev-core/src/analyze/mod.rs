//! Metrics computed over a window's artifact graph.

pub mod centrality;
pub mod developer_graph;
pub mod stats;
pub mod team_shape;
