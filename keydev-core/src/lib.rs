//! Keydev core library: sliding-window artifact graph and key-developer metrics.
//!
//! The main entry point is [`engine::KnowledgeEngine`], which replays a
//! [`dataset::Dataset`] day by day and answers jack, maven and connector
//! queries for the current window. [`experiment::run_experiment`] drives a
//! full replay and collects one report per window position.

pub mod analyze;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod experiment;
pub mod graph;
pub mod progress;
pub mod types;
pub mod window;
