//! Dependency resolution engine: configuration-level graph traversal,
//! conflict detection and resolution, exclusion propagation, and the flat
//! and graph-shaped result models built from the resolved graph.

pub mod artifacts;
pub mod cache;
pub mod conflict;
pub mod exclusions;
pub mod graph;
pub mod repository;
pub mod resolver;
pub mod resolvers;
pub mod result;
pub mod version;
