//! Core data types for graft.
//!
//! This crate defines the values the resolution engine works on: module and
//! component identifiers, component metadata with its configurations,
//! dependencies and exclude rules, plus the `Graft.toml` manifest, the
//! global configuration and the `Graft.lock` lockfile.
//!
//! This crate is intentionally free of resolution logic.

/// Configuration used when a dependency does not name a target configuration.
pub const DEFAULT_CONFIGURATION: &str = "default";

pub mod config;
pub mod dependency;
pub mod identifier;
pub mod lockfile;
pub mod manifest;
pub mod metadata;
