//! Shared utilities for graft.
//!
//! This crate provides the cross-cutting concerns used by the other graft
//! crates: the unified error type and a few filesystem helpers.

pub mod errors;
pub mod fs;
