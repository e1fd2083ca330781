//! # tapmaker-common
//!
//! Shared types, error definitions, the per-invocation configuration
//! record, and constants used across the tap-maker workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and performs no system calls.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
