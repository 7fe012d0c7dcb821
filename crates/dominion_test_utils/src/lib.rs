//! # Dominion Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Race and dominion fixtures
//! - A ready-made in-memory world
//! - Repeatability harness for invasion resolution
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
