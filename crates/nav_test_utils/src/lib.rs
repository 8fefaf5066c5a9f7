//! # Nav Test Utilities
//!
//! Shared testing utilities for the navigation crates:
//! - Determinism test harness
//! - Map, world and unit kind fixtures
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
