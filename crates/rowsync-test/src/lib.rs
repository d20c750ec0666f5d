//! rowsync Test Harness - Feed simulation and property validation
//!
//! This crate provides:
//! - Seeded vendor/speaker feed generation
//! - JSON-lines rendering of generated feeds
//! - Multi-pass sync simulation with invariant checks
//! - Tracing setup for tests

pub mod logging;
pub mod generator;
pub mod simulator;

pub use logging::*;
pub use generator::*;
pub use simulator::*;
