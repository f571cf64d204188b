//! # borealis-tests
//!
//! Integration tests for the Borealis mining core.
//!
//! This crate provides comprehensive testing including:
//! - Scenario tests for the mining tick with literal inputs
//! - Distribution-processor tests (gate, chain safety, dry run)
//! - Collection-cycle barrier tests
//! - Property-based tests for the ledger invariants

pub mod generators;
pub mod harness;

#[cfg(test)]
mod mining_tests;


#[cfg(test)]
mod collector_tests;


pub use generators::*;
pub use harness::*;
