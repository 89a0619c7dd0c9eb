//! Crate-level tests.
//!
//! - `integration.rs`: index construction and event reduction end to end
//! - `determinism.rs`: identical seeds give identical indexes and pulses
//! - `properties.rs`: randomized checks of the tree and reducer invariants
//! - `helpers.rs`: geometry and hit factories

mod helpers;

pub use helpers::*;
