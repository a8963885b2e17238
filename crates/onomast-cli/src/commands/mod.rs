//! CLI command implementations for `onomast`.
//!
//! - [`enrich`] -- Enrich a CSV name list.
//! - [`tiers`] -- List the built-in rate presets.

pub mod enrich;
pub mod tiers;
