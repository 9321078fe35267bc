//! League Hub Core - match and tournament reconciliation for the league hub.
//!
//! This crate provides:
//! - Player identity canonicalization across Steam id encodings
//! - Fuzzy lineup-based side attribution for recorded stat rows
//! - Stat-row fragment merging with monotone counters
//! - Rating application and MVP derivation
//! - Tournament standings from fixtures, orphan matches and forfeits
//! - Form streaks and per-category leaderboards with a totals fallback
//! - Best-effort profile enrichment and game-server status probing

pub mod error;
pub mod identity;
pub mod leaderboard;
pub mod lineup;
pub mod merge;
pub mod scoring;
pub mod standings;
mod types;

// Boundary modules
pub mod clients;
pub mod db;
pub mod ttl_cache;
pub mod utils;
pub mod views;

pub use error::{HubError, HubResult};
pub use types::*;
