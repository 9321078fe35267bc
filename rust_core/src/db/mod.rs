//! Persistence layer: the `LeagueStore` read contract and its Postgres
//! implementation.
//!
//! Everything above this module speaks in domain types; only `store` knows
//! table and column names. The trait exists so views and services can be
//! exercised against in-memory fakes.

pub mod pool;
pub mod store;

pub use pool::{create_pool, DbPoolConfig};
pub use store::PgLeagueStore;

use crate::error::HubResult;
use crate::types::{
    Fixture, Forfeit, MatchRecord, PlayerIdentity, PlayerTotals, ScheduleEntry, StatRow,
    TeamEntry, TeamSeasonSummary, Tournament,
};
use async_trait::async_trait;
use rustc_hash::FxHashMap;

/// Read-side contract over the league database.
///
/// All methods are point-in-time reads; callers compose them concurrently
/// where it matters.
#[async_trait]
pub trait LeagueStore: Send + Sync {
    /// Look up one match by internal row id or external match identifier.
    async fn fetch_match(&self, token: &str) -> HubResult<Option<MatchRecord>>;

    /// All recorded stat rows for a match, unmerged and in insertion order.
    async fn fetch_stat_rows(&self, match_id: i64) -> HubResult<Vec<StatRow>>;

    async fn fetch_tournament(&self, tournament_id: i64) -> HubResult<Option<Tournament>>;

    async fn fetch_tournaments(&self) -> HubResult<Vec<Tournament>>;

    async fn fetch_tournament_fixtures(&self, tournament_id: i64) -> HubResult<Vec<Fixture>>;

    async fn fetch_forfeits(&self, tournament_id: i64) -> HubResult<Vec<Forfeit>>;

    /// Every match linked to the tournament, keyed by internal id. Covers
    /// both fixture-linked and orphan matches.
    async fn fetch_tournament_matches(
        &self,
        tournament_id: i64,
    ) -> HubResult<FxHashMap<i64, MatchRecord>>;

    /// Matches linked to the tournament that no fixture references.
    async fn fetch_orphan_matches(&self, tournament_id: i64) -> HubResult<Vec<MatchRecord>>;

    async fn fetch_tournament_teams(&self, tournament_id: i64) -> HubResult<Vec<TeamEntry>>;

    /// The registered-player directory used for identity resolution.
    async fn fetch_player_directory(&self) -> HubResult<Vec<PlayerIdentity>>;

    /// Pre-aggregated per-tournament totals, the leaderboard fallback source.
    async fn fetch_tournament_player_totals(
        &self,
        tournament_id: i64,
    ) -> HubResult<Vec<PlayerTotals>>;

    async fn fetch_recent_matches(&self, limit: i64) -> HubResult<Vec<MatchRecord>>;

    async fn fetch_team_summaries(&self) -> HubResult<Vec<TeamSeasonSummary>>;

    async fn fetch_upcoming_schedules(&self) -> HubResult<Vec<ScheduleEntry>>;
}
