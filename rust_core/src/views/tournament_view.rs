//! Tournament read model: standings, form, fixtures and leaderboards
//! derived from the unified result stream.

use crate::db::LeagueStore;
use crate::error::{HubError, HubResult};
use crate::identity::IdentityDirectory;
use crate::leaderboard::{LeaderboardBuilder, Leaderboards};
use crate::merge::merge_stat_rows;
use crate::scoring::MatchScorer;
use crate::standings::{
    aggregate_standings, collect_result_events, form_streaks, TeamRegistry, DEFAULT_FORFEIT_SCORE,
};
use crate::types::{Fixture, FormToken, TeamEntry, Tournament, TournamentResult};
use futures_util::stream::{self, StreamExt, TryStreamExt};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

const STAT_FETCH_CONCURRENCY: usize = 8;

/// Everything the hub shows for one tournament.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentView {
    pub tournament: Tournament,
    pub standings: Vec<TournamentResult>,
    /// Trailing W/D/L streak per team id, oldest first, at most five.
    pub team_forms: FxHashMap<String, Vec<FormToken>>,
    pub fixtures: Vec<Fixture>,
    pub teams: Vec<TeamEntry>,
    pub leaders: Leaderboards,
}

pub async fn build_tournament_view(
    store: &dyn LeagueStore,
    tournament_id: i64,
    scorer: &MatchScorer<'_>,
) -> HubResult<TournamentView> {
    let tournament = store
        .fetch_tournament(tournament_id)
        .await?
        .ok_or(HubError::NotFound("tournament"))?;

    let (fixtures, forfeits, matches, orphans, teams, players, totals) = tokio::try_join!(
        store.fetch_tournament_fixtures(tournament_id),
        store.fetch_forfeits(tournament_id),
        store.fetch_tournament_matches(tournament_id),
        store.fetch_orphan_matches(tournament_id),
        store.fetch_tournament_teams(tournament_id),
        store.fetch_player_directory(),
        store.fetch_tournament_player_totals(tournament_id),
    )?;

    let events = collect_result_events(
        &fixtures,
        &forfeits,
        &matches,
        &orphans,
        DEFAULT_FORFEIT_SCORE,
    );
    let registry = TeamRegistry::new(&teams);
    let standings = aggregate_standings(&events, &registry, tournament.points);
    let team_forms = form_streaks(&events, &registry);

    // Leaderboards never count forfeited fixtures, even when a match was
    // recorded for them before the ruling.
    let forfeited_fixtures: FxHashSet<i64> = forfeits.iter().map(|f| f.fixture_id).collect();
    let forfeited_matches: FxHashSet<i64> = fixtures
        .iter()
        .filter(|f| forfeited_fixtures.contains(&f.id))
        .filter_map(|f| f.played_match_id)
        .collect();
    let counted: Vec<i64> = matches
        .keys()
        .copied()
        .filter(|id| !forfeited_matches.contains(id))
        .collect();

    let match_rows: Vec<Vec<_>> = stream::iter(counted)
        .map(|id| async move { store.fetch_stat_rows(id).await })
        .buffer_unordered(STAT_FETCH_CONCURRENCY)
        .try_collect::<Vec<_>>()
        .await?
        .into_iter()
        .map(|raw| {
            let mut rows = merge_stat_rows(raw);
            scorer.apply_ratings(&mut rows);
            rows
        })
        .collect();

    let directory = IdentityDirectory::new(players);
    let leaders = LeaderboardBuilder::new(&directory).build_all(&match_rows, &totals, scorer);

    Ok(TournamentView {
        tournament,
        standings,
        team_forms,
        fixtures,
        teams,
        leaders,
    })
}
