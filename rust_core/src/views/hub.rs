//! Whole-hub snapshot payload, the unit the exporter writes to disk.

use crate::db::LeagueStore;
use crate::error::HubResult;
use crate::scoring::MatchScorer;
use crate::types::{MatchRecord, ScheduleEntry, TeamSeasonSummary};
use crate::views::tournament_view::{build_tournament_view, TournamentView};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct HubSummary {
    pub generated_at: DateTime<Utc>,
    pub match_count: usize,
    pub team_count: usize,
    pub tournament_count: usize,
    pub schedule_count: usize,
}

/// One self-contained snapshot of everything the hub front page needs.
#[derive(Debug, Clone, Serialize)]
pub struct HubPayload {
    pub summary: HubSummary,
    pub recent_matches: Vec<MatchRecord>,
    pub teams: Vec<TeamSeasonSummary>,
    pub tournaments: Vec<TournamentView>,
    pub upcoming_schedules: Vec<ScheduleEntry>,
}

/// Assemble the full hub snapshot. Tournament views are built one at a
/// time; each already fans out its own store reads internally.
pub async fn build_hub_payload(
    store: &dyn LeagueStore,
    matches_limit: i64,
    scorer: &MatchScorer<'_>,
) -> HubResult<HubPayload> {
    let (recent_matches, teams, tournaments, upcoming_schedules) = tokio::try_join!(
        store.fetch_recent_matches(matches_limit),
        store.fetch_team_summaries(),
        store.fetch_tournaments(),
        store.fetch_upcoming_schedules(),
    )?;

    let mut views = Vec::with_capacity(tournaments.len());
    for tournament in &tournaments {
        views.push(build_tournament_view(store, tournament.id, scorer).await?);
    }

    info!(
        "hub snapshot: {} matches, {} teams, {} tournaments, {} schedules",
        recent_matches.len(),
        teams.len(),
        views.len(),
        upcoming_schedules.len()
    );

    Ok(HubPayload {
        summary: HubSummary {
            generated_at: Utc::now(),
            match_count: recent_matches.len(),
            team_count: teams.len(),
            tournament_count: views.len(),
            schedule_count: upcoming_schedules.len(),
        },
        recent_matches,
        teams,
        tournaments: views,
        upcoming_schedules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Tournament;
    use crate::views::testing::MemoryStore;

    #[tokio::test]
    async fn test_empty_hub_payload() {
        let store = MemoryStore::default();
        let scorer = MatchScorer::new();
        let payload = build_hub_payload(&store, 200, &scorer).await.unwrap();
        assert_eq!(payload.summary.match_count, 0);
        assert!(payload.tournaments.is_empty());
    }

    #[tokio::test]
    async fn test_hub_payload_includes_each_tournament() {
        let mut store = MemoryStore::default();
        store.tournaments.push(Tournament {
            id: 1,
            name: "Winter League".to_string(),
            ..Default::default()
        });
        store.tournaments.push(Tournament {
            id: 2,
            name: "Summer Cup".to_string(),
            ..Default::default()
        });

        let scorer = MatchScorer::new();
        let payload = build_hub_payload(&store, 200, &scorer).await.unwrap();
        assert_eq!(payload.summary.tournament_count, 2);
        assert_eq!(payload.tournaments[0].tournament.name, "Winter League");
    }
}
