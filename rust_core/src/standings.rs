//! Tournament aggregation: result sourcing, standings and trailing form.
//!
//! Standings fold a single result-event stream built from three disjoint
//! sources: played fixtures (orientation-corrected against the linked
//! match), orphaned tournament matches, and forfeits (which always
//! override any linked match's literal score).

use crate::identity::text_key;
use crate::types::{
    Fixture, Forfeit, FormToken, MatchRecord, PointsScheme, TeamEntry, TournamentResult,
};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::warn;

/// Default score awarded to the non-forfeiting side.
pub const DEFAULT_FORFEIT_SCORE: i32 = 10;

/// Where a result event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Fixture,
    Orphan,
    Forfeit,
}

/// One played (or forfeited) result contributing to standings and form.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEvent {
    pub source: ResultSource,
    pub home_team_id: Option<String>,
    pub away_team_id: Option<String>,
    pub home_team_name: Option<String>,
    pub away_team_name: Option<String>,
    pub home_score: i32,
    pub away_score: i32,
    pub occurred_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Event sourcing
// ============================================================================

/// Build the unified result stream for one tournament.
///
/// Each fixture contributes at most one event: a forfeited fixture always
/// contributes the synthetic forfeit result (even when a match was also
/// recorded for it), a played fixture contributes its linked match's score
/// corrected for orientation, and an unplayed fixture contributes nothing.
/// Orphaned matches contribute their recorded score as-is.
pub fn collect_result_events(
    fixtures: &[Fixture],
    forfeits: &[Forfeit],
    linked_matches: &FxHashMap<i64, MatchRecord>,
    orphan_matches: &[MatchRecord],
    forfeit_score: i32,
) -> Vec<ResultEvent> {
    let forfeited: FxHashMap<i64, &Forfeit> =
        forfeits.iter().map(|f| (f.fixture_id, f)).collect();

    let mut events = Vec::new();

    for fixture in fixtures {
        if let Some(forfeit) = forfeited.get(&fixture.id) {
            if let Some(event) = forfeit_event(fixture, forfeit, linked_matches, forfeit_score) {
                events.push(event);
            }
            continue;
        }

        if !fixture.is_played {
            continue;
        }
        let Some(record) = fixture
            .played_match_id
            .and_then(|id| linked_matches.get(&id))
        else {
            continue;
        };

        let (mut home_score, mut away_score) = (record.home_score, record.away_score);
        if orientation_swapped(fixture, record) {
            std::mem::swap(&mut home_score, &mut away_score);
        }

        events.push(ResultEvent {
            source: ResultSource::Fixture,
            home_team_id: fixture.home_team_id.clone(),
            away_team_id: fixture.away_team_id.clone(),
            home_team_name: fixture.home_name_raw.clone(),
            away_team_name: fixture.away_name_raw.clone(),
            home_score,
            away_score,
            occurred_at: fixture.played_at.or(record.kickoff),
        });
    }

    for record in orphan_matches {
        events.push(ResultEvent {
            source: ResultSource::Orphan,
            home_team_id: record.home_team_id.clone(),
            away_team_id: record.away_team_id.clone(),
            home_team_name: Some(record.home_team_name.clone()),
            away_team_name: Some(record.away_team_name.clone()),
            home_score: record.home_score,
            away_score: record.away_score,
            occurred_at: record.kickoff,
        });
    }

    events
}

/// The linked match recorded the pairing with home/away flipped relative to
/// the fixture's declaration; its scores must be swapped before aggregating.
fn orientation_swapped(fixture: &Fixture, record: &MatchRecord) -> bool {
    match (
        &fixture.home_team_id,
        &fixture.away_team_id,
        &record.home_team_id,
        &record.away_team_id,
    ) {
        (Some(fh), Some(fa), Some(mh), Some(ma)) => fh == ma && fa == mh,
        _ => false,
    }
}

fn forfeit_event(
    fixture: &Fixture,
    forfeit: &Forfeit,
    linked_matches: &FxHashMap<i64, MatchRecord>,
    forfeit_score: i32,
) -> Option<ResultEvent> {
    let winner_is_home = if fixture.home_team_id.as_deref() == Some(&forfeit.winner_team_id) {
        true
    } else if fixture.away_team_id.as_deref() == Some(&forfeit.winner_team_id) {
        false
    } else {
        warn!(
            "forfeit winner {} matches neither side of fixture {}",
            forfeit.winner_team_id, fixture.id
        );
        return None;
    };

    let (home_score, away_score) = if winner_is_home {
        (forfeit_score, 0)
    } else {
        (0, forfeit_score)
    };

    let occurred_at = fixture.played_at.or_else(|| {
        fixture
            .played_match_id
            .and_then(|id| linked_matches.get(&id))
            .and_then(|m| m.kickoff)
    });

    Some(ResultEvent {
        source: ResultSource::Forfeit,
        home_team_id: fixture.home_team_id.clone(),
        away_team_id: fixture.away_team_id.clone(),
        home_team_name: fixture.home_name_raw.clone(),
        away_team_name: fixture.away_name_raw.clone(),
        home_score,
        away_score,
        occurred_at,
    })
}

// ============================================================================
// Team resolution
// ============================================================================

/// Known tournament teams, addressable by id or by normalized name.
#[derive(Debug, Default)]
pub struct TeamRegistry {
    by_id: FxHashMap<String, TeamEntry>,
    by_name_key: FxHashMap<String, String>,
}

impl TeamRegistry {
    pub fn new(teams: &[TeamEntry]) -> Self {
        let mut registry = Self::default();
        for team in teams {
            registry
                .by_id
                .insert(team.team_id.clone(), team.clone());
            let key = text_key(&team.team_name);
            if !key.is_empty() {
                registry.by_name_key.insert(key, team.team_id.clone());
            }
        }
        registry
    }

    pub fn entry(&self, team_id: &str) -> Option<&TeamEntry> {
        self.by_id.get(team_id)
    }

    /// Resolve one side of an event to a team id. Missing ids fall back to
    /// normalized-name matching; that path can conflate distinct teams that
    /// share a normalized name, so it is logged as a data-quality signal.
    pub fn resolve(&self, team_id: Option<&str>, team_name: Option<&str>) -> Option<String> {
        if let Some(id) = team_id {
            if !id.trim().is_empty() {
                return Some(id.trim().to_string());
            }
        }
        let name = team_name?;
        let key = text_key(name);
        if key.is_empty() {
            return None;
        }
        let resolved = self.by_name_key.get(&key)?;
        warn!("resolved team '{name}' by normalized name to id {resolved}");
        Some(resolved.clone())
    }
}

// ============================================================================
// Standings
// ============================================================================

/// Fold result events into one standings row per participating team,
/// sorted points desc, goal diff desc, goals for desc, team name asc.
pub fn aggregate_standings(
    events: &[ResultEvent],
    registry: &TeamRegistry,
    scheme: PointsScheme,
) -> Vec<TournamentResult> {
    let mut rows: FxHashMap<String, TournamentResult> = FxHashMap::default();

    for event in events {
        let home = registry.resolve(event.home_team_id.as_deref(), event.home_team_name.as_deref());
        let away = registry.resolve(event.away_team_id.as_deref(), event.away_team_name.as_deref());

        if let Some(team_id) = home {
            tally(
                &mut rows,
                registry,
                &team_id,
                event.home_team_name.as_deref(),
                event.home_score,
                event.away_score,
            );
        }
        if let Some(team_id) = away {
            tally(
                &mut rows,
                registry,
                &team_id,
                event.away_team_name.as_deref(),
                event.away_score,
                event.home_score,
            );
        }
    }

    let mut table: Vec<TournamentResult> = rows
        .into_values()
        .map(|mut row| {
            row.goal_diff = row.goals_for - row.goals_against;
            row.points = row.wins as i32 * scheme.win
                + row.draws as i32 * scheme.draw
                + row.losses as i32 * scheme.loss;
            row
        })
        .collect();

    table.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then(b.goal_diff.cmp(&a.goal_diff))
            .then(b.goals_for.cmp(&a.goals_for))
            .then(a.team_name.cmp(&b.team_name))
    });
    table
}

fn tally(
    rows: &mut FxHashMap<String, TournamentResult>,
    registry: &TeamRegistry,
    team_id: &str,
    fallback_name: Option<&str>,
    scored: i32,
    conceded: i32,
) {
    let row = rows.entry(team_id.to_string()).or_insert_with(|| {
        let (name, icon) = match registry.entry(team_id) {
            Some(entry) => (entry.team_name.clone(), entry.team_icon.clone()),
            None => (
                fallback_name
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Team {team_id}")),
                String::new(),
            ),
        };
        TournamentResult {
            team_id: team_id.to_string(),
            team_name: name,
            team_icon: icon,
            ..Default::default()
        }
    });

    row.matches_played += 1;
    row.goals_for += scored;
    row.goals_against += conceded;
    match scored.cmp(&conceded) {
        std::cmp::Ordering::Greater => row.wins += 1,
        std::cmp::Ordering::Equal => row.draws += 1,
        std::cmp::Ordering::Less => row.losses += 1,
    }
}

// ============================================================================
// Form streaks
// ============================================================================

/// Trailing W/D/L tokens per team, oldest first, capped at 5.
///
/// Events are ordered by occurrence time ascending with missing timestamps
/// sorting oldest. Sides that cannot be resolved to a team are dropped;
/// they cannot safely contribute to any streak.
pub fn form_streaks(
    events: &[ResultEvent],
    registry: &TeamRegistry,
) -> FxHashMap<String, Vec<FormToken>> {
    let mut ordered: Vec<&ResultEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.occurred_at.unwrap_or(DateTime::<Utc>::MIN_UTC));

    let mut streaks: FxHashMap<String, Vec<FormToken>> = FxHashMap::default();
    for event in ordered {
        let (home_token, away_token) = match event.home_score.cmp(&event.away_score) {
            std::cmp::Ordering::Greater => (FormToken::W, FormToken::L),
            std::cmp::Ordering::Equal => (FormToken::D, FormToken::D),
            std::cmp::Ordering::Less => (FormToken::L, FormToken::W),
        };

        if let Some(team_id) =
            registry.resolve(event.home_team_id.as_deref(), event.home_team_name.as_deref())
        {
            streaks.entry(team_id).or_default().push(home_token);
        }
        if let Some(team_id) =
            registry.resolve(event.away_team_id.as_deref(), event.away_team_name.as_deref())
        {
            streaks.entry(team_id).or_default().push(away_token);
        }
    }

    for tokens in streaks.values_mut() {
        if tokens.len() > 5 {
            tokens.drain(..tokens.len() - 5);
        }
    }
    streaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn team(id: &str, name: &str) -> TeamEntry {
        TeamEntry {
            team_id: id.to_string(),
            team_name: name.to_string(),
            team_icon: String::new(),
            captain_name: None,
        }
    }

    fn fixture(id: i64, home: &str, away: &str) -> Fixture {
        Fixture {
            id,
            tournament_id: 1,
            home_team_id: Some(home.to_string()),
            away_team_id: Some(away.to_string()),
            is_played: true,
            played_match_id: Some(id * 10),
            ..Default::default()
        }
    }

    fn linked(id: i64, home: &str, away: &str, hs: i32, aws: i32) -> (i64, MatchRecord) {
        (
            id,
            MatchRecord {
                id,
                home_team_id: Some(home.to_string()),
                away_team_id: Some(away.to_string()),
                home_score: hs,
                away_score: aws,
                ..Default::default()
            },
        )
    }

    fn at(day: u32) -> Option<DateTime<Utc>> {
        Some(Utc.with_ymd_and_hms(2024, 3, day, 20, 0, 0).unwrap())
    }

    #[test]
    fn test_swapped_orientation_is_corrected() {
        // Fixture declares A home / B away; the match recorded B home 3 : A away 1.
        let fixtures = vec![fixture(1, "A", "B")];
        let matches: FxHashMap<i64, MatchRecord> =
            [linked(10, "B", "A", 3, 1)].into_iter().collect();

        let events =
            collect_result_events(&fixtures, &[], &matches, &[], DEFAULT_FORFEIT_SCORE);
        assert_eq!(events.len(), 1);
        assert_eq!((events[0].home_score, events[0].away_score), (1, 3));
    }

    #[test]
    fn test_forfeit_overrides_linked_match_score() {
        let fixtures = vec![fixture(1, "A", "B")];
        let matches: FxHashMap<i64, MatchRecord> =
            [linked(10, "A", "B", 0, 7)].into_iter().collect();
        let forfeits = vec![Forfeit {
            fixture_id: 1,
            winner_team_id: "A".to_string(),
        }];

        let events =
            collect_result_events(&fixtures, &forfeits, &matches, &[], DEFAULT_FORFEIT_SCORE);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, ResultSource::Forfeit);
        assert_eq!((events[0].home_score, events[0].away_score), (10, 0));
    }

    #[test]
    fn test_unplayed_fixture_contributes_nothing() {
        let mut unplayed = fixture(1, "A", "B");
        unplayed.is_played = false;
        unplayed.played_match_id = None;
        let events = collect_result_events(
            &[unplayed],
            &[],
            &FxHashMap::default(),
            &[],
            DEFAULT_FORFEIT_SCORE,
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_orphan_matches_contribute_as_is() {
        let orphan = MatchRecord {
            home_team_id: Some("A".to_string()),
            away_team_id: Some("B".to_string()),
            home_team_name: "Alpha".to_string(),
            away_team_name: "Beta".to_string(),
            home_score: 2,
            away_score: 2,
            ..Default::default()
        };
        let events = collect_result_events(
            &[],
            &[],
            &FxHashMap::default(),
            &[orphan],
            DEFAULT_FORFEIT_SCORE,
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, ResultSource::Orphan);
        assert_eq!((events[0].home_score, events[0].away_score), (2, 2));
    }

    #[test]
    fn test_standings_points_and_totals() {
        // TeamX: one forfeit win (10-0) and one 1-1 draw.
        let registry = TeamRegistry::new(&[team("X", "TeamX"), team("Y", "TeamY")]);
        let events = vec![
            ResultEvent {
                source: ResultSource::Forfeit,
                home_team_id: Some("X".to_string()),
                away_team_id: Some("Y".to_string()),
                home_team_name: None,
                away_team_name: None,
                home_score: 10,
                away_score: 0,
                occurred_at: at(1),
            },
            ResultEvent {
                source: ResultSource::Fixture,
                home_team_id: Some("Y".to_string()),
                away_team_id: Some("X".to_string()),
                home_team_name: None,
                away_team_name: None,
                home_score: 1,
                away_score: 1,
                occurred_at: at(2),
            },
        ];

        let table = aggregate_standings(&events, &registry, PointsScheme::default());
        let x = table.iter().find(|r| r.team_id == "X").unwrap();
        assert_eq!(x.points, 4);
        assert_eq!(x.goal_diff, 10);
        assert_eq!((x.wins, x.draws, x.losses), (1, 1, 0));
        assert_eq!(x.matches_played, 2);

        // Every decisive event has exactly one winner and one loser.
        let wins: u32 = table.iter().map(|r| r.wins).sum();
        let losses: u32 = table.iter().map(|r| r.losses).sum();
        assert_eq!(wins, losses);

        // Points formula holds for every team under the default scheme.
        for row in &table {
            assert_eq!(row.points, (row.wins * 3 + row.draws) as i32);
        }
    }

    #[test]
    fn test_standings_sort_order() {
        let registry = TeamRegistry::new(&[
            team("A", "Zeta"),
            team("B", "Alpha"),
            team("C", "Midway"),
        ]);
        // A beats C 2-0, B beats C 2-0: A and B tie on points, goal diff and
        // goals for; team name ascending breaks the tie.
        let events = vec![
            ResultEvent {
                source: ResultSource::Fixture,
                home_team_id: Some("A".to_string()),
                away_team_id: Some("C".to_string()),
                home_team_name: None,
                away_team_name: None,
                home_score: 2,
                away_score: 0,
                occurred_at: at(1),
            },
            ResultEvent {
                source: ResultSource::Fixture,
                home_team_id: Some("B".to_string()),
                away_team_id: Some("C".to_string()),
                home_team_name: None,
                away_team_name: None,
                home_score: 2,
                away_score: 0,
                occurred_at: at(2),
            },
        ];

        let table = aggregate_standings(&events, &registry, PointsScheme::default());
        let names: Vec<&str> = table.iter().map(|r| r.team_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta", "Midway"]);
    }

    #[test]
    fn test_configurable_points_scheme() {
        let registry = TeamRegistry::new(&[team("A", "Alpha"), team("B", "Beta")]);
        let events = vec![ResultEvent {
            source: ResultSource::Fixture,
            home_team_id: Some("A".to_string()),
            away_team_id: Some("B".to_string()),
            home_team_name: None,
            away_team_name: None,
            home_score: 1,
            away_score: 0,
            occurred_at: at(1),
        }];

        let scheme = PointsScheme {
            win: 2,
            draw: 1,
            loss: 0,
        };
        let table = aggregate_standings(&events, &registry, scheme);
        assert_eq!(table[0].points, 2);
    }

    #[test]
    fn test_form_streak_order_and_cap() {
        let registry = TeamRegistry::new(&[team("A", "Alpha"), team("B", "Beta")]);
        let mut events = Vec::new();
        // Six wins for A; only the trailing five survive. An event without a
        // timestamp sorts oldest.
        for day in 1..=5 {
            events.push(ResultEvent {
                source: ResultSource::Fixture,
                home_team_id: Some("A".to_string()),
                away_team_id: Some("B".to_string()),
                home_team_name: None,
                away_team_name: None,
                home_score: 2,
                away_score: 0,
                occurred_at: at(day),
            });
        }
        events.push(ResultEvent {
            source: ResultSource::Fixture,
            home_team_id: Some("A".to_string()),
            away_team_id: Some("B".to_string()),
            home_team_name: None,
            away_team_name: None,
            home_score: 0,
            away_score: 1,
            occurred_at: None,
        });

        let streaks = form_streaks(&events, &registry);
        let a = &streaks["A"];
        assert_eq!(a.len(), 5);
        // The timestampless loss is oldest and falls off the trailing five.
        assert!(a.iter().all(|t| *t == FormToken::W));
        let b = &streaks["B"];
        assert_eq!(b.len(), 5);
        assert!(b.iter().all(|t| *t == FormToken::L));
    }

    #[test]
    fn test_form_resolves_by_name_and_drops_unresolvable() {
        let registry = TeamRegistry::new(&[team("A", "The Alphas")]);
        let events = vec![ResultEvent {
            source: ResultSource::Orphan,
            home_team_id: None,
            away_team_id: None,
            home_team_name: Some("the alphas".to_string()),
            away_team_name: Some("Unknown FC".to_string()),
            home_score: 3,
            away_score: 0,
            occurred_at: at(1),
        }];

        let streaks = form_streaks(&events, &registry);
        assert_eq!(streaks["A"], vec![FormToken::W]);
        assert_eq!(streaks.len(), 1);
    }
}
