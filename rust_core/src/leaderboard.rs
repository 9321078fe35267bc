//! Tournament leaderboards: top players per statistical category.

use crate::identity::{looks_like_identifier, IdentityDirectory};
use crate::scoring::MatchScorer;
use crate::types::{PlayerTotals, StatRow};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Entries per category.
pub const LEADERBOARD_SIZE: usize = 10;

/// Position marker identifying goalkeepers.
pub const GOALKEEPER_ROLE: &str = "GK";

/// Statistical leaderboard categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderCategory {
    Goals,
    Assists,
    Passing,
    Defense,
    Goalkeeping,
}

impl LeaderCategory {
    pub const ALL: [LeaderCategory; 5] = [
        LeaderCategory::Goals,
        LeaderCategory::Assists,
        LeaderCategory::Passing,
        LeaderCategory::Defense,
        LeaderCategory::Goalkeeping,
    ];

    /// Defining expression over one merged stat row. Event-keyed stats go
    /// through `event_count` so rows whose counter column predates the
    /// recorder still score from their minute markers.
    fn value(&self, row: &StatRow) -> i64 {
        match self {
            LeaderCategory::Goals => row.event_count("goal") as i64,
            LeaderCategory::Assists => {
                (row.event_count("assist") + row.event_count("second_assist")) as i64
            }
            LeaderCategory::Passing => row.passes_completed as i64,
            LeaderCategory::Defense => {
                (row.event_count("tackle") + row.event_count("interception")) as i64
            }
            LeaderCategory::Goalkeeping => row.event_count("keeper_save") as i64,
        }
    }

    fn totals_value(&self, totals: &PlayerTotals) -> i64 {
        match self {
            LeaderCategory::Goals => totals.goals as i64,
            LeaderCategory::Assists => (totals.assists + totals.second_assists) as i64,
            LeaderCategory::Passing => totals.passes_completed as i64,
            LeaderCategory::Defense => (totals.tackles + totals.interceptions) as i64,
            LeaderCategory::Goalkeeping => totals.keeper_saves as i64,
        }
    }

    /// Goalkeeping only counts rows recorded in the goalkeeper role.
    fn accepts(&self, position: Option<&str>) -> bool {
        match self {
            LeaderCategory::Goalkeeping => position
                .map(|p| p.trim().to_ascii_uppercase() == GOALKEEPER_ROLE)
                .unwrap_or(false),
            _ => true,
        }
    }
}

/// One leaderboard line.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderEntry {
    pub steam_id: String,
    pub player_name: String,
    pub team_id: Option<String>,
    pub value: i64,
}

/// All leaderboards for one tournament.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Leaderboards {
    pub goals: Vec<LeaderEntry>,
    pub assists: Vec<LeaderEntry>,
    pub passing: Vec<LeaderEntry>,
    pub defense: Vec<LeaderEntry>,
    pub goalkeeping: Vec<LeaderEntry>,
    pub mvp: Vec<LeaderEntry>,
}

#[derive(Default)]
struct Accumulator {
    steam_id: String,
    recorded_name: Option<String>,
    team_id: Option<String>,
    value: i64,
}

/// Builds top-N lists from merged match rows, with a pre-aggregated totals
/// table as the fallback source for historical data gaps.
pub struct LeaderboardBuilder<'a> {
    directory: &'a IdentityDirectory,
}

impl<'a> LeaderboardBuilder<'a> {
    pub fn new(directory: &'a IdentityDirectory) -> Self {
        Self { directory }
    }

    /// Build every category. `match_rows` holds the merged rows of each
    /// non-forfeited match in the tournament.
    pub fn build_all(
        &self,
        match_rows: &[Vec<StatRow>],
        fallback: &[PlayerTotals],
        scorer: &MatchScorer<'_>,
    ) -> Leaderboards {
        Leaderboards {
            goals: self.build_category(LeaderCategory::Goals, match_rows, fallback),
            assists: self.build_category(LeaderCategory::Assists, match_rows, fallback),
            passing: self.build_category(LeaderCategory::Passing, match_rows, fallback),
            defense: self.build_category(LeaderCategory::Defense, match_rows, fallback),
            goalkeeping: self.build_category(LeaderCategory::Goalkeeping, match_rows, fallback),
            mvp: self.build_mvp(match_rows, scorer),
        }
    }

    /// Top players for one statistical category. When the match-level join
    /// yields nothing the tournament-scoped totals table is used instead.
    pub fn build_category(
        &self,
        category: LeaderCategory,
        match_rows: &[Vec<StatRow>],
        fallback: &[PlayerTotals],
    ) -> Vec<LeaderEntry> {
        let mut accs: FxHashMap<String, Accumulator> = FxHashMap::default();

        for rows in match_rows {
            for row in rows {
                if !category.accepts(row.position.as_deref()) {
                    continue;
                }
                let value = category.value(row);
                if value <= 0 {
                    continue;
                }
                self.accumulate(
                    &mut accs,
                    &row.steam_id,
                    row.player_name.as_deref(),
                    row.team_id.as_deref(),
                    value,
                );
            }
        }

        if accs.is_empty() {
            for totals in fallback {
                if !category.accepts(totals.position.as_deref()) {
                    continue;
                }
                let value = category.totals_value(totals);
                if value <= 0 {
                    continue;
                }
                self.accumulate(
                    &mut accs,
                    &totals.steam_id,
                    totals.player_name.as_deref(),
                    totals.team_id.as_deref(),
                    value,
                );
            }
        }

        self.into_entries(accs, |a, b| {
            b.value
                .cmp(&a.value)
                .then_with(|| a.player_name.cmp(&b.player_name))
        })
    }

    /// MVP appearances: re-run MVP selection per match and count awards per
    /// resolved canonical identity.
    pub fn build_mvp(
        &self,
        match_rows: &[Vec<StatRow>],
        scorer: &MatchScorer<'_>,
    ) -> Vec<LeaderEntry> {
        let mut accs: FxHashMap<String, Accumulator> = FxHashMap::default();

        for rows in match_rows {
            let Some(award) = scorer.select_mvp(rows) else {
                continue;
            };
            match &award.stats {
                Some(row) => self.accumulate(
                    &mut accs,
                    &row.steam_id,
                    row.player_name.as_deref(),
                    row.team_id.as_deref(),
                    1,
                ),
                // Un-linkable verdicts still count, keyed by verdict name.
                None => self.accumulate(&mut accs, &award.verdict.name, Some(&award.verdict.name), None, 1),
            }
        }

        self.into_entries(accs, |a, b| {
            b.value
                .cmp(&a.value)
                .then_with(|| a.player_name.cmp(&b.player_name))
        })
    }

    fn accumulate(
        &self,
        accs: &mut FxHashMap<String, Accumulator>,
        steam_id: &str,
        recorded_name: Option<&str>,
        team_id: Option<&str>,
        value: i64,
    ) {
        let key = self.directory.canonical_key(steam_id);
        let acc = accs.entry(key).or_default();
        if acc.steam_id.is_empty() {
            acc.steam_id = steam_id.to_string();
        }
        if acc.recorded_name.is_none() {
            acc.recorded_name = recorded_name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string);
        }
        if acc.team_id.is_none() {
            acc.team_id = team_id.map(str::to_string);
        }
        acc.value += value;
    }

    fn into_entries(
        &self,
        accs: FxHashMap<String, Accumulator>,
        order: impl Fn(&LeaderEntry, &LeaderEntry) -> std::cmp::Ordering,
    ) -> Vec<LeaderEntry> {
        let mut entries: Vec<LeaderEntry> = accs
            .into_values()
            .map(|acc| {
                let linked_name = self
                    .directory
                    .resolve(&acc.steam_id)
                    .and_then(|p| p.display_name.clone());
                LeaderEntry {
                    player_name: display_name(
                        linked_name.as_deref(),
                        acc.recorded_name.as_deref(),
                        &acc.steam_id,
                    ),
                    steam_id: acc.steam_id,
                    team_id: acc.team_id,
                    value: acc.value,
                }
            })
            .collect();

        entries.sort_by(order);
        entries.truncate(LEADERBOARD_SIZE);
        entries
    }
}

/// Pick a display name: linked display name first, then the recorded player
/// name, then the raw identifier. A candidate that itself parses as an
/// identifier is not free text and gets rejected.
pub fn display_name(linked: Option<&str>, recorded: Option<&str>, raw_id: &str) -> String {
    for candidate in [linked, recorded].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() && !looks_like_identifier(trimmed) {
            return trimmed.to_string();
        }
    }
    raw_id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::MvpSelector;
    use crate::types::{MvpVerdict, PlayerIdentity};

    fn row(steam_id: &str, name: &str) -> StatRow {
        StatRow {
            steam_id: steam_id.to_string(),
            player_name: Some(name.to_string()),
            team_id: Some("100".to_string()),
            ..Default::default()
        }
    }

    fn empty_directory() -> IdentityDirectory {
        IdentityDirectory::new(vec![])
    }

    #[test]
    fn test_goals_category_sums_and_sorts() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);

        let mut a1 = row("a", "Ace");
        a1.goals = 2;
        let mut a2 = row("a", "Ace");
        a2.goals = 1;
        let mut b = row("b", "Bolt");
        b.goals = 2;
        let scoreless = row("c", "Cold");

        let entries = builder.build_category(
            LeaderCategory::Goals,
            &[vec![a1, b], vec![a2, scoreless]],
            &[],
        );
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].player_name, "Ace");
        assert_eq!(entries[0].value, 3);
        assert_eq!(entries[1].player_name, "Bolt");
    }

    #[test]
    fn test_assists_include_second_assists() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);
        let mut a = row("a", "Ace");
        a.assists = 1;
        a.second_assists = 2;
        let entries = builder.build_category(LeaderCategory::Assists, &[vec![a]], &[]);
        assert_eq!(entries[0].value, 3);
    }

    #[test]
    fn test_minute_markers_back_fill_missing_counters() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);

        // Historic row: the goals column predates the recorder and reads 0,
        // but the minute markers survive.
        let mut legacy = row("a", "Ace");
        legacy.event_minutes.insert("goal".to_string(), vec![23, 67]);
        let mut modern = row("b", "Bolt");
        modern.goals = 1;

        let entries =
            builder.build_category(LeaderCategory::Goals, &[vec![legacy, modern]], &[]);
        assert_eq!(entries[0].player_name, "Ace");
        assert_eq!(entries[0].value, 2);
        assert_eq!(entries[1].value, 1);
    }

    #[test]
    fn test_goalkeeping_filters_on_role() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);
        let mut keeper = row("a", "Keeper");
        keeper.position = Some("gk".to_string());
        keeper.keeper_saves = 5;
        let mut outfield = row("b", "Sweeper");
        outfield.position = Some("CB".to_string());
        outfield.keeper_saves = 9;

        let entries =
            builder.build_category(LeaderCategory::Goalkeeping, &[vec![keeper, outfield]], &[]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player_name, "Keeper");
    }

    #[test]
    fn test_fallback_totals_used_when_join_is_empty() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);
        let totals = PlayerTotals {
            steam_id: "a".to_string(),
            player_name: Some("Ace".to_string()),
            goals: 4,
            ..Default::default()
        };
        let entries = builder.build_category(LeaderCategory::Goals, &[], &[totals]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 4);
    }

    #[test]
    fn test_fallback_ignored_when_primary_has_rows() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);
        let mut a = row("a", "Ace");
        a.goals = 1;
        let totals = PlayerTotals {
            steam_id: "b".to_string(),
            player_name: Some("Ghost".to_string()),
            goals: 99,
            ..Default::default()
        };
        let entries = builder.build_category(LeaderCategory::Goals, &[vec![a]], &[totals]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].player_name, "Ace");
    }

    #[test]
    fn test_linked_accounts_aggregate_to_one_entry() {
        let directory = IdentityDirectory::new(vec![PlayerIdentity {
            steam_id: "76561198012455341".to_string(),
            linked_ids: vec!["STEAM_0:0:11101".to_string()],
            display_name: Some("Sergio".to_string()),
            discord_id: None,
        }]);
        let builder = LeaderboardBuilder::new(&directory);

        let mut main = row("76561198012455341", "smurf one");
        main.goals = 2;
        let mut alt = row("STEAM_0:0:11101", "smurf two");
        alt.goals = 3;

        let entries = builder.build_category(LeaderCategory::Goals, &[vec![main, alt]], &[]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, 5);
        assert_eq!(entries[0].player_name, "Sergio");
    }

    struct PickFirst;
    impl MvpSelector for PickFirst {
        fn select(&self, rows: &[StatRow]) -> Option<MvpVerdict> {
            let first = rows.first()?;
            Some(MvpVerdict {
                name: first.player_name.clone().unwrap_or_default(),
                position: None,
                score: 1.0,
                key_stats: vec![],
            })
        }
    }

    #[test]
    fn test_mvp_leaderboard_counts_awards() {
        let directory = empty_directory();
        let builder = LeaderboardBuilder::new(&directory);
        let scorer = MatchScorer::new().with_selector(&PickFirst);

        let matches = vec![
            vec![row("a", "Ace"), row("b", "Bolt")],
            vec![row("a", "Ace")],
            vec![row("b", "Bolt"), row("a", "Ace")],
        ];
        let entries = builder.build_mvp(&matches, &scorer);
        assert_eq!(entries[0].player_name, "Ace");
        assert_eq!(entries[0].value, 2);
        assert_eq!(entries[1].player_name, "Bolt");
        assert_eq!(entries[1].value, 1);
    }

    #[test]
    fn test_display_name_rejects_identifier_candidates() {
        assert_eq!(
            display_name(Some("76561198012455341"), Some("Ace"), "76561198012455341"),
            "Ace"
        );
        assert_eq!(
            display_name(None, Some("123456789012345678"), "raw-id"),
            "raw-id"
        );
        assert_eq!(display_name(Some("Sergio"), Some("Ace"), "x"), "Sergio");
    }
}
