//! Shared domain types for the reconciliation engine.
//!
//! Everything here is read-only input or derived output: rows are written
//! once per match by the external recorder and the engine never mutates
//! persisted state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Players & identity
// ============================================================================

/// A registered player with the ids the community knows them by.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerIdentity {
    /// Primary external account id (SteamID64 as text in practice).
    pub steam_id: String,
    /// Equivalent ids for the same human (merged accounts).
    #[serde(default)]
    pub linked_ids: Vec<String>,
    /// Preferred display name (Discord name when linked).
    pub display_name: Option<String>,
    /// Discord account id, when the player has linked one.
    pub discord_id: Option<String>,
}

/// Which side of a match a stat row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    Neutral,
}

// ============================================================================
// Per-match stat rows
// ============================================================================

/// One player's recorded contribution to one match for one team.
///
/// Multiple rows may exist for the same `(steam_id, team_id)` key because the
/// recorder writes incrementally. That is a standing invariant, not corrupt
/// data; rows must be merged before use (see `merge`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatRow {
    pub steam_id: String,
    /// Team (guild) identifier, when the recorder knew it.
    pub team_id: Option<String>,
    pub player_name: Option<String>,
    pub position: Option<String>,

    pub goals: u32,
    pub assists: u32,
    pub second_assists: u32,
    pub shots: u32,
    pub passes_completed: u32,
    pub passes_attempted: u32,
    pub keeper_saves: u32,
    pub tackles: u32,
    pub interceptions: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,

    /// Event kind -> ascending minute markers (e.g. "goal" -> [23, 67]).
    #[serde(default)]
    pub event_minutes: BTreeMap<String, Vec<u32>>,

    /// Rating persisted by the recorder; always wins over derived ratings.
    pub rating: Option<f64>,

    pub is_mvp: bool,
    pub mvp_score: Option<f64>,
    #[serde(default)]
    pub mvp_key_stats: Vec<String>,
}

impl StatRow {
    /// Effective event count for a kind: the explicit counter when present,
    /// otherwise the number of recorded minute markers.
    pub fn event_count(&self, kind: &str) -> u32 {
        let counter = match kind {
            "goal" => self.goals,
            "assist" => self.assists,
            "second_assist" => self.second_assists,
            "keeper_save" => self.keeper_saves,
            "tackle" => self.tackles,
            "interception" => self.interceptions,
            "yellow_card" => self.yellow_cards,
            "red_card" => self.red_cards,
            _ => 0,
        };
        if counter > 0 {
            counter
        } else {
            self.event_minutes.get(kind).map_or(0, |m| m.len() as u32)
        }
    }
}

// ============================================================================
// Matches & lineups
// ============================================================================

/// One declared lineup participant, decoded once at the boundary.
///
/// The recorder stores lineups in two JSON shapes (positional array and
/// keyed map); both decode into this struct so downstream code never
/// branches on shape again.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineupSlot {
    pub slot: Option<String>,
    pub name: Option<String>,
    /// Discord id or other community id hint.
    pub id: Option<String>,
    pub steam_id: Option<String>,
    /// False for declared participants who did not actually play.
    pub started: bool,
}

/// Higher-trust aggregated per-side event summary, redundant with stat rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamEventSummary {
    #[serde(default)]
    pub players: Vec<SummaryPlayer>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryPlayer {
    pub name: Option<String>,
    pub steam_id: Option<String>,
    #[serde(default)]
    pub goals: u32,
    #[serde(default)]
    pub assists: u32,
}

/// A completed match as recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Internal row id.
    pub id: i64,
    /// Externally-visible match identifier, when assigned.
    pub external_id: Option<String>,
    pub kickoff: Option<DateTime<Utc>>,
    pub game_type: Option<String>,

    pub home_team_id: Option<String>,
    pub away_team_id: Option<String>,
    pub home_team_name: String,
    pub away_team_name: String,
    pub home_score: i32,
    pub away_score: i32,

    #[serde(default)]
    pub home_lineup: Vec<LineupSlot>,
    #[serde(default)]
    pub away_lineup: Vec<LineupSlot>,
    pub home_summary: Option<TeamEventSummary>,
    pub away_summary: Option<TeamEventSummary>,

    pub tournament_id: Option<i64>,
    pub tournament_name: Option<String>,
}

impl MatchRecord {
    /// A mirror match declares the same team on both sides; team-id
    /// comparison cannot attribute rows there and lineup sets must be used.
    pub fn is_mirror(&self) -> bool {
        match (&self.home_team_id, &self.away_team_id) {
            (Some(h), Some(a)) => h == a,
            _ => {
                let home_key = crate::identity::text_key(&self.home_team_name);
                !home_key.is_empty()
                    && home_key == crate::identity::text_key(&self.away_team_name)
            }
        }
    }
}

// ============================================================================
// Tournaments
// ============================================================================

/// Per-tournament points table. Defaults to the classic 3/1/0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsScheme {
    pub win: i32,
    pub draw: i32,
    pub loss: i32,
}

impl Default for PointsScheme {
    fn default() -> Self {
        Self {
            win: 3,
            draw: 1,
            loss: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub format: Option<String>,
    pub status: Option<String>,
    pub num_teams: Option<i32>,
    #[serde(default)]
    pub points: PointsScheme,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A scheduled tournament pairing. May be unplayed, played (linked to a
/// match) or forfeited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixture {
    pub id: i64,
    pub tournament_id: i64,
    pub week_number: Option<i32>,
    pub week_label: Option<String>,
    pub home_team_id: Option<String>,
    pub away_team_id: Option<String>,
    pub home_name_raw: Option<String>,
    pub away_name_raw: Option<String>,
    pub is_active: bool,
    pub is_played: bool,
    pub played_match_id: Option<i64>,
    pub played_at: Option<DateTime<Utc>>,
}

/// Administrative result override: the winner is awarded the default score,
/// the forfeiting side scores zero, regardless of any linked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forfeit {
    pub fixture_id: i64,
    pub winner_team_id: String,
}

/// A team participating in a tournament (snapshot name/icon preferred).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamEntry {
    pub team_id: String,
    pub team_name: String,
    pub team_icon: String,
    pub captain_name: Option<String>,
}

/// One standings row for one team.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TournamentResult {
    pub team_id: String,
    pub team_name: String,
    pub team_icon: String,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_diff: i32,
    pub points: i32,
}

/// Trailing W/D/L token, oldest first within a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormToken {
    W,
    D,
    L,
}

impl FormToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormToken::W => "W",
            FormToken::D => "D",
            FormToken::L => "L",
        }
    }
}

/// Pre-aggregated per-player tournament totals (fallback leaderboard
/// source when the match-level join comes up empty).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerTotals {
    pub steam_id: String,
    pub player_name: Option<String>,
    pub team_id: Option<String>,
    pub position: Option<String>,
    pub matches_played: u32,
    pub goals: u32,
    pub assists: u32,
    pub second_assists: u32,
    pub passes_completed: u32,
    pub keeper_saves: u32,
    pub tackles: u32,
    pub interceptions: u32,
}

/// Season-wide team aggregate for the hub overview.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamSeasonSummary {
    pub team_id: String,
    pub team_name: String,
    pub team_icon: String,
    pub average_rating: f64,
    pub matches_played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_diff: i32,
}

/// A proposed or confirmed fixture scheduling entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: i64,
    pub tournament_id: i64,
    pub tournament_name: String,
    pub proposed_time: Option<DateTime<Utc>>,
    pub server_name: Option<String>,
    pub status: String,
    pub home_team_name: String,
    pub away_team_name: String,
}

// ============================================================================
// Scoring
// ============================================================================

/// MVP verdict, either lifted from flagged rows or produced by the
/// injected selector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MvpVerdict {
    pub name: String,
    pub position: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub key_stats: Vec<String>,
}

// ============================================================================
// Enrichment
// ============================================================================

/// Best-effort third-party profile lookup result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Live game-server probe result. `online: false` carries no other fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerStatus {
    pub online: bool,
    pub server_name: Option<String>,
    pub map_name: Option<String>,
    pub player_count: Option<u32>,
    pub max_players: Option<u32>,
    pub password_protected: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_count_prefers_counter() {
        let mut row = StatRow {
            goals: 2,
            ..Default::default()
        };
        row.event_minutes.insert("goal".to_string(), vec![12]);
        assert_eq!(row.event_count("goal"), 2);
    }

    #[test]
    fn test_event_count_falls_back_to_minutes() {
        let mut row = StatRow::default();
        row.event_minutes.insert("goal".to_string(), vec![12, 55]);
        assert_eq!(row.event_count("goal"), 2);
        assert_eq!(row.event_count("assist"), 0);
    }

    #[test]
    fn test_default_points_scheme() {
        let scheme = PointsScheme::default();
        assert_eq!((scheme.win, scheme.draw, scheme.loss), (3, 1, 0));
    }

    #[test]
    fn test_mirror_match_by_id_and_name() {
        let by_id = MatchRecord {
            home_team_id: Some("42".to_string()),
            away_team_id: Some("42".to_string()),
            ..Default::default()
        };
        assert!(by_id.is_mirror());

        let by_name = MatchRecord {
            home_team_name: "Red FC".to_string(),
            away_team_name: "RED fc".to_string(),
            ..Default::default()
        };
        assert!(by_name.is_mirror());

        let normal = MatchRecord {
            home_team_id: Some("1".to_string()),
            away_team_id: Some("2".to_string()),
            ..Default::default()
        };
        assert!(!normal.is_mirror());
    }
}
