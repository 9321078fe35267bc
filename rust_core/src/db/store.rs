//! Postgres implementation of `LeagueStore`.
//!
//! Match recorders write lineups, event minutes and summaries as JSON blobs,
//! and historic rows predate several columns. Decoding is therefore lenient:
//! a corrupt blob logs a warning and reads as empty rather than failing the
//! whole query.

use crate::db::LeagueStore;
use crate::error::HubResult;
use crate::lineup::decode_lineup;
use crate::types::{
    Fixture, Forfeit, LineupSlot, MatchRecord, PlayerIdentity, PlayerTotals, PointsScheme,
    ScheduleEntry, StatRow, TeamEntry, TeamEventSummary, TeamSeasonSummary, Tournament,
};
use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::BTreeMap;
use tracing::warn;

/// Shared projection for match rows. Tournament linkage is optional; an
/// unlinked match reads with NULL tournament columns.
const MATCH_SELECT: &str = r#"
    SELECT ms.id,
           ms.match_id::text AS external_id,
           ms.datetime AS kickoff,
           ms.game_type,
           ms.home_guild_id::text AS home_team_id,
           ms.away_guild_id::text AS away_team_id,
           COALESCE(ms.home_team_name, '') AS home_team_name,
           COALESCE(ms.away_team_name, '') AS away_team_name,
           COALESCE(ms.home_score, 0) AS home_score,
           COALESCE(ms.away_score, 0) AS away_score,
           ms.home_lineup,
           ms.away_lineup,
           ms.home_summary,
           ms.away_summary,
           tm.tournament_id,
           t.name AS tournament_name
    FROM match_stats ms
    LEFT JOIN tournament_matches tm ON tm.match_stats_id = ms.id
    LEFT JOIN tournaments t ON t.id = tm.tournament_id
"#;

/// `LeagueStore` backed by the league Postgres database.
#[derive(Clone)]
pub struct PgLeagueStore {
    pool: PgPool,
}

impl PgLeagueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LeagueStore for PgLeagueStore {
    async fn fetch_match(&self, token: &str) -> HubResult<Option<MatchRecord>> {
        let token = token.trim();
        let internal_id: Option<i64> = token.parse().ok();
        // A match linked to several tournaments duplicates through the join;
        // pin the selected row instead of taking whichever arrives first.
        let sql = format!(
            "{MATCH_SELECT} WHERE ms.match_id::text = $1 OR ms.id = $2 \
             ORDER BY ms.datetime DESC NULLS LAST, tm.tournament_id DESC NULLS LAST LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(token)
            .bind(internal_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| map_match(&r)).transpose()
    }

    async fn fetch_stat_rows(&self, match_id: i64) -> HubResult<Vec<StatRow>> {
        let rows = sqlx::query(
            r#"
            SELECT steam_id::text AS steam_id,
                   guild_id::text AS team_id,
                   player_name,
                   position,
                   goals, assists, second_assists, shots,
                   passes_completed, passes_attempted,
                   keeper_saves, tackles, interceptions,
                   yellow_cards, red_cards,
                   event_minutes, rating,
                   COALESCE(is_mvp, FALSE) AS is_mvp,
                   mvp_score, mvp_key_stats
            FROM player_match_data
            WHERE match_stats_id = $1
            ORDER BY id
            "#,
        )
        .bind(match_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_stat_row).collect()
    }

    async fn fetch_tournament(&self, tournament_id: i64) -> HubResult<Option<Tournament>> {
        let row = sqlx::query(&format!("{TOURNAMENT_SELECT} WHERE id = $1"))
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| map_tournament(&r)).transpose()
    }

    async fn fetch_tournaments(&self) -> HubResult<Vec<Tournament>> {
        let rows = sqlx::query(&format!("{TOURNAMENT_SELECT} ORDER BY created_at DESC NULLS LAST, id DESC"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_tournament).collect()
    }

    async fn fetch_tournament_fixtures(&self, tournament_id: i64) -> HubResult<Vec<Fixture>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, week_number, week_label,
                   home_guild_id::text AS home_team_id,
                   away_guild_id::text AS away_team_id,
                   home_name_raw, away_name_raw,
                   COALESCE(is_active, TRUE) AS is_active,
                   COALESCE(is_played, FALSE) AS is_played,
                   played_match_stats_id AS played_match_id,
                   played_at
            FROM tournament_fixtures
            WHERE tournament_id = $1
            ORDER BY week_number NULLS LAST, id
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(map_fixture).collect()
    }

    async fn fetch_forfeits(&self, tournament_id: i64) -> HubResult<Vec<Forfeit>> {
        let rows = sqlx::query(
            r#"
            SELECT f.fixture_id, f.winner_guild_id::text AS winner_team_id
            FROM tournament_forfeits f
            JOIN tournament_fixtures fx ON fx.id = f.fixture_id
            WHERE fx.tournament_id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(Forfeit {
                    fixture_id: r.try_get("fixture_id")?,
                    winner_team_id: r.try_get::<Option<String>, _>("winner_team_id")?.unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn fetch_tournament_matches(
        &self,
        tournament_id: i64,
    ) -> HubResult<FxHashMap<i64, MatchRecord>> {
        let sql = format!("{MATCH_SELECT} WHERE tm.tournament_id = $1");
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;
        let mut matches = FxHashMap::default();
        for row in &rows {
            let record = map_match(row)?;
            matches.insert(record.id, record);
        }
        Ok(matches)
    }

    async fn fetch_orphan_matches(&self, tournament_id: i64) -> HubResult<Vec<MatchRecord>> {
        let sql = format!(
            "{MATCH_SELECT} \
             WHERE tm.tournament_id = $1 \
               AND NOT EXISTS (SELECT 1 FROM tournament_fixtures fx \
                               WHERE fx.played_match_stats_id = ms.id) \
             ORDER BY ms.datetime NULLS LAST, ms.id"
        );
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_match).collect()
    }

    async fn fetch_tournament_teams(&self, tournament_id: i64) -> HubResult<Vec<TeamEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT tt.guild_id::text AS team_id,
                   COALESCE(tt.team_name, it.guild_name, '') AS team_name,
                   COALESCE(tt.team_icon, it.guild_icon, '') AS team_icon,
                   it.captain_name
            FROM tournament_teams tt
            LEFT JOIN iosca_teams it ON it.guild_id = tt.guild_id
            WHERE tt.tournament_id = $1
            ORDER BY team_name
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(TeamEntry {
                    team_id: r.try_get::<Option<String>, _>("team_id")?.unwrap_or_default(),
                    team_name: r.try_get("team_name")?,
                    team_icon: r.try_get("team_icon")?,
                    captain_name: r.try_get("captain_name")?,
                })
            })
            .collect()
    }

    async fn fetch_player_directory(&self) -> HubResult<Vec<PlayerIdentity>> {
        let rows = sqlx::query(
            r#"
            SELECT steam_id::text AS steam_id,
                   alt_steam_ids,
                   discord_name AS display_name,
                   discord_id::text AS discord_id
            FROM iosca_players
            WHERE steam_id IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(PlayerIdentity {
                    steam_id: r.try_get::<Option<String>, _>("steam_id")?.unwrap_or_default(),
                    linked_ids: decode_string_list(r.try_get("alt_steam_ids")?),
                    display_name: r.try_get("display_name")?,
                    discord_id: r.try_get("discord_id")?,
                })
            })
            .collect()
    }

    async fn fetch_tournament_player_totals(
        &self,
        tournament_id: i64,
    ) -> HubResult<Vec<PlayerTotals>> {
        let rows = sqlx::query(
            r#"
            SELECT steam_id::text AS steam_id,
                   player_name,
                   team_guild_id::text AS team_id,
                   position,
                   matches_played, goals, assists, second_assists,
                   passes_completed, keeper_saves, tackles, interceptions
            FROM tournament_player_stats
            WHERE tournament_id = $1
            "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(PlayerTotals {
                    steam_id: r.try_get::<Option<String>, _>("steam_id")?.unwrap_or_default(),
                    player_name: r.try_get("player_name")?,
                    team_id: r.try_get("team_id")?,
                    position: r.try_get("position")?,
                    matches_played: counter(r, "matches_played")?,
                    goals: counter(r, "goals")?,
                    assists: counter(r, "assists")?,
                    second_assists: counter(r, "second_assists")?,
                    passes_completed: counter(r, "passes_completed")?,
                    keeper_saves: counter(r, "keeper_saves")?,
                    tackles: counter(r, "tackles")?,
                    interceptions: counter(r, "interceptions")?,
                })
            })
            .collect()
    }

    async fn fetch_recent_matches(&self, limit: i64) -> HubResult<Vec<MatchRecord>> {
        let sql = format!("{MATCH_SELECT} ORDER BY ms.datetime DESC NULLS LAST, ms.id DESC LIMIT $1");
        let rows = sqlx::query(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(map_match).collect()
    }

    async fn fetch_team_summaries(&self) -> HubResult<Vec<TeamSeasonSummary>> {
        let rows = sqlx::query(
            r#"
            WITH sides AS (
                SELECT home_guild_id AS guild_id, home_score AS gf, away_score AS ga
                FROM match_stats
                WHERE home_guild_id IS NOT NULL
                  AND home_score IS NOT NULL AND away_score IS NOT NULL
                UNION ALL
                SELECT away_guild_id, away_score, home_score
                FROM match_stats
                WHERE away_guild_id IS NOT NULL
                  AND home_score IS NOT NULL AND away_score IS NOT NULL
            )
            SELECT it.guild_id::text AS team_id,
                   COALESCE(it.guild_name, '') AS team_name,
                   COALESCE(it.guild_icon, '') AS team_icon,
                   COUNT(s.guild_id) AS matches_played,
                   COUNT(*) FILTER (WHERE s.gf > s.ga) AS wins,
                   COUNT(*) FILTER (WHERE s.gf = s.ga) AS draws,
                   COUNT(*) FILTER (WHERE s.gf < s.ga) AS losses,
                   COALESCE(SUM(s.gf), 0) AS goals_for,
                   COALESCE(SUM(s.ga), 0) AS goals_against
            FROM iosca_teams it
            LEFT JOIN sides s ON s.guild_id = it.guild_id
            GROUP BY it.guild_id, it.guild_name, it.guild_icon
            ORDER BY team_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let rating_rows = sqlx::query(
            r#"
            SELECT guild_id::text AS team_id, AVG(rating) AS average_rating
            FROM player_match_data
            WHERE rating IS NOT NULL AND guild_id IS NOT NULL
            GROUP BY guild_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        let mut ratings: FxHashMap<String, f64> = FxHashMap::default();
        for row in &rating_rows {
            if let Some(team_id) = row.try_get::<Option<String>, _>("team_id")? {
                ratings.insert(team_id, row.try_get::<Option<f64>, _>("average_rating")?.unwrap_or(0.0));
            }
        }

        rows.iter()
            .map(|r| {
                let team_id: String = r.try_get::<Option<String>, _>("team_id")?.unwrap_or_default();
                let goals_for = r.try_get::<i64, _>("goals_for")? as i32;
                let goals_against = r.try_get::<i64, _>("goals_against")? as i32;
                Ok(TeamSeasonSummary {
                    average_rating: ratings.get(&team_id).copied().unwrap_or(0.0),
                    team_name: r.try_get("team_name")?,
                    team_icon: r.try_get("team_icon")?,
                    matches_played: r.try_get::<i64, _>("matches_played")?.max(0) as u32,
                    wins: r.try_get::<i64, _>("wins")?.max(0) as u32,
                    draws: r.try_get::<i64, _>("draws")?.max(0) as u32,
                    losses: r.try_get::<i64, _>("losses")?.max(0) as u32,
                    goals_for,
                    goals_against,
                    goal_diff: goals_for - goals_against,
                    team_id,
                })
            })
            .collect()
    }

    async fn fetch_upcoming_schedules(&self) -> HubResult<Vec<ScheduleEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT s.id, s.tournament_id,
                   COALESCE(t.name, '') AS tournament_name,
                   s.proposed_time, s.server_name,
                   COALESCE(s.status, 'proposed') AS status,
                   COALESCE(fx.home_name_raw, th.guild_name, '') AS home_team_name,
                   COALESCE(fx.away_name_raw, ta.guild_name, '') AS away_team_name
            FROM tournament_schedules s
            JOIN tournaments t ON t.id = s.tournament_id
            LEFT JOIN tournament_fixtures fx ON fx.id = s.fixture_id
            LEFT JOIN iosca_teams th ON th.guild_id = fx.home_guild_id
            LEFT JOIN iosca_teams ta ON ta.guild_id = fx.away_guild_id
            WHERE s.proposed_time IS NULL OR s.proposed_time >= NOW() - INTERVAL '1 day'
            ORDER BY s.proposed_time NULLS LAST, s.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| {
                Ok(ScheduleEntry {
                    id: r.try_get("id")?,
                    tournament_id: r.try_get("tournament_id")?,
                    tournament_name: r.try_get("tournament_name")?,
                    proposed_time: r.try_get("proposed_time")?,
                    server_name: r.try_get("server_name")?,
                    status: r.try_get("status")?,
                    home_team_name: r.try_get("home_team_name")?,
                    away_team_name: r.try_get("away_team_name")?,
                })
            })
            .collect()
    }
}

const TOURNAMENT_SELECT: &str = r#"
    SELECT id, name, format, status, num_teams,
           COALESCE(points_win, 3) AS points_win,
           COALESCE(points_draw, 1) AS points_draw,
           COALESCE(points_loss, 0) AS points_loss,
           created_at, updated_at
    FROM tournaments
"#;

// ============================================================================
// Row mapping
// ============================================================================

fn map_match(row: &PgRow) -> HubResult<MatchRecord> {
    let id: i64 = row.try_get("id")?;
    Ok(MatchRecord {
        id,
        external_id: row.try_get("external_id")?,
        kickoff: row.try_get("kickoff")?,
        game_type: row.try_get("game_type")?,
        home_team_id: row.try_get("home_team_id")?,
        away_team_id: row.try_get("away_team_id")?,
        home_team_name: row.try_get("home_team_name")?,
        away_team_name: row.try_get("away_team_name")?,
        home_score: row.try_get("home_score")?,
        away_score: row.try_get("away_score")?,
        home_lineup: decode_lineup_column(row.try_get("home_lineup")?),
        away_lineup: decode_lineup_column(row.try_get("away_lineup")?),
        home_summary: decode_summary(id, "home_summary", row.try_get("home_summary")?),
        away_summary: decode_summary(id, "away_summary", row.try_get("away_summary")?),
        tournament_id: row.try_get("tournament_id")?,
        tournament_name: row.try_get("tournament_name")?,
    })
}

fn map_stat_row(row: &PgRow) -> HubResult<StatRow> {
    Ok(StatRow {
        steam_id: row.try_get::<Option<String>, _>("steam_id")?.unwrap_or_default(),
        team_id: row.try_get("team_id")?,
        player_name: row.try_get("player_name")?,
        position: row.try_get("position")?,
        goals: counter(row, "goals")?,
        assists: counter(row, "assists")?,
        second_assists: counter(row, "second_assists")?,
        shots: counter(row, "shots")?,
        passes_completed: counter(row, "passes_completed")?,
        passes_attempted: counter(row, "passes_attempted")?,
        keeper_saves: counter(row, "keeper_saves")?,
        tackles: counter(row, "tackles")?,
        interceptions: counter(row, "interceptions")?,
        yellow_cards: counter(row, "yellow_cards")?,
        red_cards: counter(row, "red_cards")?,
        event_minutes: decode_event_minutes(row.try_get("event_minutes")?),
        rating: row.try_get("rating")?,
        is_mvp: row.try_get("is_mvp")?,
        mvp_score: row.try_get("mvp_score")?,
        mvp_key_stats: decode_string_list(row.try_get("mvp_key_stats")?),
    })
}

fn map_tournament(row: &PgRow) -> HubResult<Tournament> {
    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        format: row.try_get("format")?,
        status: row.try_get("status")?,
        num_teams: row.try_get("num_teams")?,
        points: PointsScheme {
            win: row.try_get("points_win")?,
            draw: row.try_get("points_draw")?,
            loss: row.try_get("points_loss")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_fixture(row: &PgRow) -> HubResult<Fixture> {
    Ok(Fixture {
        id: row.try_get("id")?,
        tournament_id: row.try_get("tournament_id")?,
        week_number: row.try_get("week_number")?,
        week_label: row.try_get("week_label")?,
        home_team_id: row.try_get("home_team_id")?,
        away_team_id: row.try_get("away_team_id")?,
        home_name_raw: row.try_get("home_name_raw")?,
        away_name_raw: row.try_get("away_name_raw")?,
        is_active: row.try_get("is_active")?,
        is_played: row.try_get("is_played")?,
        played_match_id: row.try_get("played_match_id")?,
        played_at: row.try_get("played_at")?,
    })
}

/// Non-negative counter column, NULL reads as zero.
fn counter(row: &PgRow, column: &str) -> HubResult<u32> {
    Ok(row.try_get::<Option<i32>, _>(column)?.unwrap_or(0).max(0) as u32)
}

// ============================================================================
// Lenient JSON decoding
// ============================================================================

fn decode_lineup_column(value: Option<Value>) -> Vec<LineupSlot> {
    value.as_ref().map(decode_lineup).unwrap_or_default()
}

fn decode_summary(match_id: i64, column: &str, value: Option<Value>) -> Option<TeamEventSummary> {
    let value = value?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(summary) => Some(summary),
        Err(err) => {
            warn!("match {match_id}: discarding unreadable {column}: {err}");
            None
        }
    }
}

/// Event minutes are stored as `{"kind": [minutes...]}`. Recorders have
/// historically written minutes as floats; floor them.
fn decode_event_minutes(value: Option<Value>) -> BTreeMap<String, Vec<u32>> {
    let mut minutes = BTreeMap::new();
    let Some(Value::Object(map)) = value else {
        return minutes;
    };
    for (kind, entry) in map {
        let Value::Array(items) = entry else { continue };
        let mut marks: Vec<u32> = items
            .iter()
            .filter_map(|v| v.as_f64())
            .filter(|m| *m >= 0.0)
            .map(|m| m.floor() as u32)
            .collect();
        marks.sort_unstable();
        minutes.insert(kind, marks);
    }
    minutes
}

fn decode_string_list(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                other => other.as_i64().map(|n| n.to_string()),
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_event_minutes_floors_floats() {
        let minutes = decode_event_minutes(Some(json!({
            "goal": [23.7, 12, -4, "junk"],
            "save": "not-an-array",
        })));
        assert_eq!(minutes.get("goal"), Some(&vec![12, 23]));
        assert!(!minutes.contains_key("save"));
    }

    #[test]
    fn test_decode_event_minutes_tolerates_garbage() {
        assert!(decode_event_minutes(None).is_empty());
        assert!(decode_event_minutes(Some(json!([1, 2, 3]))).is_empty());
        assert!(decode_event_minutes(Some(json!("scrambled"))).is_empty());
    }

    #[test]
    fn test_decode_string_list() {
        assert_eq!(
            decode_string_list(Some(json!(["a", 42, null, "b"]))),
            vec!["a".to_string(), "42".to_string(), "b".to_string()]
        );
        assert!(decode_string_list(Some(json!({"k": "v"}))).is_empty());
        assert!(decode_string_list(None).is_empty());
    }

    #[test]
    fn test_decode_summary_discards_unreadable() {
        let ok = decode_summary(
            1,
            "home_summary",
            Some(json!({"players": [{"name": "Ada", "goals": 2, "assists": 0}]})),
        );
        assert_eq!(ok.unwrap().players.len(), 1);

        assert!(decode_summary(1, "home_summary", Some(json!("scrambled"))).is_none());
        assert!(decode_summary(1, "home_summary", Some(Value::Null)).is_none());
        assert!(decode_summary(1, "home_summary", None).is_none());
    }
}
