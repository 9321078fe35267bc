//! Reconciled single-match read model.
//!
//! Raw stat rows are merged, rated and attributed to a side before anything
//! leaves this module; callers never see recorder fragments.

use crate::clients::profile::{discord_avatar_url, steam_profile_url, ProfileResolver};
use crate::db::LeagueStore;
use crate::error::{HubError, HubResult};
use crate::identity::IdentityDirectory;
use crate::leaderboard::display_name;
use crate::lineup::{LineupScope, SideClassifier};
use crate::merge::merge_stat_rows;
use crate::scoring::MatchScorer;
use crate::types::{MatchRecord, MvpVerdict, Side, StatRow, TeamEventSummary};
use futures_util::stream::{self, StreamExt};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::time::Duration;

/// Merged stat rows split by attributed side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SidePlayers {
    pub home: Vec<StatRow>,
    pub away: Vec<StatRow>,
    /// Rows no lineup or summary could place. Kept visible rather than
    /// guessed into a side.
    pub neutral: Vec<StatRow>,
}

/// Profile card for one player appearing in a match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerCard {
    pub steam_id: String,
    pub display_name: String,
    pub avatar_url: String,
    pub profile_url: Option<String>,
}

/// Per-side aggregated event summaries, surfaced alongside the stat rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamEvents {
    pub home: Option<TeamEventSummary>,
    pub away: Option<TeamEventSummary>,
}

/// A match with its reconciled player stats.
#[derive(Debug, Clone, Serialize)]
pub struct MatchView {
    #[serde(rename = "match")]
    pub record: MatchRecord,
    pub player_stats: SidePlayers,
    pub mvp: Option<MvpVerdict>,
    pub mvp_steam_id: Option<String>,
    pub team_events: TeamEvents,
}

/// Build the reconciled view for one match, looked up by internal id or
/// external match identifier.
pub async fn build_match_view(
    store: &dyn LeagueStore,
    token: &str,
    scorer: &MatchScorer<'_>,
) -> HubResult<MatchView> {
    let token = token.trim();
    if token.is_empty() {
        return Err(HubError::InvalidRequest("match token is empty".to_string()));
    }

    let record = store
        .fetch_match(token)
        .await?
        .ok_or(HubError::NotFound("match"))?;

    let mut rows = merge_stat_rows(store.fetch_stat_rows(record.id).await?);
    scorer.apply_ratings(&mut rows);

    let award = scorer.select_mvp(&rows);
    let (mvp, mvp_steam_id) = match award {
        Some(award) => {
            let steam_id = award.stats.map(|row| row.steam_id);
            (Some(award.verdict), steam_id)
        }
        None => (None, None),
    };

    let classifier = SideClassifier::new(&record, LineupScope::Full);
    let mut player_stats = SidePlayers::default();
    for row in rows {
        match classifier.classify(&row) {
            Side::Home => player_stats.home.push(row),
            Side::Away => player_stats.away.push(row),
            Side::Neutral => player_stats.neutral.push(row),
        }
    }

    let team_events = TeamEvents {
        home: record.home_summary.clone(),
        away: record.away_summary.clone(),
    };

    Ok(MatchView {
        record,
        player_stats,
        mvp,
        mvp_steam_id,
        team_events,
    })
}

/// Profile cards for every player in a merged row set, keyed by canonical
/// identity. Remote lookups run concurrently under a hard per-player
/// timeout; a failed lookup leaves the locally-derived card untouched.
pub async fn player_cards(
    resolver: &dyn ProfileResolver,
    directory: &IdentityDirectory,
    rows: &[StatRow],
) -> FxHashMap<String, PlayerCard> {
    const LOOKUP_CONCURRENCY: usize = 8;
    const LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

    let mut cards: FxHashMap<String, PlayerCard> = FxHashMap::default();
    for row in rows {
        let key = directory.canonical_key(&row.steam_id);
        cards.entry(key).or_insert_with(|| {
            let linked = directory.resolve(&row.steam_id);
            PlayerCard {
                steam_id: row.steam_id.clone(),
                display_name: display_name(
                    linked.and_then(|p| p.display_name.as_deref()),
                    row.player_name.as_deref(),
                    &row.steam_id,
                ),
                avatar_url: discord_avatar_url(linked.and_then(|p| p.discord_id.as_deref())),
                profile_url: steam_profile_url(Some(&row.steam_id)),
            }
        });
    }

    let lookups: Vec<(String, String)> = cards
        .iter()
        .map(|(key, card)| (key.clone(), card.steam_id.clone()))
        .collect();
    let mut resolved = stream::iter(lookups)
        .map(|(key, steam_id)| async move {
            let profile = tokio::time::timeout(LOOKUP_TIMEOUT, resolver.resolve(&steam_id))
                .await
                .ok()
                .flatten();
            (key, profile)
        })
        .buffer_unordered(LOOKUP_CONCURRENCY);

    while let Some((key, profile)) = resolved.next().await {
        let (Some(profile), Some(card)) = (profile, cards.get_mut(&key)) else {
            continue;
        };
        if let Some(name) = profile.display_name.filter(|n| !n.trim().is_empty()) {
            card.display_name = name;
        }
        if let Some(avatar) = profile.avatar_url.filter(|a| !a.trim().is_empty()) {
            card.avatar_url = avatar;
        }
    }
    cards
}
