//! Stat row merging.
//!
//! The recorder writes stat rows incrementally, so several partial rows for
//! the same `(player, team)` key within one match are normal. Merging
//! collapses them into one authoritative row: counters are summed, minute
//! sets unioned, the best rating kept, and the MVP flag made sticky.

use crate::identity::canonical_player_key;
use crate::types::StatRow;
use rustc_hash::FxHashMap;

/// Collapse duplicate rows sharing a `(canonical player, team)` key.
///
/// Output order is unspecified; callers sort downstream. The operation is
/// idempotent: merging an already-merged set returns the same rows.
pub fn merge_stat_rows(rows: Vec<StatRow>) -> Vec<StatRow> {
    let mut merged: FxHashMap<(String, Option<String>), StatRow> = FxHashMap::default();
    let mut order: Vec<(String, Option<String>)> = Vec::new();

    for row in rows {
        let key = (canonical_player_key(&row.steam_id), row.team_id.clone());
        match merged.get_mut(&key) {
            Some(existing) => fold_into(existing, row),
            None => {
                order.push(key.clone());
                merged.insert(key, row);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect()
}

/// Fold one duplicate into the accumulated row.
fn fold_into(acc: &mut StatRow, row: StatRow) {
    // Duplicates are incremental partial writes of the same contribution,
    // never conflicting observations: counters always sum.
    acc.goals += row.goals;
    acc.assists += row.assists;
    acc.second_assists += row.second_assists;
    acc.shots += row.shots;
    acc.passes_completed += row.passes_completed;
    acc.passes_attempted += row.passes_attempted;
    acc.keeper_saves += row.keeper_saves;
    acc.tackles += row.tackles;
    acc.interceptions += row.interceptions;
    acc.yellow_cards += row.yellow_cards;
    acc.red_cards += row.red_cards;

    for (kind, minutes) in row.event_minutes {
        let merged = acc.event_minutes.entry(kind).or_default();
        merged.extend(minutes);
        merged.sort_unstable();
        merged.dedup();
    }

    // Largest rating wins: it is the most complete partial computation.
    acc.rating = match (acc.rating, row.rating) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };

    // MVP is sticky. Among flagged duplicates the maximum score wins, so
    // the result does not depend on row order.
    if row.is_mvp {
        let replace = !acc.is_mvp
            || match (acc.mvp_score, row.mvp_score) {
                (Some(a), Some(b)) => b > a,
                (None, Some(_)) => true,
                _ => false,
            };
        if replace {
            acc.mvp_score = row.mvp_score;
            acc.mvp_key_stats = row.mvp_key_stats;
        }
        acc.is_mvp = true;
    }

    // Display-only attributes: first non-empty writer wins.
    if is_blank(&acc.player_name) && !is_blank(&row.player_name) {
        acc.player_name = row.player_name;
    }
    if is_blank(&acc.position) && !is_blank(&row.position) {
        acc.position = row.position;
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}
