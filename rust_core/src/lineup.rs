//! Lineup decoding and side attribution.
//!
//! Declared lineups arrive in two stored JSON shapes (positional arrays and
//! keyed maps). Both are decoded once at the boundary into `LineupSlot`;
//! side classification then works over identity sets built from the decoded
//! slots, falling back from numeric aliases (higher trust) to normalized
//! name keys (lower trust).

use crate::identity::{alias_set, looks_like_identifier, text_key};
use crate::types::{LineupSlot, MatchRecord, Side, StatRow, TeamEventSummary};
use rustc_hash::FxHashSet;
use serde_json::Value;
use tracing::warn;

/// Whether non-starters count as side members.
///
/// Historical-lineup endpoints want everyone who was declared; strict
/// starting-lineup semantics exclude participants marked "did not play".
/// The source data mixes both, so both modes are exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineupScope {
    Full,
    StartersOnly,
}

// ============================================================================
// Decoding
// ============================================================================

/// Decode one stored lineup blob. Corrupt blobs decode to an empty lineup
/// and are logged; they must never fail a whole response.
pub fn decode_lineup(value: &Value) -> Vec<LineupSlot> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => return Vec::new(),
        other => {
            warn!("lineup blob is not an array: {}", short_preview(other));
            return Vec::new();
        }
    };

    entries.iter().filter_map(decode_slot).collect()
}

fn decode_slot(entry: &Value) -> Option<LineupSlot> {
    match entry {
        Value::Array(fields) => decode_positional(fields),
        Value::Object(_) => decode_keyed(entry),
        other => {
            warn!("unrecognized lineup entry shape: {}", short_preview(other));
            None
        }
    }
}

/// Positional shape: `[slot, name_or_id, id, started_flag?]`.
fn decode_positional(fields: &[Value]) -> Option<LineupSlot> {
    let mut slot = LineupSlot {
        started: true,
        ..Default::default()
    };
    slot.slot = fields.first().and_then(value_to_string);

    if let Some(name_or_id) = fields.get(1).and_then(value_to_string) {
        if looks_like_identifier(&name_or_id) {
            slot.steam_id = Some(name_or_id);
        } else {
            slot.name = Some(name_or_id);
        }
    }
    if let Some(id) = fields.get(2).and_then(value_to_string) {
        if slot.steam_id.is_none() && looks_like_identifier(&id) {
            slot.steam_id = Some(id.clone());
        }
        slot.id = Some(id);
    }
    if let Some(started) = fields.get(3).and_then(Value::as_bool) {
        slot.started = started;
    }

    (slot.name.is_some() || slot.steam_id.is_some() || slot.id.is_some()).then_some(slot)
}

/// Keyed shape with named fields.
fn decode_keyed(entry: &Value) -> Option<LineupSlot> {
    let slot = LineupSlot {
        slot: entry
            .get("slot")
            .or_else(|| entry.get("position"))
            .and_then(value_to_string),
        name: entry
            .get("name")
            .or_else(|| entry.get("player_name"))
            .and_then(value_to_string),
        id: entry
            .get("id")
            .or_else(|| entry.get("discord_id"))
            .and_then(value_to_string),
        steam_id: entry.get("steam_id").and_then(value_to_string),
        started: entry
            .get("started")
            .and_then(Value::as_bool)
            .unwrap_or_else(|| {
                // Some recorders store the negated flag instead.
                !entry
                    .get("did_not_play")
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            }),
    };

    (slot.name.is_some() || slot.steam_id.is_some() || slot.id.is_some()).then_some(slot)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn short_preview(value: &Value) -> String {
    let mut text = value.to_string();
    if text.len() > 80 {
        text.truncate(80);
        text.push('…');
    }
    text
}

// ============================================================================
// Side identity sets
// ============================================================================

/// Identity pools for one side of a match.
#[derive(Debug, Default, Clone)]
pub struct SideSets {
    pub steam_keys: FxHashSet<String>,
    pub name_keys: FxHashSet<String>,
}

impl SideSets {
    pub fn build(
        lineup: &[LineupSlot],
        summary: Option<&TeamEventSummary>,
        scope: LineupScope,
    ) -> Self {
        let mut sets = Self::default();
        for slot in lineup {
            if scope == LineupScope::StartersOnly && !slot.started {
                continue;
            }
            sets.add_hints(slot.steam_id.as_deref(), slot.id.as_deref(), slot.name.as_deref());
        }
        // Team-level summaries are higher trust than lineup blobs; their
        // participants always count for the side.
        if let Some(summary) = summary {
            for player in &summary.players {
                sets.add_hints(player.steam_id.as_deref(), None, player.name.as_deref());
            }
        }
        sets
    }

    fn add_hints(&mut self, steam_id: Option<&str>, id: Option<&str>, name: Option<&str>) {
        for raw in [steam_id, id].into_iter().flatten() {
            self.steam_keys.extend(alias_set(raw));
        }
        if let Some(name) = name {
            let key = text_key(name);
            if !key.is_empty() {
                self.name_keys.insert(key);
            }
        }
    }

    fn contains_alias(&self, raw: &str) -> bool {
        alias_set(raw).iter().any(|a| self.steam_keys.contains(a))
    }

    fn contains_name(&self, name: &str) -> bool {
        let key = text_key(name);
        !key.is_empty() && self.name_keys.contains(&key)
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Pre-built classifier for one match.
#[derive(Debug)]
pub struct SideClassifier {
    home_id: Option<String>,
    away_id: Option<String>,
    mirror: bool,
    home: SideSets,
    away: SideSets,
}

impl SideClassifier {
    pub fn new(record: &MatchRecord, scope: LineupScope) -> Self {
        Self {
            home_id: record.home_team_id.clone(),
            away_id: record.away_team_id.clone(),
            mirror: record.is_mirror(),
            home: SideSets::build(&record.home_lineup, record.home_summary.as_ref(), scope),
            away: SideSets::build(&record.away_lineup, record.away_summary.as_ref(), scope),
        }
    }

    /// Attribute one stat row to a side.
    ///
    /// The explicit team id is the cheap, authoritative path; identity-set
    /// membership is only consulted when the id is absent or when the match
    /// is a mirror (identical declared teams), where id comparison is
    /// degenerate. Aliases are checked before name keys because numeric ids
    /// are higher trust than free text. No match means `Neutral`.
    pub fn classify(&self, row: &StatRow) -> Side {
        if !self.mirror {
            if let Some(team_id) = &row.team_id {
                if self.home_id.as_deref() == Some(team_id.as_str()) {
                    return Side::Home;
                }
                if self.away_id.as_deref() == Some(team_id.as_str()) {
                    return Side::Away;
                }
            }
        }

        if self.home.contains_alias(&row.steam_id) {
            return Side::Home;
        }
        if self.away.contains_alias(&row.steam_id) {
            return Side::Away;
        }

        if let Some(name) = &row.player_name {
            if self.home.contains_name(name) {
                return Side::Home;
            }
            if self.away.contains_name(name) {
                return Side::Away;
            }
        }

        Side::Neutral
    }
}
