//! Player identity canonicalization.
//!
//! The community has accumulated three legacy encodings of the same Steam
//! account space plus free-text names from lineup blobs. This module turns
//! any of them into comparable keys:
//! - `steam64_from_str` derives the canonical 64-bit id when possible
//! - `alias_set` builds the comparison set for one raw id
//! - `text_key` normalizes free text for name-based fallback matching
//! - `IdentityDirectory` resolves linked alternate ids to one canonical
//!   identity and the full alias scope for joins

use crate::types::PlayerIdentity;
use rustc_hash::{FxHashMap, FxHashSet};

/// Origin of the SteamID64 numeric space (`STEAM_0:0:0`).
const STEAM64_BASE: u64 = 76_561_197_960_265_728;

/// Derive the canonical 64-bit id from any accepted legacy encoding.
///
/// Accepted forms:
/// - directly numeric, at least 16 digits (`76561198012345678`)
/// - `STEAM_X:Y:Z` triplet (`base + Z*2 + Y`)
/// - bracketed `[U:1:Z]` (`base + Z`)
///
/// Unrecognized input yields `None`; callers fall back to treating the raw
/// string as an opaque alias.
pub fn steam64_from_str(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.len() >= 16 && raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse().ok();
    }

    let upper = raw.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("STEAM_") {
        let mut parts = rest.splitn(3, ':');
        let _universe: u64 = parts.next()?.parse().ok()?;
        let y: u64 = parts.next()?.parse().ok()?;
        let z: u64 = parts.next()?.parse().ok()?;
        if y > 1 {
            return None;
        }
        return Some(STEAM64_BASE + z * 2 + y);
    }

    if let Some(inner) = upper.strip_prefix("[U:1:").and_then(|s| s.strip_suffix(']')) {
        let z: u64 = inner.parse().ok()?;
        return Some(STEAM64_BASE + z);
    }

    None
}

/// True when the value itself is an identifier rather than a human name.
/// Used by display-name selection to reject id-shaped candidates.
pub fn looks_like_identifier(value: &str) -> bool {
    let trimmed = value.trim();
    if steam64_from_str(trimmed).is_some() {
        return true;
    }
    // Discord snowflakes and other purely numeric ids.
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Comparison set for one raw id: the lowercased raw form plus the decimal
/// canonical form when derivable. Two ids denote the same identity iff
/// their alias sets intersect.
pub fn alias_set(raw: &str) -> FxHashSet<String> {
    let mut set = FxHashSet::default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return set;
    }
    set.insert(trimmed.to_lowercase());
    if let Some(id64) = steam64_from_str(trimmed) {
        set.insert(id64.to_string());
    }
    set
}

/// True when two raw ids resolve to the same identity.
pub fn same_identity(a: &str, b: &str) -> bool {
    let set_a = alias_set(a);
    if set_a.is_empty() {
        return false;
    }
    alias_set(b).iter().any(|alias| set_a.contains(alias))
}

/// Normalized text key: lowercase, `[a-z0-9]` only. Empty keys never match
/// anything, which avoids false positives on blank or unknown names.
pub fn text_key(name: &str) -> String {
    name.chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            c.is_ascii_alphanumeric().then_some(c)
        })
        .collect()
}

/// Canonical grouping key for a raw player id: the decimal SteamID64 when
/// derivable, otherwise the lowercased raw string.
pub fn canonical_player_key(raw: &str) -> String {
    match steam64_from_str(raw) {
        Some(id64) => id64.to_string(),
        None => raw.trim().to_lowercase(),
    }
}

/// Resolves any known id (primary or linked) to one canonical identity and
/// the union of all associated aliases.
#[derive(Debug, Default)]
pub struct IdentityDirectory {
    /// alias -> index into `players`
    index: FxHashMap<String, usize>,
    players: Vec<PlayerIdentity>,
}

impl IdentityDirectory {
    pub fn new(players: Vec<PlayerIdentity>) -> Self {
        let mut directory = Self {
            index: FxHashMap::default(),
            players,
        };
        for (i, player) in directory.players.iter().enumerate() {
            for raw in std::iter::once(&player.steam_id).chain(player.linked_ids.iter()) {
                for alias in alias_set(raw) {
                    directory.index.entry(alias).or_insert(i);
                }
            }
        }
        directory
    }

    /// Resolve a raw id (any encoding, primary or linked) to its player.
    pub fn resolve(&self, raw: &str) -> Option<&PlayerIdentity> {
        alias_set(raw)
            .iter()
            .find_map(|alias| self.index.get(alias))
            .map(|&i| &self.players[i])
    }

    /// Canonical grouping key for a raw id: the resolved primary id when the
    /// directory knows the player, otherwise the standalone canonical key.
    pub fn canonical_key(&self, raw: &str) -> String {
        match self.resolve(raw) {
            Some(player) => canonical_player_key(&player.steam_id),
            None => canonical_player_key(raw),
        }
    }

    /// Union of every alias associated with this id, for joins that must
    /// aggregate a player's totals across merged accounts.
    pub fn match_scope(&self, raw: &str) -> FxHashSet<String> {
        match self.resolve(raw) {
            Some(player) => {
                let mut scope = FxHashSet::default();
                for id in std::iter::once(&player.steam_id).chain(player.linked_ids.iter()) {
                    scope.extend(alias_set(id));
                }
                scope
            }
            None => alias_set(raw),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steam64_numeric() {
        assert_eq!(
            steam64_from_str("76561198012345678"),
            Some(76561198012345678)
        );
        // Too short to be a SteamID64.
        assert_eq!(steam64_from_str("123456789"), None);
    }

    #[test]
    fn test_steam64_triplet_and_bracket_agree() {
        // STEAM_0:1:26094806 == [U:1:52189613] == 76561198012455341
        assert_eq!(steam64_from_str("STEAM_0:1:26094806"), Some(76561198012455341));
        assert_eq!(steam64_from_str("[U:1:52189613]"), Some(76561198012455341));
        assert_eq!(steam64_from_str("76561198012455341"), Some(76561198012455341));
    }

    #[test]
    fn test_steam64_rejects_garbage() {
        assert_eq!(steam64_from_str(""), None);
        assert_eq!(steam64_from_str("PlayerOne"), None);
        assert_eq!(steam64_from_str("STEAM_0:5:1"), None);
        assert_eq!(steam64_from_str("[U:1:notanumber]"), None);
    }

    #[test]
    fn test_alias_sets_intersect_across_encodings() {
        let forms = ["STEAM_0:1:26094806", "[U:1:52189613]", "76561198012455341"];
        for a in &forms {
            for b in &forms {
                assert!(same_identity(a, b), "{a} should match {b}");
            }
        }
    }

    #[test]
    fn test_alias_sets_never_spuriously_intersect() {
        assert!(!same_identity("STEAM_0:1:26094806", "STEAM_0:0:26094806"));
        assert!(!same_identity("PlayerOne", "PlayerTwo"));
        assert!(!same_identity("", ""));
    }

    #[test]
    fn test_text_key_normalization() {
        assert_eq!(text_key("  J. Doe-99 "), "jdoe99");
        assert_eq!(text_key("ÄÖÜ"), "");
        assert_eq!(text_key(""), "");
    }

    #[test]
    fn test_looks_like_identifier() {
        assert!(looks_like_identifier("76561198012455341"));
        assert!(looks_like_identifier("STEAM_0:1:26094806"));
        assert!(looks_like_identifier("123456789012345678")); // Discord snowflake
        assert!(!looks_like_identifier("Sergio"));
    }

    #[test]
    fn test_directory_resolves_linked_ids_to_one_identity() {
        let directory = IdentityDirectory::new(vec![PlayerIdentity {
            steam_id: "76561198012455341".to_string(),
            linked_ids: vec!["STEAM_0:0:11101".to_string()],
            display_name: Some("Sergio".to_string()),
            discord_id: None,
        }]);

        let via_primary = directory.canonical_key("[U:1:52189613]");
        let via_linked = directory.canonical_key("STEAM_0:0:11101");
        assert_eq!(via_primary, via_linked);
        assert_eq!(via_primary, "76561198012455341");

        let scope = directory.match_scope("STEAM_0:0:11101");
        assert!(scope.contains("76561198012455341"));
        assert!(scope.contains(&(76561197960265728u64 + 11101 * 2).to_string()));
    }

    #[test]
    fn test_directory_unknown_id_falls_back() {
        let directory = IdentityDirectory::new(vec![]);
        assert_eq!(directory.canonical_key("PlayerOne"), "playerone");
        assert!(directory.resolve("PlayerOne").is_none());
    }
}
