//! Per-match ratings and MVP selection.
//!
//! The rating and MVP functions are externally supplied capabilities;
//! the engine runs with reduced fidelity (absent ratings, no MVP) when
//! they are not provided. Persisted recorder judgments always win over
//! anything derived here.

use crate::types::{MvpVerdict, StatRow};
use serde::Serialize;
use tracing::debug;

/// Externally supplied rating function. `None` means "no opinion".
pub trait PlayerRater: Send + Sync {
    fn rate(&self, row: &StatRow) -> Option<f64>;
}

/// Externally supplied MVP selection over all merged rows of one match.
pub trait MvpSelector: Send + Sync {
    fn select(&self, rows: &[StatRow]) -> Option<MvpVerdict>;
}

/// MVP verdict cross-linked to its originating merged row. The re-link can
/// fail (ambiguous or renamed player); the verdict then stands alone.
#[derive(Debug, Clone, Serialize)]
pub struct MvpAward {
    pub verdict: MvpVerdict,
    pub stats: Option<StatRow>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Scorer with optionally injected capabilities.
#[derive(Default)]
pub struct MatchScorer<'a> {
    rater: Option<&'a dyn PlayerRater>,
    selector: Option<&'a dyn MvpSelector>,
}

impl<'a> MatchScorer<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rater(mut self, rater: &'a dyn PlayerRater) -> Self {
        self.rater = Some(rater);
        self
    }

    pub fn with_selector(mut self, selector: &'a dyn MvpSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Fill in per-row ratings. A persisted rating is rounded and used
    /// as-is so the recorder's explicit judgment is never silently
    /// overridden; the fallback rater only runs where none exists.
    pub fn apply_ratings(&self, rows: &mut [StatRow]) {
        for row in rows {
            row.rating = match row.rating {
                Some(persisted) => Some(round2(persisted)),
                None => self
                    .rater
                    .and_then(|rater| rater.rate(row))
                    .map(round2),
            };
        }
    }

    /// Pick the match MVP.
    ///
    /// Flagged merged rows take priority, ranked by `mvp_score` with the
    /// rating as a stand-in when the score is absent. Only when no row is
    /// flagged does the injected selector get asked. Either way the verdict
    /// is re-linked to its merged row by case-insensitive name (and
    /// position, when the verdict names one).
    pub fn select_mvp(&self, rows: &[StatRow]) -> Option<MvpAward> {
        let verdict = self
            .flagged_verdict(rows)
            .or_else(|| self.selector.and_then(|s| s.select(rows)))?;

        let stats = relink(&verdict, rows);
        if stats.is_none() {
            debug!("MVP verdict for '{}' did not re-link to a stat row", verdict.name);
        }
        Some(MvpAward { verdict, stats })
    }

    fn flagged_verdict(&self, rows: &[StatRow]) -> Option<MvpVerdict> {
        let best = rows
            .iter()
            .filter(|row| row.is_mvp)
            .max_by(|a, b| {
                rank_score(a)
                    .partial_cmp(&rank_score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })?;

        Some(MvpVerdict {
            name: best
                .player_name
                .clone()
                .unwrap_or_else(|| best.steam_id.clone()),
            position: best.position.clone(),
            score: rank_score(best),
            key_stats: best.mvp_key_stats.clone(),
        })
    }
}

fn rank_score(row: &StatRow) -> f64 {
    row.mvp_score.or(row.rating).unwrap_or(0.0)
}

/// Cross-link a verdict back to its merged row so callers can expose full
/// per-player statistics alongside the MVP badge.
fn relink(verdict: &MvpVerdict, rows: &[StatRow]) -> Option<StatRow> {
    rows.iter()
        .find(|row| {
            let name_matches = row
                .player_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(&verdict.name))
                || row.steam_id.eq_ignore_ascii_case(&verdict.name);
            let position_matches = match (&verdict.position, &row.position) {
                (Some(wanted), Some(actual)) => wanted.eq_ignore_ascii_case(actual),
                (Some(_), None) => false,
                (None, _) => true,
            };
            name_matches && position_matches
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedRater(f64);
    impl PlayerRater for FixedRater {
        fn rate(&self, _row: &StatRow) -> Option<f64> {
            Some(self.0)
        }
    }

    struct NoOpinionRater;
    impl PlayerRater for NoOpinionRater {
        fn rate(&self, _row: &StatRow) -> Option<f64> {
            None
        }
    }

    struct NameSelector(&'static str);
    impl MvpSelector for NameSelector {
        fn select(&self, _rows: &[StatRow]) -> Option<MvpVerdict> {
            Some(MvpVerdict {
                name: self.0.to_string(),
                position: None,
                score: 8.0,
                key_stats: vec!["selector pick".to_string()],
            })
        }
    }

    fn row(name: &str, position: Option<&str>) -> StatRow {
        StatRow {
            steam_id: format!("id-{name}"),
            player_name: Some(name.to_string()),
            position: position.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_persisted_rating_bypasses_rater() {
        let mut rows = vec![row("A", None)];
        rows[0].rating = Some(7.456);
        MatchScorer::new()
            .with_rater(&FixedRater(1.0))
            .apply_ratings(&mut rows);
        assert_eq!(rows[0].rating, Some(7.46));
    }

    #[test]
    fn test_rater_fallback_and_no_opinion() {
        let mut rows = vec![row("A", None), row("B", None)];
        MatchScorer::new()
            .with_rater(&FixedRater(6.333))
            .apply_ratings(&mut rows);
        assert_eq!(rows[0].rating, Some(6.33));

        let mut rows = vec![row("A", None)];
        MatchScorer::new()
            .with_rater(&NoOpinionRater)
            .apply_ratings(&mut rows);
        assert_eq!(rows[0].rating, None);

        // Without any rater the rating stays absent.
        let mut rows = vec![row("A", None)];
        MatchScorer::new().apply_ratings(&mut rows);
        assert_eq!(rows[0].rating, None);
    }

    #[test]
    fn test_flagged_rows_take_priority_over_selector() {
        let mut rows = vec![row("A", Some("ST")), row("B", Some("GK"))];
        rows[0].is_mvp = true;
        rows[0].mvp_score = Some(7.0);
        rows[1].is_mvp = true;
        rows[1].mvp_score = Some(9.0);

        let award = MatchScorer::new()
            .with_selector(&NameSelector("A"))
            .select_mvp(&rows)
            .unwrap();
        assert_eq!(award.verdict.name, "B");
        assert_eq!(award.verdict.score, 9.0);
        assert_eq!(award.stats.as_ref().unwrap().steam_id, "id-B");
    }

    #[test]
    fn test_flagged_row_without_score_uses_rating() {
        let mut rows = vec![row("A", None), row("B", None)];
        rows[0].is_mvp = true;
        rows[0].rating = Some(8.5);
        rows[1].is_mvp = true;
        rows[1].mvp_score = Some(7.0);

        let award = MatchScorer::new().select_mvp(&rows).unwrap();
        assert_eq!(award.verdict.name, "A");
    }

    #[test]
    fn test_selector_used_when_nothing_flagged() {
        let rows = vec![row("A", None), row("B", None)];
        let award = MatchScorer::new()
            .with_selector(&NameSelector("b"))
            .select_mvp(&rows)
            .unwrap();
        // Case-insensitive re-link.
        assert_eq!(award.stats.as_ref().unwrap().steam_id, "id-B");
    }

    #[test]
    fn test_no_capabilities_means_no_mvp() {
        let rows = vec![row("A", None)];
        assert!(MatchScorer::new().select_mvp(&rows).is_none());
    }

    #[test]
    fn test_relink_failure_keeps_verdict_only() {
        let rows = vec![row("A", None)];
        let award = MatchScorer::new()
            .with_selector(&NameSelector("Renamed Player"))
            .select_mvp(&rows)
            .unwrap();
        assert!(award.stats.is_none());
        assert_eq!(award.verdict.key_stats, vec!["selector pick".to_string()]);
    }

    #[test]
    fn test_relink_respects_position_when_specified() {
        let rows = vec![row("A", Some("GK")), row("A", Some("ST"))];
        let verdict = MvpVerdict {
            name: "A".to_string(),
            position: Some("st".to_string()),
            score: 5.0,
            key_stats: vec![],
        };
        let linked = relink(&verdict, &rows).unwrap();
        assert_eq!(linked.position.as_deref(), Some("ST"));
    }
}
