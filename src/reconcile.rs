use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::PerformanceRow;
use crate::error::{Result, Source, ValuationError};
use crate::identity::{PlayerKey, PositionSet, SeasonTag};
use crate::ingest::DraftRecord;
use crate::stats::StatLine;

/// A performance row joined with its draft metrics (real or defaulted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRecord {
    pub key: PlayerKey,
    pub positions: PositionSet,
    pub season: Option<SeasonTag>,
    pub stats: StatLine,
    pub avg_pick: f64,
    pub avg_round: f64,
    pub pct_drafted: f64,
    /// False when the draft metrics are sentinels for an undrafted player.
    pub drafted: bool,
}

/// Left-join performance rows with draft records by [`PlayerKey`].
///
/// Every performance row yields one record in input order; draft-only players are
/// discarded. Unmatched rows are ranked below the drafted pool: pick and round one
/// past the worst matched value, zero percent drafted.
pub fn reconcile(performance: &[PerformanceRow], draft: &[DraftRecord]) -> Result<Vec<CombinedRecord>> {
    let mut by_key: HashMap<&PlayerKey, &DraftRecord> = HashMap::with_capacity(draft.len());
    for rec in draft {
        if by_key.insert(&rec.key, rec).is_some() {
            return Err(ValuationError::DuplicateKey {
                origin: Source::Draft,
                key: rec.key.to_string(),
            });
        }
    }

    let matches: Vec<Option<&DraftRecord>> = performance
        .iter()
        .map(|row| by_key.get(&row.key).copied())
        .collect();

    // Sentinels come from the matched subset only, before any default is applied.
    let max_pick = matches.iter().flatten().map(|d| d.avg_pick).fold(0.0, f64::max);
    let max_round = matches.iter().flatten().map(|d| d.avg_round).fold(0.0, f64::max);
    let undrafted_pick = max_pick + 1.0;
    let undrafted_round = max_round + 1.0;

    let out: Vec<CombinedRecord> = performance
        .iter()
        .zip(&matches)
        .map(|(row, matched)| match matched {
            Some(d) => CombinedRecord {
                key: row.key.clone(),
                positions: if d.positions.is_empty() {
                    row.positions.clone()
                } else {
                    d.positions.clone()
                },
                season: row.season.clone(),
                stats: row.stats.clone(),
                avg_pick: d.avg_pick,
                avg_round: d.avg_round,
                pct_drafted: d.pct_drafted,
                drafted: true,
            },
            None => CombinedRecord {
                key: row.key.clone(),
                positions: row.positions.clone(),
                season: row.season.clone(),
                stats: row.stats.clone(),
                avg_pick: undrafted_pick,
                avg_round: undrafted_round,
                pct_drafted: 0.0,
                drafted: false,
            },
        })
        .collect();

    let matched = matches.iter().filter(|m| m.is_some()).count();
    let used: HashSet<&PlayerKey> =
        matches.iter().flatten().map(|d| &d.key).collect();
    debug!(draft_only = draft.len() - used.len(), "draft rows without performance data");
    info!(
        rows = out.len(),
        matched,
        undrafted = out.len() - matched,
        undrafted_pick,
        undrafted_round,
        "reconciled sources"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::canonical_positions;
    use crate::stats::Stat;

    fn perf(name: &str, pos: &str) -> PerformanceRow {
        PerformanceRow {
            key: PlayerKey::new(name),
            positions: canonical_positions(pos),
            season: None,
            stats: [(Stat::Goals, 1.0)].into_iter().collect(),
        }
    }

    fn draft(name: &str, pos: &str, pick: f64, round: f64) -> DraftRecord {
        DraftRecord {
            key: PlayerKey::new(name),
            positions: canonical_positions(pos),
            avg_pick: pick,
            avg_round: round,
            pct_drafted: 90.0,
        }
    }

    #[test]
    fn unmatched_rows_get_sentinels_from_matched_max() {
        let performance = vec![perf("A", "C"), perf("B", "L"), perf("C", "D")];
        let draft = vec![
            draft("A", "C,R", 3.0, 1.0),
            draft("B", "L", 40.0, 4.0),
            // Draft-only: must not influence the sentinel.
            draft("Z", "D", 150.0, 13.0),
        ];
        let out = reconcile(&performance, &draft).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].positions.as_str(), "C,R");
        let c = &out[2];
        assert!(!c.drafted);
        assert_eq!(c.avg_round, 5.0);
        assert_eq!(c.avg_pick, 41.0);
        assert_eq!(c.pct_drafted, 0.0);
        assert_eq!(c.positions.as_str(), "D");
    }

    #[test]
    fn empty_draft_positions_fall_back_to_performance() {
        let out = reconcile(&[perf("A", "RD")], &[draft("A", "", 1.0, 1.0)]).unwrap();
        assert_eq!(out[0].positions.as_str(), "D");
    }

    #[test]
    fn no_matches_uses_sentinel_one() {
        let out = reconcile(&[perf("A", "C")], &[]).unwrap();
        assert_eq!(out[0].avg_round, 1.0);
        assert_eq!(out[0].avg_pick, 1.0);
    }

    #[test]
    fn duplicate_draft_keys_are_fatal() {
        let draft = vec![draft("A", "C", 1.0, 1.0), draft("A", "D", 2.0, 1.0)];
        assert!(matches!(
            reconcile(&[perf("A", "C")], &draft),
            Err(ValuationError::DuplicateKey { .. })
        ));
    }
}
