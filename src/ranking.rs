use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ValuationConfig;
use crate::error::{Result, ValuationError};
use crate::identity::Position;
use crate::reconcile::CombinedRecord;
use crate::stats::Stat;

/// Standard deviations at or below this are treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRequest {
    /// Zero-based index of the replacement player in each per-stat ordering,
    /// i.e. the number of roster-worthy players in the pool.
    pub replacement_rank: usize,
    pub stats: Vec<Stat>,
}

impl RankRequest {
    pub fn new(replacement_rank: usize, stats: Vec<Stat>) -> Self {
        Self {
            replacement_rank,
            stats,
        }
    }

    /// Rank on every summable statistic of the configured enumeration.
    pub fn all_stats(replacement_rank: usize, config: &ValuationConfig) -> Self {
        Self::new(replacement_rank, config.summable_stats())
    }
}

/// Replacement baseline and the distribution used to standardize one statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatBaseline {
    pub baseline: f64,
    pub mean: f64,
    pub stdev: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRecord {
    pub record: CombinedRecord,
    /// Value minus the replacement baseline; 0 is replacement level.
    pub subtracted: BTreeMap<Stat, f64>,
    /// Z-score of the subtracted value across the pool.
    pub standardized: BTreeMap<Stat, f64>,
    /// Sum of standardized values over the ranked statistics.
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub stats: Vec<Stat>,
    pub baselines: BTreeMap<Stat, StatBaseline>,
    /// Composite value descending.
    pub records: Vec<RankedRecord>,
}

/// Replacement-level ranking.
///
/// For each statistic the pool is ordered best-first and the value at
/// `replacement_rank` becomes the baseline. Baseline-subtracted columns are
/// standardized with the population mean and deviation, and a record's value is
/// the sum of its z-scores. Ties, in the per-stat orderings and in the final one,
/// go to the lower `(key, positions, season)`.
pub fn rank(records: &[CombinedRecord], request: &RankRequest) -> Result<Ranking> {
    let mut stats: Vec<Stat> = Vec::with_capacity(request.stats.len());
    for stat in &request.stats {
        if !stats.contains(stat) {
            stats.push(*stat);
        }
    }
    if stats.is_empty() {
        return Err(ValuationError::EmptyStatSet);
    }
    let n = request.replacement_rank;
    if n >= records.len() {
        return Err(ValuationError::ReplacementRank {
            rank: n,
            rows: records.len(),
        });
    }

    let mut identity_order: Vec<usize> = (0..records.len()).collect();
    identity_order.sort_by(|a, b| identity_cmp(&records[*a], &records[*b]));
    let mut tie_rank = vec![0usize; records.len()];
    for (pos, idx) in identity_order.iter().enumerate() {
        tie_rank[*idx] = pos;
    }

    let mut baselines: BTreeMap<Stat, StatBaseline> = BTreeMap::new();
    let mut subtracted_cols: Vec<Vec<f64>> = Vec::with_capacity(stats.len());
    let mut standardized_cols: Vec<Vec<f64>> = Vec::with_capacity(stats.len());

    for stat in &stats {
        let column = stat_column(records, *stat)?;

        let mut order: Vec<usize> = (0..records.len()).collect();
        order.sort_by(|a, b| {
            column[*b]
                .total_cmp(&column[*a])
                .then(tie_rank[*a].cmp(&tie_rank[*b]))
        });
        let baseline = column[order[n]];

        let subtracted: Vec<f64> = column.iter().map(|v| v - baseline).collect();
        let (mean, stdev) = population_mean_stdev(&subtracted);
        if stdev <= STDEV_EPSILON {
            return Err(ValuationError::DegenerateStat { stat: *stat });
        }
        let standardized: Vec<f64> = subtracted.iter().map(|v| (v - mean) / stdev).collect();

        debug!(%stat, baseline, mean, stdev, "replacement baseline");
        baselines.insert(
            *stat,
            StatBaseline {
                baseline,
                mean,
                stdev,
            },
        );
        subtracted_cols.push(subtracted);
        standardized_cols.push(standardized);
    }

    let mut ranked: Vec<(usize, RankedRecord)> = records
        .iter()
        .enumerate()
        .map(|(i, rec)| {
            let subtracted: BTreeMap<Stat, f64> = stats
                .iter()
                .zip(&subtracted_cols)
                .map(|(s, col)| (*s, col[i]))
                .collect();
            let standardized: BTreeMap<Stat, f64> = stats
                .iter()
                .zip(&standardized_cols)
                .map(|(s, col)| (*s, col[i]))
                .collect();
            let value = standardized_cols.iter().map(|col| col[i]).sum::<f64>();
            (
                i,
                RankedRecord {
                    record: rec.clone(),
                    subtracted,
                    standardized,
                    value,
                },
            )
        })
        .collect();

    ranked.sort_by(|(ia, a), (ib, b)| {
        b.value
            .total_cmp(&a.value)
            .then(tie_rank[*ia].cmp(&tie_rank[*ib]))
    });

    info!(
        rows = ranked.len(),
        stats = stats.len(),
        replacement_rank = n,
        "ranked pool"
    );
    Ok(Ranking {
        stats,
        baselines,
        records: ranked.into_iter().map(|(_, r)| r).collect(),
    })
}

/// Records whose position set includes `position`.
pub fn filter_positions(records: &[CombinedRecord], position: Position) -> Vec<CombinedRecord> {
    records
        .iter()
        .filter(|r| r.positions.contains(position))
        .cloned()
        .collect()
}

/// Drop power-play statistics that carry no signal across `records`, such as
/// the zero-filled columns left when no power-play split was loaded. Other
/// statistics are kept so that [`rank`] still reports them.
pub fn informative_stats(records: &[CombinedRecord], stats: &[Stat]) -> Vec<Stat> {
    let mut kept = Vec::with_capacity(stats.len());
    for stat in stats {
        if stat.is_power_play()
            && let Ok(column) = stat_column(records, *stat)
            && !column.is_empty()
            && population_mean_stdev(&column).1 <= STDEV_EPSILON
        {
            warn!(%stat, "power-play statistic is constant across the pool, not ranked");
            continue;
        }
        kept.push(*stat);
    }
    kept
}

fn identity_cmp(a: &CombinedRecord, b: &CombinedRecord) -> Ordering {
    a.key
        .cmp(&b.key)
        .then_with(|| a.positions.cmp(&b.positions))
        .then_with(|| a.season.cmp(&b.season))
}

fn stat_column(records: &[CombinedRecord], stat: Stat) -> Result<Vec<f64>> {
    records
        .iter()
        .map(|r| {
            r.stats.get(stat).ok_or_else(|| ValuationError::MissingStat {
                key: r.key.to_string(),
                stat,
            })
        })
        .collect()
}

fn population_mean_stdev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values
        .iter()
        .map(|v| {
            let d = v - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}
