use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::ValuationConfig;
use crate::error::{Result, ValuationError};
use crate::identity::{PlayerKey, PositionSet, SeasonTag};
use crate::ingest::{SeasonKey, SituationTables, SplitTable};
use crate::stats::{Situation, Stat, StatLine};

/// One performance-side row ready to be joined with draft data.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRow {
    pub key: PlayerKey,
    pub positions: PositionSet,
    /// `None` once seasons have been projected away.
    pub season: Option<SeasonTag>,
    pub stats: StatLine,
}

/// Sum split tables that describe the same kind of play (e.g. 5v4 and 5v3).
///
/// Rate statistics are dropped first. Keys present in only some tables are kept;
/// a statistic missing from one operand counts as zero there and stays missing
/// only when no operand has it.
pub fn combine_splits(splits: &[&SplitTable], config: &ValuationConfig) -> SplitTable {
    let mut out: SplitTable = BTreeMap::new();
    for table in splits {
        for (key, line) in table.iter() {
            let line = line.without(&config.rate_stats);
            match out.get_mut(key) {
                Some(acc) => *acc = acc.add(&line),
                None => {
                    out.insert(key.clone(), line);
                }
            }
        }
    }
    out
}

/// Attach power-play columns to the all-situations table.
///
/// The configured power-play situations are combined, each base column renamed
/// to its power-play counterpart, and left-joined onto the all-situations rows.
/// Skaters with no power-play row get explicit zeros.
pub fn merge_power_play(tables: &SituationTables, config: &ValuationConfig) -> SplitTable {
    let empty = SplitTable::new();
    let all = tables.get(Situation::All).unwrap_or(&empty);

    let pp_tables: Vec<&SplitTable> = config
        .power_play_situations
        .iter()
        .filter_map(|s| tables.get(*s))
        .collect();
    let power_play = combine_splits(&pp_tables, config);

    let pp_stats: Vec<Stat> = config
        .stats
        .iter()
        .copied()
        .filter(|s| s.is_power_play())
        .collect();

    let mut without_pp = 0usize;
    let merged: SplitTable = all
        .iter()
        .map(|(key, line)| {
            let mut out = line.without(&pp_stats);
            match power_play.get(key) {
                Some(pp) => {
                    for (stat, value) in pp.iter() {
                        let Some(target) = stat.power_play_counterpart() else {
                            continue;
                        };
                        if pp_stats.contains(&target) {
                            out.insert(target, value);
                        }
                    }
                }
                None => without_pp += 1,
            }
            for stat in &pp_stats {
                if !out.contains(*stat) {
                    out.insert(*stat, 0.0);
                }
            }
            (key.clone(), out)
        })
        .collect();

    let orphaned = power_play.keys().filter(|k| !all.contains_key(*k)).count();
    if orphaned > 0 {
        debug!(orphaned, "power-play rows without an all-situations row dropped");
    }
    info!(rows = merged.len(), without_pp, "merged power-play splits");
    merged
}

/// Replace per-season rows with one recency-weighted row per player and position.
///
/// Each statistic is `Σ value × weight / Σ weight`. The denominator sums the
/// weights of every season the player has a row for; a season missing one
/// statistic contributes nothing to that numerator. Seasons the player never
/// played do not dilute the line.
pub fn project_seasons(table: &SplitTable, config: &ValuationConfig) -> Result<Vec<PerformanceRow>> {
    let mut groups: BTreeMap<(PlayerKey, PositionSet), (f64, BTreeMap<Stat, f64>)> = BTreeMap::new();

    for (sk, line) in table {
        let Some(weight) = config.season_weights.get(&sk.season) else {
            return Err(ValuationError::UnknownSeason {
                key: sk.key.to_string(),
                season: sk.season.to_string(),
            });
        };
        let w = f64::from(weight);
        let (total_weight, sums) = groups
            .entry((sk.key.clone(), sk.positions.clone()))
            .or_default();
        *total_weight += w;
        for (stat, value) in line.iter() {
            if config.is_rate(stat) {
                continue;
            }
            *sums.entry(stat).or_insert(0.0) += value * w;
        }
    }

    let rows: Vec<PerformanceRow> = groups
        .into_iter()
        .map(|((key, positions), (total_weight, sums))| PerformanceRow {
            key,
            positions,
            season: None,
            stats: sums
                .into_iter()
                .map(|(stat, num)| (stat, num / total_weight))
                .collect(),
        })
        .collect();
    info!(rows = rows.len(), seasons = table.len(), "projected seasons");
    Ok(rows)
}

/// Per-season rows, unweighted.
pub fn season_rows(table: &SplitTable) -> Vec<PerformanceRow> {
    table
        .iter()
        .map(|(sk, line)| season_row(sk, line))
        .collect()
}

fn season_row(sk: &SeasonKey, line: &StatLine) -> PerformanceRow {
    PerformanceRow {
        key: sk.key.clone(),
        positions: sk.positions.clone(),
        season: Some(sk.season.clone()),
        stats: line.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sk(name: &str, season: &str) -> SeasonKey {
        SeasonKey {
            key: PlayerKey::new(name),
            positions: crate::identity::canonical_positions("C"),
            season: SeasonTag::new(season),
        }
    }

    fn line(values: &[(Stat, f64)]) -> StatLine {
        values.iter().copied().collect()
    }

    #[test]
    fn combining_sums_games_without_double_counting() {
        let cfg = ValuationConfig::default();
        let a: SplitTable = [(sk("A", "20152016"), line(&[(Stat::GamesPlayed, 60.0), (Stat::Goals, 5.0), (Stat::ShootingPct, 12.0)]))].into();
        let b: SplitTable = [
            (sk("A", "20152016"), line(&[(Stat::GamesPlayed, 20.0), (Stat::Assists, 2.0)])),
            (sk("B", "20152016"), line(&[(Stat::GamesPlayed, 3.0)])),
        ]
        .into();
        let out = combine_splits(&[&a, &b], &cfg);
        let a_line = &out[&sk("A", "20152016")];
        assert_eq!(a_line.get(Stat::GamesPlayed), Some(80.0));
        assert_eq!(a_line.get(Stat::Goals), Some(5.0));
        assert_eq!(a_line.get(Stat::Assists), Some(2.0));
        assert_eq!(a_line.get(Stat::ShootingPct), None);
        assert_eq!(a_line.get(Stat::Hits), None);
        assert_eq!(out[&sk("B", "20152016")].get(Stat::GamesPlayed), Some(3.0));
    }

    #[test]
    fn projection_is_weighted_average() {
        let cfg = ValuationConfig::default();
        let table: SplitTable = [
            (sk("A", "20152016"), line(&[(Stat::Goals, 10.0), (Stat::ShootingPct, 15.0)])),
            (sk("A", "20142015"), line(&[(Stat::Goals, 4.0)])),
        ]
        .into();
        let rows = project_seasons(&table, &cfg).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].stats.get(Stat::Goals), Some(8.0));
        assert_eq!(rows[0].stats.get(Stat::ShootingPct), None);
        assert!(rows[0].season.is_none());
    }

    #[test]
    fn single_season_is_not_penalized() {
        let cfg = ValuationConfig::default();
        let table: SplitTable = [(sk("Rookie", "20152016"), line(&[(Stat::Goals, 20.0)]))].into();
        let rows = project_seasons(&table, &cfg).unwrap();
        assert_eq!(rows[0].stats.get(Stat::Goals), Some(20.0));
    }

    #[test]
    fn missing_cell_still_counts_the_season_weight() {
        let cfg = ValuationConfig::default();
        let table: SplitTable = [
            (sk("A", "20152016"), line(&[(Stat::Goals, 10.0), (Stat::Hits, 30.0)])),
            (sk("A", "20142015"), line(&[(Stat::Goals, 4.0)])),
        ]
        .into();
        let rows = project_seasons(&table, &cfg).unwrap();
        assert_eq!(rows[0].stats.get(Stat::Goals), Some(8.0));
        // 30 * 4 / (4 + 2)
        assert_eq!(rows[0].stats.get(Stat::Hits), Some(20.0));
        assert_eq!(rows[0].stats.get(Stat::Blocks), None);
    }

    #[test]
    fn unknown_season_is_an_error() {
        let cfg = ValuationConfig::default();
        let table: SplitTable = [(sk("A", "19992000"), line(&[(Stat::Goals, 1.0)]))].into();
        assert!(matches!(
            project_seasons(&table, &cfg),
            Err(ValuationError::UnknownSeason { .. })
        ));
    }
}
