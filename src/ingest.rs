use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ValuationConfig;
use crate::error::{Result, Source, ValuationError};
use crate::identity::{PlayerKey, PositionSet, SeasonTag, canonical_positions, normalize_name};
use crate::stats::{Situation, Stat, StatLine};

/// Draft-popularity row as delivered by the source adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDraftRow {
    pub name: String,
    pub positions: String,
    pub avg_pick: String,
    pub avg_round: String,
    pub pct_drafted: String,
}

/// Performance row: identity columns plus `(column label, raw cell)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPerformanceRow {
    pub name: String,
    pub position: String,
    pub season: String,
    pub situation: String,
    pub values: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub key: PlayerKey,
    pub positions: PositionSet,
    pub avg_pick: f64,
    pub avg_round: f64,
    /// Percent of leagues, 0-100.
    pub pct_drafted: f64,
}

/// Key of one per-season performance row before the season dimension is dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeasonKey {
    pub key: PlayerKey,
    pub positions: PositionSet,
    pub season: SeasonTag,
}

pub type SplitTable = BTreeMap<SeasonKey, StatLine>;

/// Per-situation tables parsed from the performance source.
#[derive(Debug, Clone, Default)]
pub struct SituationTables {
    tables: BTreeMap<Situation, SplitTable>,
}

impl SituationTables {
    pub fn get(&self, situation: Situation) -> Option<&SplitTable> {
        self.tables.get(&situation)
    }

    pub fn situations(&self) -> impl Iterator<Item = Situation> + '_ {
        self.tables.keys().copied()
    }

    pub fn rows(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }
}

pub fn parse_draft_rows(rows: &[RawDraftRow], config: &ValuationConfig) -> Result<Vec<DraftRecord>> {
    let mut out = Vec::with_capacity(rows.len());
    let mut seen: HashSet<PlayerKey> = HashSet::new();
    let mut goalies = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        let positions = canonical_positions(&row.positions);
        if positions.is_empty() && !row.positions.trim().is_empty() {
            goalies += 1;
            continue;
        }
        let key = normalize_name(&row.name, &config.name_overrides);
        let avg_pick = required_number(Source::Draft, row_no, "avg_pick", &row.avg_pick)?;
        let avg_round = required_number(Source::Draft, row_no, "avg_round", &row.avg_round)?;
        let pct_drafted = parse_percent(&row.pct_drafted).ok_or_else(|| malformed(
            Source::Draft,
            row_no,
            "pct_drafted",
            &row.pct_drafted,
        ))?;

        if !seen.insert(key.clone()) {
            return Err(ValuationError::DuplicateKey {
                origin: Source::Draft,
                key: key.to_string(),
            });
        }
        out.push(DraftRecord {
            key,
            positions,
            avg_pick,
            avg_round,
            pct_drafted,
        });
    }

    info!(rows = out.len(), goalies, "parsed draft rows");
    Ok(out)
}

pub fn parse_performance_rows(
    rows: &[RawPerformanceRow],
    config: &ValuationConfig,
) -> Result<SituationTables> {
    let mut tables: BTreeMap<Situation, SplitTable> = BTreeMap::new();
    let mut goalies = 0usize;

    for (idx, row) in rows.iter().enumerate() {
        let row_no = idx + 1;
        let Some(situation) = Situation::parse(&row.situation) else {
            return Err(ValuationError::UnknownSituation {
                row: row_no,
                value: row.situation.clone(),
            });
        };
        let positions = canonical_positions(&row.position);
        if positions.is_empty() && !row.position.trim().is_empty() {
            goalies += 1;
            continue;
        }
        let key = SeasonKey {
            key: normalize_name(&row.name, &config.name_overrides),
            positions,
            season: SeasonTag::new(row.season.as_str()),
        };
        let line = parse_stat_cells(row_no, &row.values, config)?;

        let table = tables.entry(situation).or_default();
        if table.contains_key(&key) {
            return Err(ValuationError::DuplicateKey {
                origin: Source::Performance,
                key: format!("{} [{}] {} {}", key.key, key.positions, key.season, situation),
            });
        }
        table.insert(key, line);
    }

    let parsed = SituationTables { tables };
    info!(rows = parsed.rows(), goalies, "parsed performance rows");
    Ok(parsed)
}

fn parse_stat_cells(row_no: usize, cells: &[(String, String)], config: &ValuationConfig) -> Result<StatLine> {
    let mut line = StatLine::new();
    for (column, raw) in cells {
        let Some(stat) = Stat::from_label(column) else {
            continue;
        };
        if !config.stats.contains(&stat) {
            debug!(%stat, "column outside configured enumeration ignored");
            continue;
        }
        let value = if config.is_rate(stat) {
            optional_percent(Source::Performance, row_no, column, raw)?
        } else {
            optional_number(Source::Performance, row_no, column, raw)?
        };
        if let Some(v) = value {
            line.insert(stat, v);
        }
    }
    Ok(line)
}

fn is_blank(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || s == "-" || s == "--"
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    let value = cleaned.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// `"87%"`, `"87"` and `"87.5 %"` all read as 87.0.
fn parse_percent(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_suffix('%').unwrap_or(s);
    parse_number(s)
}

fn malformed(origin: Source, row: usize, column: &str, value: &str) -> ValuationError {
    ValuationError::MalformedRow {
        origin,
        row,
        column: column.to_string(),
        value: value.to_string(),
    }
}

fn required_number(origin: Source, row: usize, column: &str, raw: &str) -> Result<f64> {
    parse_number(raw).ok_or_else(|| malformed(origin, row, column, raw))
}

fn optional_number(origin: Source, row: usize, column: &str, raw: &str) -> Result<Option<f64>> {
    if is_blank(raw) {
        return Ok(None);
    }
    required_number(origin, row, column, raw).map(Some)
}

fn optional_percent(origin: Source, row: usize, column: &str, raw: &str) -> Result<Option<f64>> {
    if is_blank(raw) {
        return Ok(None);
    }
    parse_percent(raw)
        .map(Some)
        .ok_or_else(|| malformed(origin, row, column, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, positions: &str, pct: &str) -> RawDraftRow {
        RawDraftRow {
            name: name.to_string(),
            positions: positions.to_string(),
            avg_pick: "12.4".to_string(),
            avg_round: "2.1".to_string(),
            pct_drafted: pct.to_string(),
        }
    }

    #[test]
    fn percent_accepts_suffix_or_bare_number() {
        let cfg = ValuationConfig::default();
        let rows = vec![draft("Jamie Benn", "LW", "100%"), draft("Tyler Seguin", "C,RW", "97")];
        let parsed = parse_draft_rows(&rows, &cfg).unwrap();
        assert_eq!(parsed[0].pct_drafted, 100.0);
        assert_eq!(parsed[1].pct_drafted, 97.0);
        assert_eq!(parsed[1].positions.as_str(), "C,R");
    }

    #[test]
    fn unparseable_percent_names_the_row() {
        let cfg = ValuationConfig::default();
        let rows = vec![draft("Jamie Benn", "LW", "100%"), draft("Tyler Seguin", "C", "lots")];
        let err = parse_draft_rows(&rows, &cfg).unwrap_err();
        assert_eq!(
            err,
            ValuationError::MalformedRow {
                origin: Source::Draft,
                row: 2,
                column: "pct_drafted".to_string(),
                value: "lots".to_string(),
            }
        );
    }

    #[test]
    fn colliding_draft_names_are_fatal() {
        let cfg = ValuationConfig::default();
        let rows = vec![draft("Alexander Ovechkin", "LW", "100%"), draft("Alex Ovechkin", "LW", "100%")];
        assert!(matches!(
            parse_draft_rows(&rows, &cfg),
            Err(ValuationError::DuplicateKey { origin: Source::Draft, .. })
        ));
    }

    #[test]
    fn goalies_are_skipped() {
        let cfg = ValuationConfig::default();
        let rows = vec![draft("Carey Price", "G", "100%")];
        assert!(parse_draft_rows(&rows, &cfg).unwrap().is_empty());
    }

    #[test]
    fn blank_cells_stay_absent_and_bad_cells_fail() {
        let cfg = ValuationConfig::default();
        let mut row = RawPerformanceRow {
            name: "SIDNEY.CROSBY".to_string(),
            position: "C".to_string(),
            season: "20152016".to_string(),
            situation: "all".to_string(),
            values: vec![
                ("GP".to_string(), "80".to_string()),
                ("G".to_string(), "36".to_string()),
                ("iSh%".to_string(), "11.6%".to_string()),
                ("iHF".to_string(), "".to_string()),
                ("CF%".to_string(), "junk".to_string()),
            ],
        };
        let tables = parse_performance_rows(std::slice::from_ref(&row), &cfg).unwrap();
        let all = tables.get(Situation::All).unwrap();
        let line = all.values().next().unwrap();
        assert_eq!(line.get(Stat::GamesPlayed), Some(80.0));
        assert_eq!(line.get(Stat::ShootingPct), Some(11.6));
        assert_eq!(line.get(Stat::Hits), None);

        row.values.push(("A".to_string(), "n/a".to_string()));
        let err = parse_performance_rows(&[row], &cfg).unwrap_err();
        assert!(matches!(err, ValuationError::MalformedRow { row: 1, ref column, .. } if column == "A"));
    }

    #[test]
    fn colliding_performance_rows_are_fatal() {
        let cfg = ValuationConfig::default();
        let row = |name: &str, position: &str, situation: &str| RawPerformanceRow {
            name: name.to_string(),
            position: position.to_string(),
            season: "20152016".to_string(),
            situation: situation.to_string(),
            values: vec![("G".to_string(), "50".to_string())],
        };

        // Same skater in two situations is fine.
        let split = vec![row("ALEXANDER.OVECHKIN", "LW", "all"), row("ALEXANDER.OVECHKIN", "LW", "5v4")];
        assert_eq!(parse_performance_rows(&split, &cfg).unwrap().rows(), 2);

        let rows = vec![row("ALEXANDER.OVECHKIN", "LW", "all"), row("Alex Ovechkin", "L", "all")];
        let err = parse_performance_rows(&rows, &cfg).unwrap_err();
        assert!(matches!(
            err,
            ValuationError::DuplicateKey { origin: Source::Performance, ref key } if key.starts_with("Alex Ovechkin [L] 20152016")
        ));
    }

    #[test]
    fn unknown_situation_is_rejected() {
        let cfg = ValuationConfig::default();
        let row = RawPerformanceRow {
            name: "X".to_string(),
            position: "C".to_string(),
            season: "20152016".to_string(),
            situation: "6v5".to_string(),
            values: Vec::new(),
        };
        assert!(matches!(
            parse_performance_rows(&[row], &cfg),
            Err(ValuationError::UnknownSituation { row: 1, .. })
        ));
    }
}
