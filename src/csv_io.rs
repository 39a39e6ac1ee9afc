use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ValuationConfig;
use crate::ingest::{RawDraftRow, RawPerformanceRow};
use crate::ranking::Ranking;
use crate::reconcile::CombinedRecord;
use crate::stats::{Situation, Stat};

pub const DRAFT_FILE: &str = "yahoo.csv";
pub const CORSICA_DIR: &str = "corsica";
pub const UNPROJECTED_FILE: &str = "corsica/skater.csv";
pub const PROJECTED_FILE: &str = "projection.csv";
pub const RANKING_FILE: &str = "ranking.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

const PERFORMANCE_FILES: [(&str, Situation); 3] = [
    ("skater_3yr_all.csv", Situation::All),
    ("skater_3yr_5v4.csv", Situation::FiveOnFour),
    ("skater_3yr_5v3.csv", Situation::FiveOnThree),
];

/// Raw rows of both sources found under a data directory.
#[derive(Debug, Clone, Default)]
pub struct SourceData {
    pub draft: Vec<RawDraftRow>,
    pub performance: Vec<RawPerformanceRow>,
}

/// Summary written next to the published tables.
#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub generated_at: String,
    pub unprojected_rows: usize,
    pub projected_rows: usize,
    pub ranked_rows: Option<usize>,
    pub replacement_rank: Option<usize>,
    pub config: ValuationConfig,
}

impl RunManifest {
    pub fn new(unprojected_rows: usize, projected_rows: usize, config: &ValuationConfig) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            unprojected_rows,
            projected_rows,
            ranked_rows: None,
            replacement_rank: None,
            config: config.clone(),
        }
    }
}

/// Read `yahoo.csv` and the Corsica skater splits. The all-situations file is
/// required; missing power-play files are skipped.
pub fn load_data_dir(dir: &Path) -> Result<SourceData> {
    let draft = read_draft_csv(&dir.join(DRAFT_FILE))?;
    let mut performance = Vec::new();
    for (file, situation) in PERFORMANCE_FILES {
        let path = dir.join(CORSICA_DIR).join(file);
        if !path.exists() {
            if situation == Situation::All {
                return Err(anyhow!("missing all-situations file {}", path.display()));
            }
            warn!(path = %path.display(), "power-play split not found, skipping");
            continue;
        }
        performance.extend(read_performance_csv(&path, situation)?);
    }
    info!(
        draft = draft.len(),
        performance = performance.len(),
        dir = %dir.display(),
        "loaded source files"
    );
    Ok(SourceData { draft, performance })
}

pub fn read_draft_csv(path: &Path) -> Result<Vec<RawDraftRow>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_draft(file).with_context(|| format!("read draft rows from {}", path.display()))
}

pub fn read_draft<R: Read>(rdr: R) -> Result<Vec<RawDraftRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut out = Vec::new();
    for row in reader.deserialize::<RawDraftRow>() {
        out.push(row.context("decode draft row")?);
    }
    Ok(out)
}

pub fn read_performance_csv(path: &Path, situation: Situation) -> Result<Vec<RawPerformanceRow>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    read_performance(file, situation)
        .with_context(|| format!("read performance rows from {}", path.display()))
}

/// Corsica layout: `Player`, `Season`, `Position` plus statistic columns.
/// A `Situation` column, when present, overrides the file-level tag.
pub fn read_performance<R: Read>(rdr: R, situation: Situation) -> Result<Vec<RawPerformanceRow>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let headers = reader.headers().context("read header row")?.clone();

    let find = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let name_idx = find(&["Player", "name"]).context("missing Player column")?;
    let season_idx = find(&["Season"]).context("missing Season column")?;
    let position_idx = find(&["Position", "Pos"]).context("missing Position column")?;
    let situation_idx = find(&["Situation", "Strength"]);

    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.context("decode performance row")?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();
        let values = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| ![name_idx, season_idx, position_idx].contains(idx) && Some(*idx) != situation_idx)
            .map(|(idx, h)| (h.to_string(), cell(idx)))
            .collect();
        out.push(RawPerformanceRow {
            name: cell(name_idx),
            position: cell(position_idx),
            season: cell(season_idx),
            situation: situation_idx
                .map(cell)
                .unwrap_or_else(|| situation.tag().to_string()),
            values,
        });
    }
    Ok(out)
}

/// Published table layout: name, season (when any row has one), positions,
/// statistic columns, draft columns.
pub fn write_combined<W: Write>(wtr: W, records: &[CombinedRecord], stats: &[Stat]) -> Result<()> {
    let with_season = records.iter().any(|r| r.season.is_some());
    let mut writer = csv::Writer::from_writer(wtr);

    let mut header = vec!["name".to_string()];
    if with_season {
        header.push("season".to_string());
    }
    header.push("positions".to_string());
    header.extend(stats.iter().map(|s| s.label().to_string()));
    header.extend(["avg_pick", "avg_round", "pct_drafted"].map(String::from));
    writer.write_record(&header)?;

    for r in records {
        let mut row = vec![r.key.to_string()];
        if with_season {
            row.push(r.season.as_ref().map(|s| s.to_string()).unwrap_or_default());
        }
        row.push(r.positions.to_string());
        row.extend(stats.iter().map(|s| r.stats.get(*s).map(format_value).unwrap_or_default()));
        row.push(format_value(r.avg_pick));
        row.push(format_value(r.avg_round));
        row.push(format_value(r.pct_drafted));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_ranking<W: Write>(wtr: W, ranking: &Ranking) -> Result<()> {
    let mut writer = csv::Writer::from_writer(wtr);

    let mut header = vec!["rank".to_string(), "name".to_string(), "positions".to_string(), "value".to_string()];
    header.extend(ranking.stats.iter().map(|s| format!("z_{}", s.label())));
    header.extend(["avg_pick", "avg_round", "pct_drafted"].map(String::from));
    writer.write_record(&header)?;

    for (idx, r) in ranking.records.iter().enumerate() {
        let mut row = vec![
            (idx + 1).to_string(),
            r.record.key.to_string(),
            r.record.positions.to_string(),
            format_value(r.value),
        ];
        row.extend(
            ranking
                .stats
                .iter()
                .map(|s| r.standardized.get(s).copied().map(format_value).unwrap_or_default()),
        );
        row.push(format_value(r.record.avg_pick));
        row.push(format_value(r.record.avg_round));
        row.push(format_value(r.record.pct_drafted));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_combined_csv(path: &Path, records: &[CombinedRecord], stats: &[Stat]) -> Result<()> {
    let file = create_with_parent(path)?;
    write_combined(file, records, stats).with_context(|| format!("write {}", path.display()))
}

pub fn write_ranking_csv(path: &Path, ranking: &Ranking) -> Result<()> {
    let file = create_with_parent(path)?;
    write_ranking(file, ranking).with_context(|| format!("write {}", path.display()))
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(manifest).context("serialize run manifest")?;
    fs::write(&tmp, json).context("write run manifest")?;
    fs::rename(&tmp, path).context("swap run manifest")?;
    Ok(())
}

fn create_with_parent(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("create {}", path.display()))
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn performance_reader_keeps_stat_columns() {
        let raw = "\
Player,Season,Position,GP,TOI,G,iSF
SIDNEY.CROSBY,20152016,C,80,1600.5,36,248
";
        let rows = read_performance(raw.as_bytes(), Situation::FiveOnFour).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "SIDNEY.CROSBY");
        assert_eq!(rows[0].situation, "5v4");
        assert_eq!(rows[0].values.len(), 4);
        assert_eq!(rows[0].values[3], ("iSF".to_string(), "248".to_string()));
    }

    #[test]
    fn format_value_drops_trailing_zeros_for_integers() {
        assert_eq!(format_value(12.0), "12");
        assert_eq!(format_value(8.25), "8.2500");
    }
}
