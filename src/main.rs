use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use tracing::info;

use hockey_value::csv_io::{self, RunManifest};
use hockey_value::identity::Position;
use hockey_value::ranking::{self, RankRequest};
use hockey_value::stats::Stat;
use hockey_value::{Pipeline, ValuationConfig, logging};

const DEFAULT_DATA_DIR: &str = "data";
const TOP_ROWS: usize = 25;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    logging::init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let data_dir = parse_path_arg(&args, "--data")
        .or_else(|| env_path("HOCKEY_VALUE_DATA_DIR"))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let out_dir = parse_path_arg(&args, "--out").unwrap_or_else(|| data_dir.clone());

    let config = match parse_path_arg(&args, "--config").or_else(|| env_path("HOCKEY_VALUE_CONFIG")) {
        Some(path) => ValuationConfig::load(&path)?,
        None => ValuationConfig::builtin().clone(),
    };

    let sources = csv_io::load_data_dir(&data_dir)?;
    let pipeline = Pipeline::new(config);
    let output = pipeline
        .run(&sources.draft, &sources.performance)
        .context("valuation pipeline failed")?;

    let cfg = pipeline.config();
    csv_io::write_combined_csv(
        &out_dir.join(csv_io::UNPROJECTED_FILE),
        &output.unprojected,
        &cfg.stats,
    )?;
    csv_io::write_combined_csv(
        &out_dir.join(csv_io::PROJECTED_FILE),
        &output.projected,
        &cfg.summable_stats(),
    )?;

    let mut manifest = RunManifest::new(output.unprojected.len(), output.projected.len(), cfg);

    if let Some(replacement_rank) = parse_usize_arg(&args, "--rank")? {
        let pool = match parse_string_arg(&args, "--position") {
            Some(raw) => {
                let position =
                    Position::parse(&raw).ok_or_else(|| anyhow!("unknown position {raw:?}"))?;
                ranking::filter_positions(&output.projected, position)
            }
            None => output.projected.clone(),
        };
        let stats = match parse_string_arg(&args, "--stats") {
            Some(raw) => parse_stat_list(&raw)?,
            None => ranking::informative_stats(&pool, &cfg.summable_stats()),
        };

        let ranked = pipeline
            .rank(&pool, &RankRequest::new(replacement_rank, stats))
            .context("ranking failed")?;
        csv_io::write_ranking_csv(&out_dir.join(csv_io::RANKING_FILE), &ranked)?;

        println!("rank  value    player (positions)");
        for (idx, r) in ranked.records.iter().take(TOP_ROWS).enumerate() {
            println!(
                "{:>4}  {:>7.3}  {} ({})",
                idx + 1,
                r.value,
                r.record.key,
                r.record.positions
            );
        }
        manifest.ranked_rows = Some(ranked.records.len());
        manifest.replacement_rank = Some(replacement_rank);
    }

    csv_io::write_manifest(&out_dir.join(csv_io::MANIFEST_FILE), &manifest)?;
    info!(out = %out_dir.display(), "tables written");
    Ok(())
}

fn parse_stat_list(raw: &str) -> Result<Vec<Stat>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Stat::from_label(s).ok_or_else(|| anyhow!("unknown statistic {s:?}")))
        .collect()
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_path_arg(args: &[String], name: &str) -> Option<PathBuf> {
    parse_string_arg(args, name).map(PathBuf::from)
}

/// `Ok(None)` when the flag is absent; an unparseable value is an error.
fn parse_usize_arg(args: &[String], name: &str) -> Result<Option<usize>> {
    let Some(raw) = parse_string_arg(args, name) else {
        if args.iter().any(|a| a == name || a.starts_with(&format!("{name}="))) {
            return Err(anyhow!("{name} requires a value"));
        }
        return Ok(None);
    };
    raw.parse::<usize>()
        .map(Some)
        .with_context(|| format!("{name} expects a non-negative integer, got {raw:?}"))
}

fn parse_string_arg(args: &[String], name: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn rank_flag_accepts_both_forms() {
        assert_eq!(parse_usize_arg(&args(&["--rank", "150"]), "--rank").unwrap(), Some(150));
        assert_eq!(parse_usize_arg(&args(&["--rank=24"]), "--rank").unwrap(), Some(24));
        assert_eq!(parse_usize_arg(&args(&["--data", "x"]), "--rank").unwrap(), None);
    }

    #[test]
    fn malformed_rank_flag_is_an_error() {
        assert!(parse_usize_arg(&args(&["--rank", "abc"]), "--rank").is_err());
        assert!(parse_usize_arg(&args(&["--rank=-3"]), "--rank").is_err());
        assert!(parse_usize_arg(&args(&["--rank"]), "--rank").is_err());
        assert!(parse_usize_arg(&args(&["--rank="]), "--rank").is_err());
    }

    #[test]
    fn stat_list_rejects_unknown_labels() {
        assert_eq!(
            parse_stat_list("G, a,PPP").unwrap(),
            vec![Stat::Goals, Stat::Assists, Stat::PpPoints]
        );
        assert!(parse_stat_list("G,XYZ").is_err());
    }
}
