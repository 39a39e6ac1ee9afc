use tracing::info;

use crate::aggregate::{self, PerformanceRow};
use crate::config::ValuationConfig;
use crate::error::Result;
use crate::ingest::{self, RawDraftRow, RawPerformanceRow};
use crate::ranking::{self, RankRequest, Ranking};
use crate::reconcile::{self, CombinedRecord};

/// The two published tables of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// One row per player, position and season.
    pub unprojected: Vec<CombinedRecord>,
    /// One recency-weighted row per player and position.
    pub projected: Vec<CombinedRecord>,
}

pub struct Pipeline {
    config: ValuationConfig,
}

impl Pipeline {
    pub fn new(config: ValuationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    /// Normalize, aggregate and join both sources. Ranking is left to [`Pipeline::rank`].
    pub fn run(&self, draft_rows: &[RawDraftRow], performance_rows: &[RawPerformanceRow]) -> Result<PipelineOutput> {
        self.config.validate()?;

        let draft = ingest::parse_draft_rows(draft_rows, &self.config)?;
        let splits = ingest::parse_performance_rows(performance_rows, &self.config)?;

        let per_season = aggregate::merge_power_play(&splits, &self.config);
        let unprojected_rows: Vec<PerformanceRow> = aggregate::season_rows(&per_season);
        let projected_rows = aggregate::project_seasons(&per_season, &self.config)?;

        let unprojected = reconcile::reconcile(&unprojected_rows, &draft)?;
        let projected = reconcile::reconcile(&projected_rows, &draft)?;

        info!(
            unprojected = unprojected.len(),
            projected = projected.len(),
            "pipeline complete"
        );
        Ok(PipelineOutput {
            unprojected,
            projected,
        })
    }

    pub fn rank(&self, records: &[CombinedRecord], request: &RankRequest) -> Result<Ranking> {
        ranking::rank(records, request)
    }

    /// Rank on the configured summable statistics.
    pub fn rank_all(&self, records: &[CombinedRecord], replacement_rank: usize) -> Result<Ranking> {
        ranking::rank(records, &RankRequest::all_stats(replacement_rank, &self.config))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(ValuationConfig::builtin().clone())
    }
}
