use thiserror::Error;

use crate::stats::Stat;

pub type Result<T> = std::result::Result<T, ValuationError>;

/// Which input a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Draft,
    Performance,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Draft => f.write_str("draft"),
            Source::Performance => f.write_str("performance"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ValuationError {
    #[error("{origin} row {row}: column '{column}' is not numeric: {value:?}")]
    MalformedRow {
        origin: Source,
        row: usize,
        column: String,
        value: String,
    },

    #[error("performance row {row}: unknown situation tag {value:?}")]
    UnknownSituation { row: usize, value: String },

    #[error("duplicate {origin} key after name normalization: {key} (add a name override)")]
    DuplicateKey { origin: Source, key: String },

    #[error("no season weight configured for season {season} (player {key})")]
    UnknownSeason { key: String, season: String },

    #[error("statistic {stat} has zero variance after baseline subtraction")]
    DegenerateStat { stat: Stat },

    #[error("replacement rank {rank} out of range for {rows} rows")]
    ReplacementRank { rank: usize, rows: usize },

    #[error("record {key} is missing ranked statistic {stat}")]
    MissingStat { key: String, stat: Stat },

    #[error("no statistics selected for ranking")]
    EmptyStatSet,

    #[error("invalid configuration: {0}")]
    Config(String),
}
