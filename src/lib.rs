pub mod aggregate;
pub mod config;
pub mod csv_io;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod ranking;
pub mod reconcile;
pub mod stats;

pub use config::ValuationConfig;
pub use error::ValuationError;
pub use pipeline::{Pipeline, PipelineOutput};
