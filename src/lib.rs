// Core library for the imdb-sieve title filter

pub mod cancel;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod decompression;
pub mod enrich;
pub mod logging;
pub mod parallel;
pub mod platform;
pub mod record;
pub mod report;
pub mod results;
pub mod stats;

pub use cancel::{CancelReason, CancelState, Cancellation};
pub use chunking::{ChunkSource, DataUnit, ReadOutcome, ReadToken};
pub use cli::Cli;
pub use config::SieveConfig;
pub use enrich::{Budget, Enricher, Enrichment, Lookup, OmdbClient};
pub use parallel::{Pipeline, PipelineOutcome, PoolConfig};
pub use record::{Column, Filter, FilterSet, Record};
pub use results::{ResultRow, ResultStore, RowOrigin};
pub use stats::ProcessingStats;
