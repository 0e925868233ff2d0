//! Type definitions for the worker pool
//!
//! Contains the pool configuration, the state shared by every worker and the
//! outcome handed back once the pool has joined.

use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::{CancelReason, Cancellation};
use crate::chunking::{ChunkSource, DataUnit, ReadToken, DEFAULT_CHUNK_SIZE};
use crate::enrich::Enricher;
use crate::record::FilterSet;
use crate::results::{ResultRow, ResultStore};
use crate::stats::ProcessingStats;

pub const DEFAULT_QUEUE_CAPACITY: usize = 128;

/// Workers spend most of their time blocked on lookups, so the automatic pool
/// size is a multiple of the CPU count.
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1) * 4
}

/// Configuration for the worker pool
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub chunk_size: usize,
    /// Bound of the data-unit queue; a full queue throttles reading
    pub queue_capacity: usize,
    pub max_run: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: default_worker_count(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_run: None,
        }
    }
}

/// Everything a worker shares with the rest of the pool
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub source: Arc<ChunkSource>,
    pub filters: Arc<FilterSet>,
    pub enricher: Arc<Enricher>,
    pub store: Arc<ResultStore>,
    pub cancel: Cancellation,
    pub token_sender: Sender<ReadToken>,
    pub token_receiver: Receiver<ReadToken>,
    pub data_sender: Sender<DataUnit>,
    pub data_receiver: Receiver<DataUnit>,
}

/// What a finished pipeline hands to the reporting layer
#[derive(Debug)]
pub struct PipelineOutcome {
    pub rows: Vec<ResultRow>,
    pub reason: CancelReason,
    pub stats: ProcessingStats,
}
