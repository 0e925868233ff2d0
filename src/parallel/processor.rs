//! Main pipeline processor
//!
//! Contains the Pipeline struct that wires the chunk source, the worker pool,
//! the timer and the result store together and joins them again.

use anyhow::{anyhow, Result};
use crossbeam_channel::bounded;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::cancel::{CancelReason, Cancellation};
use crate::chunking::{ChunkSource, ReadToken};
use crate::decompression::DecodedStream;
use crate::enrich::Enricher;
use crate::record::FilterSet;
use crate::results::ResultStore;
use crate::stats::ProcessingStats;

use super::types::{PipelineOutcome, PoolConfig, WorkerContext};
use super::worker::worker_thread;

/// Streaming filter/enrich pipeline over one decompressed input
pub struct Pipeline {
    config: PoolConfig,
    filters: FilterSet,
    enricher: Enricher,
}

impl Pipeline {
    pub fn new(config: PoolConfig, filters: FilterSet, enricher: Enricher) -> Self {
        Self {
            config,
            filters,
            enricher,
        }
    }

    /// Run the pool over `stream` until end of stream, timeout or an external
    /// raise of `cancel`, then return every row stored so far.
    pub fn run(self, stream: DecodedStream, cancel: Cancellation) -> Result<PipelineOutcome> {
        let started = Instant::now();
        let workers = self.config.workers.max(1);
        let queue_capacity = self.config.queue_capacity.max(1);

        let store = Arc::new(ResultStore::new());
        let (token_sender, token_receiver) = bounded(1);
        let (data_sender, data_receiver) = bounded(queue_capacity);

        let ctx = WorkerContext {
            source: Arc::new(ChunkSource::new(stream, self.config.chunk_size)),
            filters: Arc::new(self.filters),
            enricher: Arc::new(self.enricher),
            store: Arc::clone(&store),
            cancel: cancel.clone(),
            token_sender,
            token_receiver,
            data_sender,
            data_receiver,
        };

        tracing::info!(
            workers,
            chunk_size = ctx.source.chunk_size(),
            queue_capacity,
            budget = ctx.enricher.budget().limit(),
            filters = ctx.filters.filters().len(),
            "starting pipeline"
        );

        let timer_handle = self.config.max_run.map(|max_run| cancel.arm_timer(max_run));

        let mut worker_handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let worker_ctx = ctx.clone();
            let spawned = thread::Builder::new()
                .name(format!("sieve-worker-{}", worker_id))
                .spawn(move || worker_thread(worker_id, worker_ctx));
            match spawned {
                Ok(handle) => worker_handles.push(handle),
                Err(e) => {
                    cancel.raise(CancelReason::SourceFailed(format!(
                        "could not start worker {}: {}",
                        worker_id, e
                    )));
                    break;
                }
            }
        }

        // The one and only read token
        if !cancel.is_raised() {
            ctx.token_sender
                .send(ReadToken::new())
                .map_err(|_| anyhow!("read token slot closed before start"))?;
        }
        drop(ctx);

        let mut stats = ProcessingStats::default();
        let mut panicked = 0;
        for handle in worker_handles {
            match handle.join() {
                Ok(worker_stats) => stats.merge(&worker_stats),
                Err(_) => panicked += 1,
            }
        }
        cancel.mark_stopped();

        if let Some(handle) = timer_handle {
            let _ = handle.join();
        }

        if panicked > 0 {
            return Err(anyhow!("{} worker thread(s) panicked", panicked));
        }

        let reason = cancel.reason().unwrap_or(CancelReason::EndOfStream);
        let rows = match Arc::try_unwrap(store) {
            Ok(store) => store.into_rows(),
            Err(shared) => shared.snapshot(),
        };
        stats.finish(started);

        tracing::info!(%reason, rows = rows.len(), "pipeline stopped");

        Ok(PipelineOutcome {
            rows,
            reason,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Column, Filter};
    use std::io::Cursor;

    fn run(input: &[u8], config: PoolConfig, filters: FilterSet) -> PipelineOutcome {
        Pipeline::new(config, filters, Enricher::disabled())
            .run(Box::new(Cursor::new(input.to_vec())), Cancellation::new())
            .unwrap()
    }

    #[test]
    fn test_movie_filter_scenario() {
        let input =
            b"tt1\tmovie\tA\tA\t\\N\t2000\t\\N\t90\tDrama\ntt2\tshort\tB\tB\t\\N\t1999\t\\N\t10\tComedy\n";
        let config = PoolConfig {
            workers: 4,
            chunk_size: 8,
            queue_capacity: 2,
            max_run: None,
        };
        let outcome = run(
            input,
            config,
            FilterSet::new(vec![Filter::new(Column::TitleType, "movie")]),
        );

        assert_eq!(outcome.reason, CancelReason::EndOfStream);
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].id, "tt1");
        assert_eq!(outcome.rows[0].title, "A");
        assert_eq!(outcome.rows[0].text, "");
        assert_eq!(outcome.stats.bytes_read, input.len());
    }

    #[test]
    fn test_empty_input_stops_cleanly() {
        let outcome = run(b"", PoolConfig::default(), FilterSet::default());
        assert_eq!(outcome.reason, CancelReason::EndOfStream);
        assert!(outcome.rows.is_empty());
    }

    #[test]
    fn test_cancel_raised_before_run() {
        let cancel = Cancellation::new();
        cancel.raise(CancelReason::Interrupted(15));
        let outcome = Pipeline::new(PoolConfig::default(), FilterSet::default(), Enricher::disabled())
            .run(Box::new(Cursor::new(b"tt1\tmovie\tA\n".to_vec())), cancel.clone())
            .unwrap();

        assert_eq!(outcome.reason, CancelReason::Interrupted(15));
        assert!(outcome.rows.is_empty());
        assert_eq!(cancel.state(1), crate::cancel::CancelState::Stopped);
    }

    #[test]
    fn test_zero_workers_is_treated_as_one() {
        let config = PoolConfig {
            workers: 0,
            chunk_size: 3,
            queue_capacity: 0,
            max_run: None,
        };
        let outcome = run(b"tt1\tmovie\tA\ntt2\tshort\tB\n", config, FilterSet::default());
        assert_eq!(outcome.rows.len(), 2);
    }
}
