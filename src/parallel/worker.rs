//! Worker thread for the streaming pipeline
//!
//! Every worker waits on three sources at once: the cancellation signal, the
//! data-unit queue and the read-token slot. Holding the token means reading
//! the next chunk; receiving a data unit means filtering and enriching its
//! lines.

use crossbeam_channel::{select, TrySendError};
use std::thread;

use crate::cancel::CancelReason;
use crate::chunking::{DataUnit, ReadOutcome, ReadToken};
use crate::enrich::Enrichment;
use crate::record::{Column, Record};
use crate::results::{ResultRow, RowOrigin};
use crate::stats::{
    stats_add_line_matched, stats_add_line_seen, stats_add_line_short, stats_add_row_stored,
    take_thread_stats, ProcessingStats,
};

use super::types::WorkerContext;

/// Worker thread: runs until the cancellation signal is observed
pub(crate) fn worker_thread(worker_id: usize, ctx: WorkerContext) -> ProcessingStats {
    let watch = ctx.cancel.watch();

    'worker_loop: loop {
        if ctx.cancel.is_raised() {
            break;
        }

        select! {
            recv(watch) -> _ => break 'worker_loop,
            recv(ctx.data_receiver) -> msg => match msg {
                Ok(unit) => process_unit(&ctx, unit),
                Err(_) => break 'worker_loop,
            },
            recv(ctx.token_receiver) -> msg => match msg {
                Ok(token) => handle_token(&ctx, token),
                Err(_) => break 'worker_loop,
            },
        }
    }

    if ctx.cancel.reason().is_some_and(|reason| reason.drains_queue()) {
        drain_queue(&ctx);
    }

    ctx.cancel.acknowledge();
    tracing::trace!(worker_id, "worker exiting");

    take_thread_stats()
}

/// Read one chunk as the token holder, queue the completed lines and pass the
/// token on. At end of stream the token is retired instead.
fn handle_token(ctx: &WorkerContext, mut token: ReadToken) {
    if ctx.cancel.is_raised() {
        return;
    }

    match ctx.source.read(&mut token) {
        Ok(ReadOutcome::Data(unit)) => {
            // Queue before reposting so units stay in stream order and a full
            // queue holds the token back
            if enqueue(ctx, unit) {
                repost(ctx, token);
            }
        }
        Ok(ReadOutcome::Carried) | Ok(ReadOutcome::Retry) => repost(ctx, token),
        Ok(ReadOutcome::EndOfStream) => {
            if let Some(unit) = token.finish() {
                tracing::debug!(bytes = unit.len(), "flushing unterminated final line");
                enqueue(ctx, unit);
            }
            ctx.cancel.raise(CancelReason::EndOfStream);
        }
        Err(e) => {
            tracing::error!(error = %e, "reading input stream failed");
            ctx.cancel.raise(CancelReason::SourceFailed(e.to_string()));
        }
    }
}

fn repost(ctx: &WorkerContext, token: ReadToken) {
    // Single token, single slot: this never blocks
    if ctx.token_sender.send(token).is_err() {
        tracing::warn!("read token slot closed");
    }
}

/// Push a unit onto the bounded queue. While the queue is full the holder
/// processes a queued unit itself, so even a one-worker pool makes progress.
/// Returns `false` if the unit was abandoned because of cancellation.
fn enqueue(ctx: &WorkerContext, mut unit: DataUnit) -> bool {
    loop {
        match ctx.data_sender.try_send(unit) {
            Ok(()) => return true,
            Err(TrySendError::Full(back)) => {
                unit = back;
                if ctx.cancel.is_raised() {
                    return false;
                }
                match ctx.data_receiver.try_recv() {
                    Ok(queued) => process_unit(ctx, queued),
                    Err(_) => thread::yield_now(),
                }
            }
            Err(TrySendError::Disconnected(_)) => return false,
        }
    }
}

/// Finish whatever is still queued after end of stream
fn drain_queue(ctx: &WorkerContext) {
    while let Ok(unit) = ctx.data_receiver.try_recv() {
        process_unit(ctx, unit);
    }
}

/// Filter, enrich and store every line of one data unit.
pub(crate) fn process_unit(ctx: &WorkerContext, unit: DataUnit) {
    let required = ctx.filters.required_fields();

    for (index, raw) in unit.lines().enumerate() {
        stats_add_line_seen();

        let line = String::from_utf8_lossy(raw);
        let record = Record::parse(&line);
        if record.len() < required {
            stats_add_line_short();
            continue;
        }

        let (Some(id), Some(title)) = (record.id(), record.title()) else {
            stats_add_line_short();
            continue;
        };
        // Dataset header row
        if id == Column::Id.name() {
            continue;
        }

        if !ctx.filters.matches(&record) {
            continue;
        }
        stats_add_line_matched();

        if let Enrichment::Keep(text) = ctx.enricher.enrich(id) {
            let origin = RowOrigin {
                unit: unit.seq(),
                line: index,
            };
            ctx.store.append(ResultRow::new(id, title, text, origin));
            stats_add_row_stored();
        }
    }
}
