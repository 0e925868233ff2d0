//! Bounded worker pool for the streaming pipeline
//!
//! # Module Structure
//!
//! - `types`: pool configuration, shared worker state and the final outcome
//! - `worker`: the worker loop, token handling and per-line processing
//! - `processor`: `Pipeline`, which spawns, feeds and joins the workers

mod processor;
mod types;
mod worker;

pub use processor::Pipeline;
pub use types::{default_worker_count, PipelineOutcome, PoolConfig, DEFAULT_QUEUE_CAPACITY};
