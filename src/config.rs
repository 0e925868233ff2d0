use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::cli::Cli;
use crate::enrich::{Budget, Enricher, Lookup, OmdbClient};
use crate::parallel::{default_worker_count, PoolConfig};
use crate::record::{Column, Filter, FilterSet};

/// Main configuration struct, validated before the pipeline starts
#[derive(Debug, Clone)]
pub struct SieveConfig {
    pub input: InputConfig,
    pub filtering: FilterSet,
    pub enrichment: EnrichmentConfig,
    pub performance: PerformanceConfig,
    pub output: OutputConfig,
}

/// Input configuration
#[derive(Debug, Clone)]
pub struct InputConfig {
    pub path: PathBuf,
}

/// Lookup configuration
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub budget: u64,
    pub plot_filter: Option<Regex>,
    pub api_key: Option<String>,
    pub api_url: String,
    pub lookup_timeout: Duration,
}

/// Performance configuration
#[derive(Debug, Clone)]
pub struct PerformanceConfig {
    /// 0 selects the automatic pool size
    pub workers: usize,
    pub chunk_size: usize,
    pub queue_capacity: usize,
    pub max_run: Duration,
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub ordered: bool,
    pub stats: bool,
}

impl SieveConfig {
    /// Create configuration from CLI arguments, rejecting invalid durations,
    /// patterns and sizes.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let max_run = parse_duration(&cli.max_run_time)
            .with_context(|| format!("invalid --max-run-time '{}'", cli.max_run_time))?;
        let lookup_timeout = parse_duration(&cli.lookup_timeout)
            .with_context(|| format!("invalid --lookup-timeout '{}'", cli.lookup_timeout))?;

        let plot_filter = cli
            .plot_filter
            .as_deref()
            .filter(|pattern| !pattern.is_empty())
            .map(Regex::new)
            .transpose()
            .context("invalid --plot-filter pattern")?;

        if cli.chunk_size == 0 {
            return Err(anyhow!("--chunk-size must be at least 1"));
        }
        if cli.queue_capacity == 0 {
            return Err(anyhow!("--queue-capacity must be at least 1"));
        }

        let config = Self {
            input: InputConfig {
                path: PathBuf::from(&cli.file_path),
            },
            filtering: filters_from_cli(cli),
            enrichment: EnrichmentConfig {
                budget: cli.request_budget(),
                plot_filter,
                api_key: cli.api_key.clone().filter(|key| !key.is_empty()),
                api_url: cli.api_url.clone(),
                lookup_timeout,
            },
            performance: PerformanceConfig {
                workers: cli.workers,
                chunk_size: cli.chunk_size,
                queue_capacity: cli.queue_capacity,
                max_run,
            },
            output: OutputConfig {
                ordered: cli.ordered,
                stats: cli.stats,
            },
        };
        config.warn_about_suspicious_settings();
        Ok(config)
    }

    fn warn_about_suspicious_settings(&self) {
        let enrichment = &self.enrichment;
        if enrichment.budget == 0 && enrichment.plot_filter.is_some() {
            tracing::warn!(
                "--plot-filter is set but lookups are disabled; only patterns matching empty text will keep titles"
            );
        }
        if enrichment.budget > 0 && enrichment.api_key.is_none() {
            tracing::warn!("lookups enabled without an API key; the service will likely refuse them");
        }
    }

    /// Get effective worker count with defaults
    pub fn effective_workers(&self) -> usize {
        if self.performance.workers == 0 {
            default_worker_count()
        } else {
            self.performance.workers
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            workers: self.effective_workers(),
            chunk_size: self.performance.chunk_size,
            queue_capacity: self.performance.queue_capacity,
            max_run: Some(self.performance.max_run),
        }
    }

    /// Build the enricher; the HTTP client is only created when lookups are
    /// actually allowed.
    pub fn build_enricher(&self) -> Enricher {
        let enrichment = &self.enrichment;
        let lookup = (enrichment.budget > 0).then(|| {
            Arc::new(OmdbClient::new(
                enrichment.api_url.clone(),
                enrichment.api_key.clone(),
                enrichment.lookup_timeout,
            )) as Arc<dyn Lookup>
        });
        Enricher::new(
            Budget::new(enrichment.budget),
            lookup,
            enrichment.plot_filter.clone(),
        )
    }
}

/// Parse a human-readable duration such as "10m", "90s" or "1h 30m"
pub fn parse_duration(text: &str) -> Result<Duration> {
    humantime::parse_duration(text.trim()).map_err(|e| anyhow!("{}", e))
}

/// Column filters in their fixed order; empty values are ignored
pub fn filters_from_cli(cli: &Cli) -> FilterSet {
    let candidates = [
        (Column::TitleType, &cli.title_type),
        (Column::PrimaryTitle, &cli.primary_title),
        (Column::OriginalTitle, &cli.original_title),
        (Column::StartYear, &cli.start_year),
        (Column::EndYear, &cli.end_year),
        (Column::RuntimeMinutes, &cli.runtime_minutes),
        (Column::Genres, &cli.genres),
    ];

    let mut filters = FilterSet::default();
    for (column, value) in candidates {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            filters.push(Filter::new(column, value));
        }
    }
    filters
}
