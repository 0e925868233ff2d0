use anyhow::{Context, Result};
use clap::Parser;

use imdb_sieve::cancel::{CancelReason, Cancellation};
use imdb_sieve::cli::Cli;
use imdb_sieve::config::SieveConfig;
use imdb_sieve::decompression;
use imdb_sieve::logging;
use imdb_sieve::parallel::Pipeline;
use imdb_sieve::platform::{ExitCode, SafeStdout, SignalHandler};
use imdb_sieve::report;
use imdb_sieve::results::sort_by_origin;

fn main() {
    // clap prints usage errors itself and exits 2 (0 for --help/--version)
    let cli = Cli::try_parse().unwrap_or_else(|e| e.exit());

    logging::init(cli.verbose);

    match run(&cli) {
        Ok(code) => code.exit(),
        Err(e) => {
            eprintln!("imdb-sieve: {:#}", e);
            ExitCode::GeneralError.exit();
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let config = SieveConfig::from_cli(cli)?;
    let stream = decompression::open(&config.input.path)?;

    let cancel = Cancellation::new();
    let _signal_handler =
        SignalHandler::new(cancel.clone()).context("failed to initialise signal handling")?;

    let pipeline = Pipeline::new(
        config.pool_config(),
        config.filtering.clone(),
        config.build_enricher(),
    );
    let outcome = pipeline.run(stream, cancel)?;

    let mut rows = outcome.rows;
    if config.output.ordered {
        sort_by_origin(&mut rows);
    }

    // Partial results are printed whatever stopped the run
    let mut stdout = SafeStdout::new();
    report::render(&rows, &mut stdout).context("failed to write report")?;
    stdout.flush()?;

    if config.output.stats {
        eprintln!("{}", outcome.stats.format_stats());
    }

    match &outcome.reason {
        CancelReason::SourceFailed(message) => {
            eprintln!("imdb-sieve: input stopped early: {}", message);
        }
        CancelReason::Timeout => {
            tracing::info!(
                max_run = ?config.performance.max_run,
                "maximum run time reached, results are partial"
            );
        }
        _ => {}
    }

    Ok(ExitCode::for_reason(&outcome.reason))
}
