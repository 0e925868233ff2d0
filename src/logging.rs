//! Diagnostics setup
//!
//! Everything goes to stderr so the result table on stdout stays clean.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Map the `-v` count to a default level
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `-v` when set.
/// Calling this twice is harmless; the second call is ignored.
pub fn init(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "imdb_sieve={}",
            level_for_verbosity(verbose).as_str().to_ascii_lowercase()
        ))
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_names(verbose >= 2)
        .try_init();
}
