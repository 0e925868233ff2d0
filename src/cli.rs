use clap::Parser;

// CLI structure - contains all command-line arguments and options
#[derive(Parser, Debug, Clone)]
#[command(name = "imdb-sieve")]
#[command(about = "Stream the IMDb title.basics dataset, filter titles by column and enrich them with plots")]
#[command(
    long_about = "Stream the IMDb title.basics dataset, filter titles by column and enrich them with plots\n\nThe input is read in chunks by a pool of workers; matching titles can be looked up on OMDb\n(at most --max-requests lookups). The run stops at end of input, after --max-run-time, or on\nSIGINT/SIGTERM, and whatever was found so far is printed.\n\nCOMMON EXAMPLES:\n  imdb-sieve --title-type movie --start-year 1994\n  imdb-sieve --genres Documentary,Short --max-requests 20 --plot-filter '(?i)train'\n  imdb-sieve -i title.basics.tsv.gz --title-type short --max-run-time 30s --ordered"
)]
#[command(version)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Path to the (gzip or zstd compressed) title.basics.tsv file
    #[arg(
        short = 'i',
        long = "file-path",
        alias = "filePath",
        default_value = "./title.basics.tsv.gz",
        help_heading = "Input Options"
    )]
    pub file_path: String,

    /// Keep titles whose titleType equals this value
    #[arg(long = "title-type", alias = "titleType", help_heading = "Filters")]
    pub title_type: Option<String>,

    /// Keep titles whose primaryTitle equals this value
    #[arg(long = "primary-title", alias = "primaryTitle", help_heading = "Filters")]
    pub primary_title: Option<String>,

    /// Keep titles whose originalTitle equals this value
    #[arg(long = "original-title", alias = "originalTitle", help_heading = "Filters")]
    pub original_title: Option<String>,

    /// Keep titles whose startYear equals this value
    #[arg(long = "start-year", alias = "startYear", help_heading = "Filters")]
    pub start_year: Option<String>,

    /// Keep titles whose endYear equals this value
    #[arg(long = "end-year", alias = "endYear", help_heading = "Filters")]
    pub end_year: Option<String>,

    /// Keep titles whose runtimeMinutes equals this value
    #[arg(long = "runtime-minutes", alias = "runtimeMinutes", help_heading = "Filters")]
    pub runtime_minutes: Option<String>,

    /// Keep titles whose genres column equals this value (e.g. "Comedy,Drama")
    #[arg(long = "genres", help_heading = "Filters")]
    pub genres: Option<String>,

    /// Maximum number of plot lookups (0 disables enrichment)
    #[arg(
        long = "max-requests",
        alias = "maxRequests",
        default_value_t = 0,
        help_heading = "Enrichment"
    )]
    pub max_requests: u64,

    /// Same as --max-requests; takes precedence when non-zero
    #[arg(long = "max-api-requests", alias = "maxApiRequests", help_heading = "Enrichment")]
    pub max_api_requests: Option<u64>,

    /// Regex the looked-up plot must match for a title to be reported
    #[arg(long = "plot-filter", alias = "plotFilter", help_heading = "Enrichment")]
    pub plot_filter: Option<String>,

    /// OMDb API key
    #[arg(long = "api-key", env = "OMDB_API_KEY", hide_env_values = true, help_heading = "Enrichment")]
    pub api_key: Option<String>,

    /// Base URL of the lookup service
    #[arg(long = "api-url", default_value = crate::enrich::DEFAULT_API_URL, help_heading = "Enrichment")]
    pub api_url: String,

    /// Transport timeout for a single lookup (e.g. "10s", "500ms")
    #[arg(long = "lookup-timeout", default_value = "10s", help_heading = "Enrichment")]
    pub lookup_timeout: String,

    /// Maximum run time before shutting down with partial results (e.g. "10m", "1h 30m")
    #[arg(
        long = "max-run-time",
        alias = "maxRunTime",
        default_value = "10m",
        help_heading = "Performance"
    )]
    pub max_run_time: String,

    /// Number of worker threads (0 = 4 per CPU)
    #[arg(short = 'w', long = "workers", default_value_t = 0, help_heading = "Performance")]
    pub workers: usize,

    /// Bytes pulled from the decompressed stream per read
    #[arg(long = "chunk-size", default_value_t = crate::chunking::DEFAULT_CHUNK_SIZE, help_heading = "Performance")]
    pub chunk_size: usize,

    /// Data units buffered between the reader and the workers
    #[arg(long = "queue-capacity", default_value_t = crate::parallel::DEFAULT_QUEUE_CAPACITY, help_heading = "Performance")]
    pub queue_capacity: usize,

    /// Print rows in input order instead of completion order
    #[arg(long = "ordered", help_heading = "Output Options")]
    pub ordered: bool,

    /// Print processing statistics to stderr when done
    #[arg(short = 's', long = "stats", help_heading = "Output Options")]
    pub stats: bool,

    /// Increase diagnostic output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Output Options")]
    pub verbose: u8,
}

impl Cli {
    /// Effective lookup budget; a non-zero `--max-api-requests` wins over
    /// `--max-requests`
    pub fn request_budget(&self) -> u64 {
        self.max_api_requests
            .filter(|&n| n != 0)
            .unwrap_or(self.max_requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["imdb-sieve"]).unwrap();
        assert_eq!(cli.file_path, "./title.basics.tsv.gz");
        assert_eq!(cli.max_run_time, "10m");
        assert_eq!(cli.request_budget(), 0);
        assert_eq!(cli.chunk_size, 8192);
        assert_eq!(cli.queue_capacity, 128);
        assert!(!cli.ordered);
    }

    #[test]
    fn test_original_flag_spellings_are_accepted() {
        let cli = Cli::try_parse_from([
            "imdb-sieve",
            "--filePath",
            "/data/t.tsv.gz",
            "--titleType",
            "movie",
            "--maxRunTime",
            "30s",
        ])
        .unwrap();
        assert_eq!(cli.file_path, "/data/t.tsv.gz");
        assert_eq!(cli.title_type.as_deref(), Some("movie"));
        assert_eq!(cli.max_run_time, "30s");
    }

    #[test]
    fn test_api_requests_spelling_takes_precedence() {
        let cli = Cli::try_parse_from([
            "imdb-sieve",
            "--max-requests",
            "5",
            "--max-api-requests",
            "7",
        ])
        .unwrap();
        assert_eq!(cli.request_budget(), 7);

        let cli = Cli::try_parse_from(["imdb-sieve", "--max-requests", "5"]).unwrap();
        assert_eq!(cli.request_budget(), 5);

        // Zero means "not given", as in the dataset tool
        let cli = Cli::try_parse_from([
            "imdb-sieve",
            "--max-api-requests",
            "0",
            "--max-requests",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.request_budget(), 5);
    }

    #[test]
    fn test_verbose_counts() {
        let cli = Cli::try_parse_from(["imdb-sieve", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
