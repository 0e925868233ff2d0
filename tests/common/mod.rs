// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub const HEADER_LINE: &str =
    "tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres";

/// Path of the binary under test
pub fn sieve_binary() -> &'static str {
    env!("CARGO_BIN_EXE_imdb-sieve")
}

/// One title.basics row
pub fn title_row(id: &str, title_type: &str, title: &str, start_year: &str, genres: &str) -> String {
    format!(
        "{id}\t{title_type}\t{title}\t{title}\t0\t{start_year}\t\\N\t90\t{genres}"
    )
}

/// Write `content` gzip-compressed to `dir/name`
pub fn write_gzip(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).expect("Failed to create fixture");
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(content.as_bytes())
        .expect("Failed to write fixture");
    encoder.finish().expect("Failed to finish gzip fixture");
    path
}

/// Small dataset in the title.basics layout, header row included
pub fn sample_dataset() -> String {
    let rows = [
        HEADER_LINE.to_string(),
        title_row("tt0000001", "short", "Carmencita", "1894", "Documentary,Short"),
        title_row("tt0000002", "movie", "Le clown et ses chiens", "1892", "Animation,Short"),
        title_row("tt0000003", "movie", "Pauvre Pierrot", "1892", "Animation,Comedy,Romance"),
        title_row("tt0000004", "short", "Un bon bock", "1892", "Animation,Short"),
        title_row("tt0000005", "movie", "Blacksmith Scene", "1893", "Comedy,Short"),
    ];
    let mut content = rows.join("\n");
    content.push('\n');
    content
}

/// Run the binary and collect (stdout, stderr, exit code)
pub fn run_sieve(args: &[&str]) -> (String, String, i32) {
    let output = run_sieve_output(args);
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

pub fn run_sieve_output(args: &[&str]) -> Output {
    Command::new(sieve_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("OMDB_API_KEY")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute imdb-sieve")
}

/// Run against a gzip fixture holding `content`
pub fn run_sieve_with_dataset(args: &[&str], content: &str) -> (String, String, i32) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = write_gzip(temp_dir.path(), "title.basics.tsv.gz", content);
    let path = path.to_str().expect("temp path is not UTF-8").to_string();

    let mut full_args = vec!["--file-path", path.as_str()];
    full_args.extend_from_slice(args);
    run_sieve(&full_args)
}

/// Ids of the report rows, header excluded
pub fn reported_ids(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}
