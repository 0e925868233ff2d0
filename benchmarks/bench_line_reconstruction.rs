use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use imdb_sieve::cancel::Cancellation;
use imdb_sieve::chunking::{split_complete_lines, ChunkSource, ReadOutcome, ReadToken};
use imdb_sieve::enrich::Enricher;
use imdb_sieve::parallel::{Pipeline, PoolConfig};
use imdb_sieve::record::{Column, Filter, FilterSet, Record};

fn sample_dataset(rows: usize) -> Vec<u8> {
    let mut out = String::with_capacity(rows * 64);
    out.push_str("tconst\ttitleType\tprimaryTitle\toriginalTitle\tisAdult\tstartYear\tendYear\truntimeMinutes\tgenres\n");
    for i in 0..rows {
        let title_type = if i % 3 == 0 { "movie" } else { "tvEpisode" };
        out.push_str(&format!(
            "tt{:07}\t{}\tTitle number {}\tTitle number {}\t0\t{}\t\\N\t{}\tDrama,Comedy\n",
            i,
            title_type,
            i,
            i,
            1900 + i % 120,
            30 + i % 90
        ));
    }
    out.into_bytes()
}

fn bench_split_complete_lines(c: &mut Criterion) {
    let data = sample_dataset(2_000);
    let mut group = c.benchmark_group("split_complete_lines");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for chunk_size in [512usize, 8 * 1024, 64 * 1024] {
        group.bench_function(format!("chunk_{}", chunk_size), |b| {
            b.iter(|| {
                let mut carry = Vec::new();
                let mut total = 0usize;
                for chunk in data.chunks(chunk_size) {
                    if let Some(unit) = split_complete_lines(&mut carry, black_box(chunk)) {
                        total += unit.len();
                    }
                }
                black_box(total + carry.len())
            });
        });
    }
    group.finish();
}

fn bench_chunk_source(c: &mut Criterion) {
    let data = sample_dataset(2_000);
    let mut group = c.benchmark_group("chunk_source");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("single_token_8k", |b| {
        b.iter(|| {
            let source = ChunkSource::new(Box::new(Cursor::new(data.clone())), 8 * 1024);
            let mut token = ReadToken::new();
            let mut units = 0usize;
            while let Ok(outcome) = source.read(&mut token) {
                match outcome {
                    ReadOutcome::Data(_) => units += 1,
                    ReadOutcome::Carried | ReadOutcome::Retry => {}
                    ReadOutcome::EndOfStream => break,
                }
            }
            black_box(units)
        });
    });
    group.finish();
}

fn bench_filter_lines(c: &mut Criterion) {
    let data = String::from_utf8(sample_dataset(2_000)).unwrap_or_default();
    let filters = FilterSet::new(vec![
        Filter::new(Column::TitleType, "movie"),
        Filter::new(Column::Genres, "Drama,Comedy"),
    ]);

    c.bench_function("filter_lines", |b| {
        b.iter(|| {
            let matched = data
                .lines()
                .map(Record::parse)
                .filter(|record| filters.matches(record))
                .count();
            black_box(matched)
        });
    });
}

fn bench_pipeline(c: &mut Criterion) {
    let data = sample_dataset(20_000);
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(20);

    for workers in [1usize, 4] {
        group.bench_function(format!("workers_{}", workers), |b| {
            b.iter(|| {
                let config = PoolConfig {
                    workers,
                    ..PoolConfig::default()
                };
                let filters = FilterSet::new(vec![Filter::new(Column::TitleType, "movie")]);
                let outcome = Pipeline::new(config, filters, Enricher::disabled())
                    .run(Box::new(Cursor::new(data.clone())), Cancellation::new());
                black_box(outcome.map(|o| o.rows.len()).unwrap_or(0))
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_split_complete_lines,
    bench_chunk_source,
    bench_filter_lines,
    bench_pipeline
);
criterion_main!(benches);
