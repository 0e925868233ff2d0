#![no_main]

use imdb_sieve::record::{Column, Filter, FilterSet, Record};
use libfuzzer_sys::fuzz_target;

const COLUMNS: [Column; 7] = [
    Column::TitleType,
    Column::PrimaryTitle,
    Column::OriginalTitle,
    Column::StartYear,
    Column::EndYear,
    Column::RuntimeMinutes,
    Column::Genres,
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let column = COLUMNS[data[0] as usize % COLUMNS.len()];
    let line = String::from_utf8_lossy(&data[1..]);
    let record = Record::parse(&line);

    let expected = record.get(column).unwrap_or("").to_string();
    let filters = FilterSet::new(vec![Filter::new(column, expected)]);

    // Short records never match and never panic
    let matched = filters.matches(&record);
    assert_eq!(matched, record.len() > column.index());
});
