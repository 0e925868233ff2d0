#![no_main]

use imdb_sieve::chunking::{ChunkSource, ReadOutcome, ReadToken};
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // First byte picks the chunk size, the rest is the stream
    let chunk_size = (data[0] as usize % 64) + 1;
    let stream = &data[1..];

    let source = ChunkSource::new(Box::new(Cursor::new(stream.to_vec())), chunk_size);
    let mut token = ReadToken::new();
    let mut rebuilt = Vec::with_capacity(stream.len());
    let mut next_seq = 0u64;

    loop {
        match source.read(&mut token) {
            Ok(ReadOutcome::Data(unit)) => {
                assert_eq!(unit.seq(), next_seq);
                assert_eq!(unit.bytes().last(), Some(&b'\n'));
                next_seq += 1;
                rebuilt.extend_from_slice(unit.bytes());
            }
            Ok(ReadOutcome::Carried) | Ok(ReadOutcome::Retry) => {}
            Ok(ReadOutcome::EndOfStream) => break,
            Err(_) => return,
        }
    }
    if let Some(unit) = token.finish() {
        assert_eq!(unit.seq(), next_seq);
        rebuilt.extend_from_slice(unit.bytes());
    }

    assert_eq!(rebuilt.as_slice(), stream);
});
