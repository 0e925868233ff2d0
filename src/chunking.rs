//! Chunk source and line reconstruction
//!
//! The decompressed stream is pulled in fixed-size chunks by whichever worker
//! currently owns the [`ReadToken`]. The token carries the bytes of the
//! incomplete trailing line (the carry) from one chunk to the next, so a
//! record that straddles a chunk boundary is stitched back together before it
//! reaches a worker.

use std::io::{self, Read};
use std::sync::Mutex;

use crate::decompression::DecodedStream;
use crate::stats::{stats_add_chunk_read, stats_add_data_unit};

pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;
pub const LINE_TERMINATOR: u8 = b'\n';

/// A carry plus the complete lines of one chunk.
///
/// Units are immutable once built and are consumed by exactly one worker.
/// Every unit except the end-of-stream flush ends with [`LINE_TERMINATOR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUnit {
    seq: u64,
    bytes: Vec<u8>,
}

impl DataUnit {
    pub fn new(seq: u64, bytes: Vec<u8>) -> Self {
        Self { seq, bytes }
    }

    /// Position of this unit in stream order
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lines of the unit without their terminators. A trailing `\r` is
    /// stripped as well, so CRLF files compare equal on the last column.
    pub fn lines(&self) -> impl Iterator<Item = &[u8]> {
        let body = self
            .bytes
            .strip_suffix(&[LINE_TERMINATOR])
            .unwrap_or(&self.bytes);
        body.split(|&b| b == LINE_TERMINATOR)
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
    }
}

/// Split `chunk` at its last line terminator.
///
/// Returns the carry followed by every complete line of the chunk (terminator
/// included) and leaves the bytes after the last terminator in `carry`. When
/// the chunk holds no terminator at all, the whole chunk is appended to the
/// carry and `None` is returned, so lines longer than one chunk keep growing
/// the carry until their terminator arrives.
pub fn split_complete_lines(carry: &mut Vec<u8>, chunk: &[u8]) -> Option<Vec<u8>> {
    match chunk.iter().rposition(|&b| b == LINE_TERMINATOR) {
        Some(last) => {
            let mut data = Vec::with_capacity(carry.len() + last + 1);
            data.append(carry);
            data.extend_from_slice(&chunk[..=last]);
            carry.extend_from_slice(&chunk[last + 1..]);
            Some(data)
        }
        None => {
            carry.extend_from_slice(chunk);
            None
        }
    }
}

/// The right to read the next chunk.
///
/// Exactly one token exists per pipeline. It owns the carry and the sequence
/// number of the next unit, and it is moved between workers through a
/// single-slot channel.
#[derive(Debug, Default)]
pub struct ReadToken {
    carry: Vec<u8>,
    next_seq: u64,
}

impl ReadToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn carry(&self) -> &[u8] {
        &self.carry
    }

    /// Feed one chunk through the line reconstructor.
    pub fn absorb(&mut self, chunk: &[u8]) -> Option<DataUnit> {
        let bytes = split_complete_lines(&mut self.carry, chunk)?;
        Some(self.issue(bytes))
    }

    /// Flush the carry at true end of stream, even without a terminator.
    pub fn finish(mut self) -> Option<DataUnit> {
        if self.carry.is_empty() {
            return None;
        }
        let bytes = std::mem::take(&mut self.carry);
        Some(self.issue(bytes))
    }

    fn issue(&mut self, bytes: Vec<u8>) -> DataUnit {
        let unit = DataUnit::new(self.next_seq, bytes);
        self.next_seq += 1;
        stats_add_data_unit();
        unit
    }
}

/// Result of one read by the token holder
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The chunk completed at least one line
    Data(DataUnit),
    /// The chunk had no terminator and went entirely into the carry
    Carried,
    /// Nothing was read but the stream is not finished
    Retry,
    EndOfStream,
}

struct SourceState {
    reader: DecodedStream,
    buf: Vec<u8>,
}

/// Single logical reader over the decompressed stream.
///
/// The mutex is only ever taken by the token holder, so it is uncontended;
/// requiring `&mut ReadToken` in [`ChunkSource::read`] keeps non-holders out.
pub struct ChunkSource {
    state: Mutex<SourceState>,
    chunk_size: usize,
}

impl ChunkSource {
    pub fn new(reader: DecodedStream, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            state: Mutex::new(SourceState {
                reader,
                buf: vec![0u8; chunk_size],
            }),
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Pull the next chunk and run it through the token's carry.
    pub fn read(&self, token: &mut ReadToken) -> io::Result<ReadOutcome> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| io::Error::other("chunk source lock poisoned"))?;
        let SourceState { reader, buf } = &mut *state;

        match reader.read(buf) {
            Ok(0) => Ok(ReadOutcome::EndOfStream),
            Ok(n) => {
                stats_add_chunk_read(n);
                match token.absorb(&buf[..n]) {
                    Some(unit) => Ok(ReadOutcome::Data(unit)),
                    None => {
                        tracing::debug!(
                            carry = token.carry().len(),
                            chunk_size = self.chunk_size,
                            "line longer than one chunk, growing carry"
                        );
                        Ok(ReadOutcome::Carried)
                    }
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(ReadOutcome::Retry),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for ChunkSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkSource")
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}
