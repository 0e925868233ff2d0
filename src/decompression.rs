use anyhow::{anyhow, Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader, Chain, Cursor, Read};
use std::path::Path;

/// Byte stream produced by decompressing the input file.
pub type DecodedStream = Box<dyn Read + Send>;

/// Compression format detected from the leading magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zstd,
    Plain,
}

impl Compression {
    /// Gzip starts with 1F 8B 08, zstd with 28 B5 2F FD
    pub fn detect(head: &[u8]) -> Self {
        if head.len() >= 3 && head[0] == 0x1F && head[1] == 0x8B && head[2] == 0x08 {
            Compression::Gzip
        } else if head.len() >= 4
            && head[0] == 0x28
            && head[1] == 0xB5
            && head[2] == 0x2F
            && head[3] == 0xFD
        {
            Compression::Zstd
        } else {
            Compression::Plain
        }
    }
}

/// Wrap any reader in the decoder matching its magic bytes.
///
/// The sniffed bytes are put back in front of the reader with a cursor chain,
/// so the decoder sees the stream from its first byte. Compressed streams are
/// decoded up to their first output bytes here, so a corrupt header is
/// reported now and not by the first worker read.
pub fn maybe_decompress<R: Read + Send + 'static>(
    mut reader: R,
) -> std::io::Result<(Compression, DecodedStream)> {
    let mut head = [0u8; 4];
    let n = read_head(&mut reader, &mut head)?;

    let prefix = Cursor::new(head[..n].to_vec());
    let chained: Chain<Cursor<Vec<u8>>, R> = prefix.chain(reader);

    let compression = Compression::detect(&head[..n]);
    let stream: DecodedStream = match compression {
        Compression::Gzip => primed(MultiGzDecoder::new(chained))?,
        // zstd::Decoder wraps input in BufReader automatically
        Compression::Zstd => primed(zstd::Decoder::new(chained)?)?,
        Compression::Plain => Box::new(chained),
    };
    Ok((compression, stream))
}

// Decoders are lazy; pull the first buffer so header errors surface early.
fn primed<D: Read + Send + 'static>(decoder: D) -> std::io::Result<DecodedStream> {
    let mut buffered = BufReader::new(decoder);
    buffered.fill_buf()?;
    Ok(Box::new(buffered))
}

/// Open the dataset at `path` and return its decompressed byte stream.
pub fn open<P: AsRef<Path>>(path: P) -> Result<DecodedStream> {
    let path_ref = path.as_ref();

    if let Some(extension) = path_ref.extension().and_then(|ext| ext.to_str()) {
        if extension.eq_ignore_ascii_case("zip") {
            return Err(anyhow!(
                "ZIP archives are not supported. Only gzip and zstd files can be streamed. Extract the file first: unzip {}",
                path_ref.display()
            ));
        }
    }

    let file = File::open(path_ref)
        .with_context(|| format!("cannot open input file {}", path_ref.display()))?;

    let (compression, stream) = maybe_decompress(BufReader::new(file)).with_context(|| {
        format!(
            "cannot initialise decompression for {}",
            path_ref.display()
        )
    })?;
    tracing::debug!(path = %path_ref.display(), ?compression, "input opened");
    Ok(stream)
}

// A short first read must not be mistaken for a plain file.
fn read_head<R: Read>(reader: &mut R, head: &mut [u8; 4]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < head.len() {
        match reader.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
