//! Bundle archive extraction
//!
//! A bundle arrives as a tar stream (optionally gzip-compressed) and is
//! unpacked into the cache directory with its internal relative paths.
//! Extraction settles exactly once: the call returns after both the source
//! stream and the unpacker have finished, and the first error from either
//! side is the one reported. Nothing is rolled back on failure; a partially
//! written bundle is caught by the bundle validity check on next use.

use flate2::read::MultiGzDecoder;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tar::Archive;
use thiserror::Error;
use tracing::debug;

use super::CacheDir;

/// gzip magic bytes (RFC 1952).
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Which side of the extraction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    /// Reading the incoming byte stream.
    Source,
    /// Decoding the archive or writing its entries to disk.
    Archive,
}

impl fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionStage::Source => f.write_str("source stream"),
            ExtractionStage::Archive => f.write_str("archive"),
        }
    }
}

/// A bundle could not be extracted into the cache.
#[derive(Debug, Error)]
#[error("bundle extraction into {} failed while reading the {stage}", cache_dir.display())]
pub struct ExtractionError {
    pub stage: ExtractionStage,
    pub cache_dir: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractSummary {
    /// Archive entries written into the cache.
    pub entries: u64,
    /// Bytes consumed from the source stream.
    pub bytes: u64,
}

/// Counts bytes read and remembers whether the inner reader failed, so an
/// error surfacing through the unpacker can be attributed to its origin.
struct SourceRead<R> {
    inner: R,
    bytes: u64,
    failed: bool,
}

impl<R> SourceRead<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            bytes: 0,
            failed: false,
        }
    }
}

impl<R: Read> Read for SourceRead<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inner.read(buf) {
            Ok(n) => {
                self.bytes = self.bytes.saturating_add(n as u64);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                self.failed = true;
                Err(e)
            }
        }
    }
}

impl CacheDir {
    /// Extract a tar (or tar.gz) byte stream into the cache directory.
    ///
    /// The cache directory must already exist; see [`CacheDir::ensure`].
    pub fn extract_bundle<R: Read>(&self, reader: R) -> Result<ExtractSummary, ExtractionError> {
        let mut source = SourceRead::new(reader);

        let mut head = [0u8; GZIP_MAGIC.len()];
        let head_len = read_head(&mut source, &mut head)
            .map_err(|e| self.extraction_error(ExtractionStage::Source, e))?;
        let head = &head[..head_len];
        let gzip = head == &GZIP_MAGIC[..];
        let stream = head.chain(source);

        let (result, stream) = if gzip {
            let (result, decoder) = unpack_stream(MultiGzDecoder::new(stream), &self.path);
            (result, decoder.into_inner())
        } else {
            unpack_stream(stream, &self.path)
        };
        let (_, source) = stream.into_inner();

        match result {
            Ok(entries) => {
                let summary = ExtractSummary {
                    entries,
                    bytes: source.bytes,
                };
                debug!(
                    cache_dir = %self.path.display(),
                    entries = summary.entries,
                    bytes = summary.bytes,
                    gzip,
                    "extracted bundle"
                );
                Ok(summary)
            }
            Err(e) => {
                let stage = if source.failed {
                    ExtractionStage::Source
                } else {
                    ExtractionStage::Archive
                };
                Err(self.extraction_error(stage, e))
            }
        }
    }

    /// Extract a bundle archive stored at `archive`.
    pub fn extract_bundle_file(&self, archive: &Path) -> Result<ExtractSummary, ExtractionError> {
        let file = File::open(archive)
            .map_err(|e| self.extraction_error(ExtractionStage::Source, e))?;
        self.extract_bundle(file)
    }

    fn extraction_error(&self, stage: ExtractionStage, source: io::Error) -> ExtractionError {
        ExtractionError {
            stage,
            cache_dir: self.path.clone(),
            source,
        }
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
/// Returns the number of bytes read.
fn read_head<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Unpack every entry of `reader` under `dest`, then drain whatever follows
/// the archive so the stream is read to its end. Hands the reader back so the
/// caller can inspect it whatever the outcome.
fn unpack_stream<R: Read>(reader: R, dest: &Path) -> (io::Result<u64>, R) {
    let mut archive = Archive::new(reader);
    let result = unpack_entries(&mut archive, dest);
    let mut reader = archive.into_inner();
    let result = result.and_then(|entries| {
        io::copy(&mut reader, &mut io::sink())?;
        Ok(entries)
    });
    (result, reader)
}

fn unpack_entries<R: Read>(archive: &mut Archive<R>, dest: &Path) -> io::Result<u64> {
    let mut unpacked = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        // `unpack_in` refuses entries that would land outside `dest`.
        if entry.unpack_in(dest)? {
            unpacked += 1;
        } else {
            debug!(path = %entry.path()?.display(), "skipped archive entry outside cache");
        }
    }
    Ok(unpacked)
}
