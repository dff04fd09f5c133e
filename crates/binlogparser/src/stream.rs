use std::fs::File;
use std::io::{BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;

use flate2::{bufread, read::GzDecoder};

use crate::config::ReaderConfig;
use crate::parser::Record;
use crate::reader::{self, EventReader};
use crate::types::{BuildEvent, KindSet, ParseError};
use crate::version::FormatVersion;

/// A reader over a gzip-compressed log file. The decoder pulls compressed
/// bytes straight from the configured file buffer.
pub type FileBinlogReader = BinlogReader<bufread::GzDecoder<BufReader<File>>>;

/// Counters for one decode session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Events returned to the caller.
    pub events: u64,
    /// Records consumed without being materialized.
    pub skipped: u64,
    /// Embedded blobs skipped.
    pub blobs: u64,
    /// Total length of the skipped blobs.
    pub blob_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Reading,
    Done,
    Failed,
}

/// A lazy, single-pass sequence of build events.
///
/// The header is read when the reader is constructed, so an unsupported
/// version fails before any event is requested. The sequence ends after the
/// end-of-file record or the first error; after that `next` returns `None`.
///
/// # Example
///
/// ```no_run
/// use binlogparser::BinlogReader;
///
/// let reader = BinlogReader::open("msbuild.binlog")?;
/// for event in reader {
///     let event = event?;
///     println!("{} {:?}", event.kind_name(), event.context());
/// }
/// # Ok::<(), binlogparser::ParseError>(())
/// ```
pub struct BinlogReader<R> {
    reader: EventReader<R>,
    interest: KindSet,
    state: State,
    stats: ReadStats,
}

impl FileBinlogReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        Self::open_with_config(path, ReaderConfig::default())
    }

    pub fn open_with_config(
        path: impl AsRef<Path>,
        config: ReaderConfig,
    ) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let buffered = BufReader::with_capacity(config.buffer_capacity, file);
        let reader = BinlogReader::with_config(bufread::GzDecoder::new(buffered), &config)?;
        log::debug!(
            "opened build log {} (format version {})",
            path.display(),
            reader.version()
        );
        Ok(reader)
    }
}

impl<R: Read> BinlogReader<GzDecoder<R>> {
    /// Decode a gzip-compressed log from any byte source.
    pub fn from_gzip(inner: R) -> Result<Self, ParseError> {
        BinlogReader::with_config(GzDecoder::new(inner), &ReaderConfig::default())
    }
}

impl<R: Read> BinlogReader<R> {
    /// Decode a log whose bytes are already decompressed.
    pub fn from_decompressed(inner: R) -> Result<Self, ParseError> {
        Self::with_config(inner, &ReaderConfig::default())
    }

    /// Read the header of an already-decompressed stream and prepare to iterate.
    pub fn with_config(mut inner: R, config: &ReaderConfig) -> Result<Self, ParseError> {
        let version = reader::read_header(&mut inner)?;
        Ok(BinlogReader {
            reader: EventReader::new(inner, version),
            interest: config.interest,
            state: State::Reading,
            stats: ReadStats::default(),
        })
    }

    pub fn version(&self) -> FormatVersion {
        self.reader.version
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }

    /// Whether the end-of-file record has been consumed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Bytes of decompressed record data consumed so far.
    pub fn bytes_read(&self) -> u64 {
        self.reader.bytes_read()
    }

    /// End the session and release the underlying source.
    pub fn close(self) -> ReadStats {
        self.stats
    }

    fn advance(&mut self) -> Result<Option<BuildEvent>, ParseError> {
        loop {
            match self.reader.read_record(self.interest)? {
                Record::Event(event) => {
                    self.stats.events += 1;
                    return Ok(Some(event));
                }
                Record::Skipped(kind) => {
                    log::trace!("skipped {:?} record", kind);
                    self.stats.skipped += 1;
                }
                Record::Blob(len) => {
                    log::trace!("skipped {} byte blob", len);
                    self.stats.blobs += 1;
                    self.stats.blob_bytes += len;
                }
                Record::EndOfFile => return Ok(None),
            }
        }
    }
}

impl<R: Read> Iterator for BinlogReader<R> {
    type Item = Result<BuildEvent, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != State::Reading {
            return None;
        }

        match self.advance() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.state = State::Done;
                log::debug!(
                    "end of build log: {} events, {} skipped records, {} blobs",
                    self.stats.events,
                    self.stats.skipped,
                    self.stats.blobs
                );
                None
            }
            Err(e) => {
                self.state = State::Failed;
                log::warn!(
                    "build log decoding failed after {} bytes: {}",
                    self.reader.bytes_read(),
                    e
                );
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for BinlogReader<R> {}
