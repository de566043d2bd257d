//! Streaming triple source over (optionally compressed) dump files.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::{debug, warn};

use freebase_core::{Triple, ntriples};

use crate::error::EngineError;

const READ_BUFFER: usize = 1 << 20;

/// Open a dump file, picking the decoder from its extension.
pub fn open_dump(path: &Path) -> Result<Box<dyn BufRead>, EngineError> {
    let file = File::open(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let reader: Box<dyn BufRead> = match extension {
        "gz" => Box::new(BufReader::with_capacity(
            READ_BUFFER,
            MultiGzDecoder::new(file),
        )),
        "zst" | "zstd" => Box::new(BufReader::with_capacity(
            READ_BUFFER,
            zstd::stream::read::Decoder::new(file)?,
        )),
        _ => Box::new(BufReader::with_capacity(READ_BUFFER, file)),
    };
    Ok(reader)
}

/// Yields `(ordinal, triple)` in file order. The ordinal is the number of raw
/// lines consumed so far, including the triple's own line, so it can be fed
/// back to [`TripleSource::resume`].
pub struct TripleSource<R> {
    reader: R,
    ordinal: u64,
    malformed: u64,
    buf: Vec<u8>,
}

impl<R: BufRead> TripleSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            ordinal: 0,
            malformed: 0,
            buf: Vec::new(),
        }
    }

    /// Discard the first `skip` raw lines and continue counting from there.
    pub fn resume(reader: R, skip: u64) -> Result<Self, EngineError> {
        let mut source = Self::new(reader);
        while source.ordinal < skip {
            if !source.read_raw_line()? {
                warn!(
                    checkpoint = skip,
                    lines = source.ordinal,
                    "dump ended before the checkpoint position"
                );
                break;
            }
        }
        Ok(source)
    }

    pub fn ordinal(&self) -> u64 {
        self.ordinal
    }

    /// Lines that could not be parsed so far.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    fn read_raw_line(&mut self) -> Result<bool, EngineError> {
        self.buf.clear();
        let read = self.reader.read_until(b'\n', &mut self.buf)?;
        if read == 0 {
            return Ok(false);
        }
        self.ordinal += 1;
        Ok(true)
    }

    fn next_triple(&mut self) -> Result<Option<(u64, Triple)>, EngineError> {
        loop {
            if !self.read_raw_line()? {
                return Ok(None);
            }
            let line = match std::str::from_utf8(&self.buf) {
                Ok(line) => line,
                Err(err) => {
                    self.malformed += 1;
                    debug!(ordinal = self.ordinal, error = %err, "skipping non-UTF-8 line");
                    continue;
                }
            };
            match ntriples::parse_line(line) {
                Ok(Some(triple)) => return Ok(Some((self.ordinal, triple))),
                Ok(None) => {}
                Err(err) => {
                    self.malformed += 1;
                    debug!(ordinal = self.ordinal, error = %err, "skipping malformed line");
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for TripleSource<R> {
    type Item = Result<(u64, Triple), EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_triple().transpose()
    }
}
