use bytes::BytesMut;
use tracing::warn;

use crate::codec::{FrameConfig, LineDecoder, Record};
use crate::error::Result;

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;

/// Push-based line framer.
///
/// Owns the stream buffer: every delivery is appended, every complete record
/// is split off the front together with its terminator, and whatever follows
/// the last terminator stays buffered for the next delivery.
#[derive(Debug)]
pub struct LineFramer {
    buf: BytesMut,
    decoder: LineDecoder,
    config: FrameConfig,
}

impl LineFramer {
    /// Create a framer with default configuration.
    pub fn new() -> Self {
        Self::with_config(FrameConfig::default())
    }

    /// Create a framer with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            decoder: LineDecoder::new(),
            config,
        }
    }

    /// Append a delivery and iterate over the records it completes.
    ///
    /// Records come out in arrival order. Dropping the iterator early leaves
    /// the rest buffered; they are returned by the next `feed` or
    /// [`next_record`](Self::next_record).
    pub fn feed(&mut self, chunk: &[u8]) -> Records<'_> {
        self.push(chunk);
        Records { framer: self }
    }

    /// Append a delivery without extracting anything.
    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Extract the next complete record, if the buffer holds one.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        self.decoder.decode(&mut self.buf, &self.config).inspect_err(|err| {
            warn!(error = %err, "dropping oversized line");
        })
    }

    /// Take the unterminated remainder as a final record (end of input).
    ///
    /// Nothing is returned when the remainder is the tail of an oversized line.
    pub fn finish(&mut self) -> Option<Record> {
        let discarding = self.decoder.is_discarding();
        self.decoder.reset();
        if discarding || self.buf.is_empty() {
            self.buf.clear();
            return None;
        }
        let mut rest = self.buf.split();
        if self.config.strip_cr && rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        Some(Record::new(rest.freeze()))
    }

    /// Number of buffered bytes not yet resolved into records.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Discard any buffered partial record.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.decoder.reset();
    }

    /// Current framer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Records completed by one [`LineFramer::feed`] call.
#[derive(Debug)]
pub struct Records<'a> {
    framer: &'a mut LineFramer,
}

impl Iterator for Records<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.framer.next_record().transpose()
    }
}
