//! `tokio_util` codec with the same framing rules as [`LineFramer`](crate::LineFramer).

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_line, FrameConfig, LineDecoder, Record};
use crate::error::FrameError;

/// Line codec for `FramedRead` / `FramedWrite`.
#[derive(Debug, Clone, Default)]
pub struct LineCodec {
    decoder: LineDecoder,
    config: FrameConfig,
}

impl LineCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            decoder: LineDecoder::new(),
            config,
        }
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Decoder for LineCodec {
    type Item = Record;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Record>, FrameError> {
        self.decoder.decode(src, &self.config)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Record>, FrameError> {
        if let Some(record) = self.decode(src)? {
            return Ok(Some(record));
        }
        let discarding = self.decoder.is_discarding();
        self.decoder.reset();
        if discarding || src.is_empty() {
            src.clear();
            return Ok(None);
        }
        let mut rest = src.split();
        if self.config.strip_cr && rest.last() == Some(&b'\r') {
            rest.truncate(rest.len() - 1);
        }
        Ok(Some(Record::new(rest.freeze())))
    }
}

impl<T: AsRef<str>> Encoder<T> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), FrameError> {
        let text = item.as_ref();
        if let Some(max) = self.config.max_line_length {
            if text.len() > max {
                return Err(FrameError::LineTooLong {
                    size: text.len(),
                    max,
                });
            }
        }
        encode_line(text, &self.config, dst);
        Ok(())
    }
}
