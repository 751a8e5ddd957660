use std::borrow::Cow;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Record terminator.
pub const LINE_TERMINATOR: u8 = b'\n';

/// First character of a prefix token.
pub const PREFIX_SENTINEL: char = ':';

/// Terminator appended to outbound lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `"\r\n"`, what chat servers expect.
    #[default]
    CrLf,
    /// `"\n"` only.
    Lf,
}

impl LineEnding {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            LineEnding::CrLf => b"\r\n",
            LineEnding::Lf => b"\n",
        }
    }
}

/// How record bytes map to text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per character (ISO-8859-1). Never fails, never loses bytes.
    #[default]
    Latin1,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    Utf8Lossy,
}

impl TextEncoding {
    /// Decode wire bytes into text.
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self {
            TextEncoding::Latin1 => {
                if bytes.is_ascii() {
                    // ASCII is valid UTF-8 and identical under both encodings.
                    Cow::Borrowed(std::str::from_utf8(bytes).unwrap_or_default())
                } else {
                    Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect())
                }
            }
            TextEncoding::Utf8Lossy => String::from_utf8_lossy(bytes),
        }
    }

    /// Encode text into wire bytes, appending to `dst`.
    ///
    /// Under `Latin1`, characters above U+00FF are written as `?`.
    pub fn encode_into(self, text: &str, dst: &mut BytesMut) {
        match self {
            TextEncoding::Latin1 => {
                dst.reserve(text.len());
                for ch in text.chars() {
                    dst.put_u8(u8::try_from(u32::from(ch)).unwrap_or(b'?'));
                }
            }
            TextEncoding::Utf8Lossy => dst.put_slice(text.as_bytes()),
        }
    }
}

/// One terminator-delimited unit of the wire format, terminator stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    line: Bytes,
}

impl Record {
    /// Create a record from raw line bytes (no terminator).
    pub fn new(line: impl Into<Bytes>) -> Self {
        Self { line: line.into() }
    }

    /// Raw bytes of the line.
    pub fn as_bytes(&self) -> &[u8] {
        &self.line
    }

    /// Decode the line into text.
    pub fn text(&self, encoding: TextEncoding) -> Cow<'_, str> {
        encoding.decode(&self.line)
    }

    pub fn len(&self) -> usize {
        self.line.len()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    /// Consume the record and return its bytes.
    pub fn into_bytes(self) -> Bytes {
        self.line
    }
}

/// Encode one outbound line into the wire format.
///
/// Wire format:
/// ```text
/// [":" prefix " "] command [" " trailing] ("\r\n" | "\n")
/// ```
///
/// No escaping is performed; callers must not embed a terminator in `text`.
pub fn encode_line(text: &str, config: &FrameConfig, dst: &mut BytesMut) {
    let ending = config.line_ending.as_bytes();
    dst.reserve(text.len() + ending.len());
    config.encoding.encode_into(text, dst);
    dst.put_slice(ending);
}

/// Incremental record decoder.
///
/// Remembers how far the buffer was already searched for a terminator, and
/// whether the bytes up to the next terminator belong to a line that was
/// already reported as oversized.
#[derive(Debug, Clone, Default)]
pub struct LineDecoder {
    next_index: usize,
    discarding: bool,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one record from a buffer.
    ///
    /// Returns `Ok(None)` if the buffer doesn't contain a terminator yet.
    /// On success, consumes the record bytes and terminator from the buffer.
    ///
    /// With `max_line_length` set, a record longer than the cap reports
    /// [`FrameError::LineTooLong`] exactly once. Its bytes are dropped up to
    /// and including its terminator, even when that terminator arrives in a
    /// later delivery.
    pub fn decode(&mut self, src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Record>> {
        loop {
            let start = self.next_index.min(src.len());
            let Some(index) = src[start..]
                .iter()
                .position(|&b| b == LINE_TERMINATOR)
                .map(|offset| start + offset)
            else {
                return self.need_more(src, config);
            };

            self.next_index = 0;
            let mut line = src.split_to(index + 1);
            if self.discarding {
                // Tail of a line already reported as too long.
                self.discarding = false;
                continue;
            }

            line.truncate(index);
            if config.strip_cr && line.last() == Some(&b'\r') {
                line.truncate(index - 1);
            }

            if let Some(max) = config.max_line_length {
                if line.len() > max {
                    return Err(FrameError::LineTooLong {
                        size: line.len(),
                        max,
                    });
                }
            }

            return Ok(Some(Record::new(line.freeze())));
        }
    }

    fn need_more(&mut self, src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Record>> {
        if self.discarding {
            src.clear();
            self.next_index = 0;
            return Ok(None);
        }

        if let Some(max) = config.max_line_length {
            // Leave room for a `\r` that strip_cr removes once `\n` arrives.
            let limit = max.saturating_add(usize::from(config.strip_cr));
            if src.len() > limit {
                let size = src.len();
                src.clear();
                self.next_index = 0;
                self.discarding = true;
                return Err(FrameError::LineTooLong { size, max });
            }
        }

        self.next_index = src.len();
        Ok(None) // Need more data
    }

    /// True while the rest of an oversized line is being dropped.
    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    /// Forget scan progress and any pending discard.
    pub fn reset(&mut self) {
        self.next_index = 0;
        self.discarding = false;
    }
}

/// Configuration for line framing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum record length in bytes. Default: unbounded.
    pub max_line_length: Option<usize>,
    /// Remove a single `\r` immediately before the terminator. Default: true.
    pub strip_cr: bool,
    /// Terminator appended to outbound lines. Default: `\r\n`.
    pub line_ending: LineEnding,
    /// Byte/text mapping in both directions. Default: Latin-1.
    pub encoding: TextEncoding,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_line_length: None,
            strip_cr: true,
            line_ending: LineEnding::CrLf,
            encoding: TextEncoding::Latin1,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_line(buf: &mut BytesMut, config: &FrameConfig) -> Result<Option<Record>> {
        LineDecoder::new().decode(buf, config)
    }

    fn decode_all(buf: &mut BytesMut, config: &FrameConfig) -> Vec<Vec<u8>> {
        let mut decoder = LineDecoder::new();
        let mut out = Vec::new();
        while let Some(record) = decoder.decode(buf, config).unwrap() {
            out.push(record.as_bytes().to_vec());
        }
        out
    }

    #[test]
    fn test_decode_single_line() {
        let mut buf = BytesMut::from(&b"PING :server123\n"[..]);
        let record = decode_line(&mut buf, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.as_bytes(), b"PING :server123");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_incomplete_line() {
        let mut buf = BytesMut::from(&b"PING :serv"[..]);
        let result = decode_line(&mut buf, &FrameConfig::default()).unwrap();
        assert!(result.is_none());
        assert_eq!(&buf[..], b"PING :serv");
    }

    #[test]
    fn test_multiple_lines_keep_remainder() {
        let mut buf = BytesMut::from(&b"one\ntwo\nthr"[..]);
        let lines = decode_all(&mut buf, &FrameConfig::default());
        assert_eq!(lines, vec![b"one".to_vec(), b"two".to_vec()]);
        assert_eq!(&buf[..], b"thr");
    }

    #[test]
    fn test_strip_cr_default() {
        let mut buf = BytesMut::from(&b"PING :x\r\n"[..]);
        let record = decode_line(&mut buf, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.as_bytes(), b"PING :x");
    }

    #[test]
    fn test_keep_cr_when_disabled() {
        let cfg = FrameConfig {
            strip_cr: false,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::from(&b"PING :x\r\n"[..]);
        let record = decode_line(&mut buf, &cfg).unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"PING :x\r");
    }

    #[test]
    fn test_only_one_cr_stripped() {
        let mut buf = BytesMut::from(&b"a\r\r\n"[..]);
        let record = decode_line(&mut buf, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.as_bytes(), b"a\r");
    }

    #[test]
    fn test_empty_lines() {
        let mut buf = BytesMut::from(&b"\n\r\n"[..]);
        let lines = decode_all(&mut buf, &FrameConfig::default());
        assert_eq!(lines, vec![Vec::<u8>::new(), Vec::new()]);
    }

    #[test]
    fn test_unterminated_over_cap_clears_buffer() {
        let cfg = FrameConfig {
            max_line_length: Some(4),
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::from(&b"abcdefgh"[..]);
        let err = decode_line(&mut buf, &cfg).unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { size: 8, max: 4 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_tail_of_oversized_line_is_dropped() {
        let cfg = FrameConfig {
            max_line_length: Some(8),
            ..FrameConfig::default()
        };
        let mut decoder = LineDecoder::new();
        let mut buf = BytesMut::from(&b"PRIVMSG #c :aaaaaaaa"[..]);
        let err = decoder.decode(&mut buf, &cfg).unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { size: 20, max: 8 }));
        assert!(decoder.is_discarding());

        // More of the same line: dropped silently, no second error.
        buf.extend_from_slice(b"aaaaaaaaaaaa");
        assert!(decoder.decode(&mut buf, &cfg).unwrap().is_none());
        assert!(buf.is_empty());

        buf.extend_from_slice(b"QUIT\r\nPING :x\n");
        let next = decoder.decode(&mut buf, &cfg).unwrap().unwrap();
        assert_eq!(next.as_bytes(), b"PING :x");
        assert!(!decoder.is_discarding());
        assert!(decoder.decode(&mut buf, &cfg).unwrap().is_none());
    }

    #[test]
    fn test_cap_allows_pending_cr() {
        let cfg = FrameConfig {
            max_line_length: Some(4),
            ..FrameConfig::default()
        };
        let mut decoder = LineDecoder::new();
        let mut buf = BytesMut::from(&b"abcd\r"[..]);
        assert!(decoder.decode(&mut buf, &cfg).unwrap().is_none());
        buf.extend_from_slice(b"\n");
        let record = decoder.decode(&mut buf, &cfg).unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"abcd");
    }

    #[test]
    fn test_scan_resumes_after_searched_bytes() {
        let cfg = FrameConfig::default();
        let mut decoder = LineDecoder::new();
        let mut buf = BytesMut::new();
        for piece in [&b"PRIVMSG "[..], b"#c ", b":hello"] {
            buf.extend_from_slice(piece);
            assert!(decoder.decode(&mut buf, &cfg).unwrap().is_none());
            assert_eq!(decoder.next_index, buf.len());
        }
        buf.extend_from_slice(b"\r\nNEXT");
        let record = decoder.decode(&mut buf, &cfg).unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"PRIVMSG #c :hello");
        assert_eq!(decoder.next_index, 0);
        assert_eq!(&buf[..], b"NEXT");
    }

    #[test]
    fn test_scan_offset_survives_external_clear() {
        let cfg = FrameConfig::default();
        let mut decoder = LineDecoder::new();
        let mut buf = BytesMut::from(&b"partial line"[..]);
        assert!(decoder.decode(&mut buf, &cfg).unwrap().is_none());
        buf.clear();
        buf.extend_from_slice(b"x\n");
        let record = decoder.decode(&mut buf, &cfg).unwrap().unwrap();
        assert_eq!(record.as_bytes(), b"x");
    }

    #[test]
    fn test_terminated_over_cap_is_consumed() {
        let cfg = FrameConfig {
            max_line_length: Some(4),
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::from(&b"abcdefgh\nok\n"[..]);
        let err = decode_line(&mut buf, &cfg).unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { size: 8, max: 4 }));

        let next = decode_line(&mut buf, &cfg).unwrap().unwrap();
        assert_eq!(next.as_bytes(), b"ok");
    }

    #[test]
    fn test_encode_line_crlf() {
        let mut buf = BytesMut::new();
        encode_line("USER u 0 * Real Name", &FrameConfig::default(), &mut buf);
        assert_eq!(&buf[..], b"USER u 0 * Real Name\r\n");
    }

    #[test]
    fn test_encode_line_lf() {
        let cfg = FrameConfig {
            line_ending: LineEnding::Lf,
            ..FrameConfig::default()
        };
        let mut buf = BytesMut::new();
        encode_line("USER u 0 * Real Name", &cfg, &mut buf);
        assert_eq!(&buf[..], b"USER u 0 * Real Name\n");
    }

    #[test]
    fn test_latin1_is_byte_per_char() {
        let bytes = [b'c', b'a', b'f', 0xE9];
        let text = TextEncoding::Latin1.decode(&bytes);
        assert_eq!(text, "caf\u{e9}");
        assert_eq!(text.chars().count(), bytes.len());

        let mut out = BytesMut::new();
        TextEncoding::Latin1.encode_into(&text, &mut out);
        assert_eq!(&out[..], &bytes);
    }

    #[test]
    fn test_latin1_replaces_wide_chars() {
        let mut out = BytesMut::new();
        TextEncoding::Latin1.encode_into("a\u{263A}b", &mut out);
        assert_eq!(&out[..], b"a?b");
    }

    #[test]
    fn test_utf8_lossy_decode() {
        let text = TextEncoding::Utf8Lossy.decode("h\u{e9}".as_bytes());
        assert_eq!(text, "h\u{e9}");
        let text = TextEncoding::Utf8Lossy.decode(&[b'a', 0xFF]);
        assert_eq!(text, "a\u{FFFD}");
    }
}
