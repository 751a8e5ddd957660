use std::io::{ErrorKind, Read};

use chatline_transport::ChatStream;

use crate::codec::{FrameConfig, Record};
use crate::error::{FrameError, Result};
use crate::framer::LineFramer;

const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete records from any `Read` stream.
///
/// Handles partial reads internally, so callers always get complete records.
pub struct LineReader<T> {
    inner: T,
    framer: LineFramer,
}

impl<T: Read> LineReader<T> {
    /// Create a new line reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new line reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            framer: LineFramer::with_config(config),
        }
    }

    /// Read the next complete record (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. Bytes
    /// after the last terminator stay available through
    /// [`take_remainder`](Self::take_remainder).
    pub fn read_record(&mut self) -> Result<Record> {
        loop {
            if let Some(record) = self.framer.next_record()? {
                return Ok(record);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.framer.push(&chunk[..read]);
        }
    }

    /// Take the unterminated tail left behind at EOF.
    pub fn take_remainder(&mut self) -> Option<Record> {
        self.framer.finish()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current line reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.framer.config()
    }
}

impl LineReader<ChatStream> {
    /// Create a line reader for `ChatStream` and apply read timeout from config.
    pub fn with_config_stream(inner: ChatStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: chatline_transport::TransportError) -> FrameError {
    match err {
        chatline_transport::TransportError::Io(io) => FrameError::Io(io),
        chatline_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::TextEncoding;

    #[test]
    fn read_single_record() {
        let mut reader = LineReader::new(Cursor::new(b"PING :abc\r\n".to_vec()));
        let record = reader.read_record().unwrap();
        assert_eq!(record.as_bytes(), b"PING :abc");
    }

    #[test]
    fn read_multiple_records() {
        let wire = b":a JOIN #x\r\n:b PART #x\r\n:c QUIT :bye\r\n".to_vec();
        let mut reader = LineReader::new(Cursor::new(wire));

        let r1 = reader.read_record().unwrap();
        let r2 = reader.read_record().unwrap();
        let r3 = reader.read_record().unwrap();

        assert_eq!(r1.text(TextEncoding::Latin1), ":a JOIN #x");
        assert_eq!(r2.text(TextEncoding::Latin1), ":b PART #x");
        assert_eq!(r3.text(TextEncoding::Latin1), ":c QUIT :bye");
        assert!(matches!(
            reader.read_record(),
            Err(FrameError::ConnectionClosed)
        ));
    }

    #[test]
    fn read_record_larger_than_chunk() {
        let body = "x".repeat(3 * READ_CHUNK_SIZE);
        let wire = format!("PRIVMSG #c :{body}\n");
        let mut reader = LineReader::new(Cursor::new(wire.into_bytes()));

        let record = reader.read_record().unwrap();
        assert_eq!(record.len(), "PRIVMSG #c :".len() + body.len());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: b"NOTICE * :slow\r\n".to_vec(),
            pos: 0,
        };
        let mut reader = LineReader::new(byte_reader);

        let record = reader.read_record().unwrap();
        assert_eq!(record.as_bytes(), b"NOTICE * :slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = LineReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert!(reader.take_remainder().is_none());
    }

    #[test]
    fn connection_closed_mid_record_keeps_remainder() {
        let mut reader = LineReader::new(Cursor::new(b"ok\nhalf a li".to_vec()));
        assert_eq!(reader.read_record().unwrap().as_bytes(), b"ok");

        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
        assert_eq!(reader.take_remainder().unwrap().as_bytes(), b"half a li");
    }

    #[test]
    fn oversized_record_in_stream() {
        let cfg = FrameConfig {
            max_line_length: Some(4),
            ..FrameConfig::default()
        };
        let mut reader = LineReader::with_config(Cursor::new(b"too long\nok\n".to_vec()), cfg);
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { .. }));
        assert_eq!(reader.read_record().unwrap().as_bytes(), b"ok");
    }

    #[test]
    fn oversized_line_read_in_pieces_yields_no_tail_record() {
        let cfg = FrameConfig {
            max_line_length: Some(8),
            ..FrameConfig::default()
        };
        let source = ByteByByteReader {
            bytes: b"PRIVMSG #c :aaaaaaaaQUIT\r\nPING :x\n".to_vec(),
            pos: 0,
        };
        let mut reader = LineReader::with_config(source, cfg);
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, FrameError::LineTooLong { .. }));
        assert_eq!(reader.read_record().unwrap().as_bytes(), b"PING :x");
        assert!(matches!(
            reader.read_record().unwrap_err(),
            FrameError::ConnectionClosed
        ));
        assert!(reader.take_remainder().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = InterruptedThenData {
            interrupted: false,
            inner: Cursor::new(b"PING :ok\n".to_vec()),
        };
        let mut lines = LineReader::new(reader);
        assert_eq!(lines.read_record().unwrap().as_bytes(), b"PING :ok");
    }

    #[test]
    fn would_block_propagates_io_error() {
        let mut reader = LineReader::new(WouldBlock);
        let err = reader.read_record().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    #[cfg(unix)]
    fn roundtrip_over_stream_pair() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = crate::writer::LineWriter::new(ChatStream::from(left));
        let cfg = FrameConfig {
            read_timeout: Some(std::time::Duration::from_secs(5)),
            ..FrameConfig::default()
        };
        let mut reader = LineReader::with_config_stream(ChatStream::from(right), cfg).unwrap();

        writer.send_command(["PRIVMSG", "#c", ":hello there"]).unwrap();
        writer.send_raw("PING :1").unwrap();

        assert_eq!(reader.read_record().unwrap().as_bytes(), b"PRIVMSG #c :hello there");
        assert_eq!(reader.read_record().unwrap().as_bytes(), b"PING :1");
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = LineReader::new(Cursor::new(Vec::<u8>::new()));
        let _ = reader.get_ref();
        let _ = reader.get_mut();
        assert!(reader.config().strip_cr);
        let _inner = reader.into_inner();
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        inner: Cursor<Vec<u8>>,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    struct WouldBlock;

    impl Read for WouldBlock {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::WouldBlock))
        }
    }
}
