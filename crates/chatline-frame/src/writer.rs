use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use chatline_transport::ChatStream;
use tracing::trace;

use crate::codec::{encode_line, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete lines to any `Write` stream.
pub struct LineWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> LineWriter<T> {
    /// Create a new line writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new line writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Append the line terminator to `text` and write it (blocking).
    pub fn send_raw(&mut self, text: &str) -> Result<()> {
        if let Some(max) = self.config.max_line_length {
            if text.len() > max {
                return Err(FrameError::LineTooLong {
                    size: text.len(),
                    max,
                });
            }
        }

        trace!("<<< {text}");
        self.buf.clear();
        encode_line(text, &self.config, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Join `parts` with single spaces and send the result as one line.
    pub fn send_command<I, S>(&mut self, parts: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let line = join_parts(parts);
        self.send_raw(&line)
    }

    /// Send a message rendered back into wire text.
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.send_raw(&message.to_string())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current line writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl LineWriter<ChatStream> {
    /// Create a line writer for `ChatStream` and apply write timeout from config.
    pub fn with_config_stream(inner: ChatStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

/// Join command parts with a single space. No escaping.
pub fn join_parts<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut line = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        line.push_str(part.as_ref());
    }
    line
}
