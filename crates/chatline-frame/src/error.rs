/// Errors that can occur during line framing.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A record (or an unterminated run of bytes) exceeds the configured cap.
    #[error("line too long ({size} bytes, max {max})")]
    LineTooLong { size: usize, max: usize },

    /// An I/O error occurred while reading or writing records.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete record was received.
    #[error("connection closed (incomplete line)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
