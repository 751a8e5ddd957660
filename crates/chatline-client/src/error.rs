/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] chatline_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] chatline_frame::FrameError),

    /// The client already reached the closed state.
    #[error("client is closed")]
    Closed,

    /// The server went away.
    #[error("server disconnected: {0}")]
    Disconnected(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
