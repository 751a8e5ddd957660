use chatline_transport::{ChatStream, TcpTransport};
use tracing::debug;

use crate::client::{Client, ClientConfig};
use crate::error::Result;

/// Connect to a server at `host:port` with default configuration.
pub fn connect(addr: &str) -> Result<Client<ChatStream, ChatStream>> {
    connect_with_config(addr, ClientConfig::default())
}

/// Connect with explicit configuration.
pub fn connect_with_config(
    addr: &str,
    config: ClientConfig,
) -> Result<Client<ChatStream, ChatStream>> {
    let stream = TcpTransport::connect_with_timeout(addr, config.connect_timeout)?;
    from_stream(stream, config)
}

/// Connect to a server listening on a Unix domain socket.
#[cfg(unix)]
pub fn connect_unix(
    path: impl AsRef<std::path::Path>,
    config: ClientConfig,
) -> Result<Client<ChatStream, ChatStream>> {
    let stream = ChatStream::connect_unix(path)?;
    from_stream(stream, config)
}

/// Split one stream into read and write halves and wrap them in a client.
fn from_stream(stream: ChatStream, config: ClientConfig) -> Result<Client<ChatStream, ChatStream>> {
    let reader = stream.try_clone()?;
    reader.set_read_timeout(config.frame.read_timeout)?;
    stream.set_write_timeout(config.frame.write_timeout)?;
    debug!(stream = ?stream, "client connected");
    Ok(Client::with_config(reader, stream, config))
}
