use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A connected duplex stream: implements Read + Write.
///
/// This is the fundamental I/O type returned by transport operations.
/// It wraps a TCP stream, or a Unix domain socket stream for local
/// servers and bouncers.
pub struct ChatStream {
    inner: ChatStreamInner,
}

enum ChatStreamInner {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for ChatStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ChatStreamInner::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ChatStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ChatStreamInner::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            ChatStreamInner::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl From<TcpStream> for ChatStream {
    fn from(stream: TcpStream) -> Self {
        Self {
            inner: ChatStreamInner::Tcp(stream),
        }
    }
}

#[cfg(unix)]
impl From<std::os::unix::net::UnixStream> for ChatStream {
    fn from(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: ChatStreamInner::Unix(stream),
        }
    }
}

impl ChatStream {
    /// Connect to a line server listening on a Unix domain socket path.
    #[cfg(unix)]
    pub fn connect_unix(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let stream =
            std::os::unix::net::UnixStream::connect(path).map_err(|e| TransportError::Connect {
                addr: path.display().to_string(),
                source: e,
            })?;
        debug!(?path, "connected to unix domain socket");
        Ok(stream.into())
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            ChatStreamInner::Tcp(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        match &self.inner {
            ChatStreamInner::Tcp(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    ///
    /// Used to split one connection into a read half and a write half.
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            ChatStreamInner::Tcp(stream) => Ok(stream.try_clone()?.into()),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => Ok(stream.try_clone()?.into()),
        }
    }

    /// Shut down both directions of the connection.
    ///
    /// Any clone of this stream observes end-of-stream afterwards.
    pub fn shutdown(&self) -> Result<()> {
        let result = match &self.inner {
            ChatStreamInner::Tcp(stream) => stream.shutdown(Shutdown::Both),
            #[cfg(unix)]
            ChatStreamInner::Unix(stream) => stream.shutdown(Shutdown::Both),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => {
                Err(TransportError::Shutdown)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remote address, when the stream is a TCP connection.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        match &self.inner {
            ChatStreamInner::Tcp(stream) => stream.peer_addr().ok(),
            #[cfg(unix)]
            ChatStreamInner::Unix(_) => None,
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            ChatStreamInner::Tcp(_) => "tcp",
            #[cfg(unix)]
            ChatStreamInner::Unix(_) => "unix-domain-socket",
        }
    }
}

impl std::fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatStream")
            .field("type", &self.transport_name())
            .field("peer", &self.peer_addr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn unix_pair_read_write() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut left = ChatStream::from(left);
        let mut right = ChatStream::from(right);

        left.write_all(b"PING :x\r\n").unwrap();
        let mut buf = [0u8; 9];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"PING :x\r\n");
        assert_eq!(left.transport_name(), "unix-domain-socket");
        assert!(left.peer_addr().is_none());
    }

    #[test]
    #[cfg(unix)]
    fn clone_shares_connection() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let writer = ChatStream::from(left);
        let mut clone = writer.try_clone().unwrap();
        let mut right = ChatStream::from(right);

        clone.write_all(b"hi\n").unwrap();
        let mut buf = [0u8; 3];
        right.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"hi\n");
    }

    #[test]
    #[cfg(unix)]
    fn shutdown_signals_eof_to_clone() {
        let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
        let stream = ChatStream::from(left);
        let mut reader = stream.try_clone().unwrap();

        stream.shutdown().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    #[cfg(unix)]
    fn connect_unix_reaches_listener() {
        let dir = std::env::temp_dir().join(format!("chatline-stream-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("server.sock");
        let _ = std::fs::remove_file(&path);
        let listener = std::os::unix::net::UnixListener::bind(&path).unwrap();

        let mut client = ChatStream::connect_unix(&path).unwrap();
        let (server, _) = listener.accept().unwrap();
        let mut server = ChatStream::from(server);

        client.set_read_timeout(Some(Duration::from_secs(1))).unwrap();
        server.write_all(b"001\n").unwrap();
        let mut buf = [0u8; 4];
        client.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"001\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    #[cfg(unix)]
    fn connect_unix_missing_path_names_it() {
        let err = ChatStream::connect_unix("/nonexistent/chatline/x.sock").unwrap_err();
        match err {
            TransportError::Connect { addr, .. } => assert!(addr.ends_with("x.sock")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn debug_names_transport() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let stream = ChatStream::from(TcpStream::connect(addr).unwrap());
        let rendered = format!("{stream:?}");
        assert!(rendered.contains("tcp"));
        assert_eq!(stream.peer_addr(), Some(addr));
    }
}
