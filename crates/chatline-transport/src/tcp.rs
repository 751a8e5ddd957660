use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::stream::ChatStream;

/// TCP transport.
///
/// Resolves `host:port` and connects to the first address that accepts,
/// optionally bounded by a per-address connect timeout.
pub struct TcpTransport;

impl TcpTransport {
    /// Connect to `addr` (blocking, no timeout).
    pub fn connect(addr: &str) -> Result<ChatStream> {
        Self::connect_with_timeout(addr, None)
    }

    /// Connect to `addr`, bounding each attempt by `timeout` when set.
    pub fn connect_with_timeout(addr: &str, timeout: Option<Duration>) -> Result<ChatStream> {
        let candidates: Vec<_> = addr
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect {
                addr: addr.to_string(),
                source: e,
            })?
            .collect();

        if candidates.is_empty() {
            return Err(TransportError::Resolve {
                addr: addr.to_string(),
            });
        }

        let mut last_err = None;
        for candidate in candidates {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&candidate, timeout),
                None => TcpStream::connect(candidate),
            };
            match attempt {
                Ok(stream) => {
                    // Records are small and interactive; do not batch them.
                    stream.set_nodelay(true)?;
                    debug!(%addr, peer = %candidate, "connected over tcp");
                    return Ok(stream.into());
                }
                Err(err) => {
                    debug!(%addr, peer = %candidate, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(TransportError::Connect {
            addr: addr.to_string(),
            source: last_err
                .unwrap_or_else(|| std::io::Error::other("no address accepted the connection")),
        })
    }
}
