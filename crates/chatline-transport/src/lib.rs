//! Duplex stream transport for line-oriented chat protocols.
//!
//! This is the lowest layer of chatline. It owns the socket and nothing else:
//! connecting, timeouts, and splitting one connection into independent read
//! and write halves. Everything else builds on top of the [`ChatStream`]
//! type provided here.

pub mod error;
pub mod stream;
pub mod tcp;

pub use error::{Result, TransportError};
pub use stream::ChatStream;
pub use tcp::TcpTransport;
