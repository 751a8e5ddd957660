//! Minimal client for line-oriented chat protocols.
//!
//! chatline turns a raw text stream into parsed messages and routes them to
//! the handlers that asked for them; outbound commands go back as single
//! lines.
//!
//! # Crate Structure
//!
//! - [`transport`]: TCP / Unix stream transport
//! - [`frame`]: Line framing, message parsing, async codec (behind `async` feature)
//! - [`client`]: Event bus and client façade (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use chatline_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use chatline_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use chatline_client::*;
}
