//! Newline-delimited record framing and message parsing.
//!
//! This is the core value-add layer of chatline. Every record on the wire is:
//! - An optional `:`-marked prefix naming the origin
//! - A whitespace-free command token
//! - Optional free-text trailing parameters, never word-split
//! - A `\n` terminator (a preceding `\r` is tolerated)
//!
//! No partial reads, no buffer management in user code.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod framer;
pub mod mask;
pub mod message;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::LineCodec;
pub use codec::{
    encode_line, FrameConfig, LineDecoder, LineEnding, Record, TextEncoding, LINE_TERMINATOR,
    PREFIX_SENTINEL,
};
pub use error::{FrameError, Result};
pub use framer::LineFramer;
pub use mask::UserMask;
pub use message::{split_params, strip_sentinel, Message};
pub use reader::LineReader;
pub use writer::{join_parts, LineWriter};
