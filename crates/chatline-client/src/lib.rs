//! Client façade for line-oriented chat protocols.
//!
//! This is the "just works" layer. Connect to a server, subscribe handlers
//! to the commands you care about, and send commands back; framing and
//! parsing happen underneath.

pub mod bus;
pub mod client;
pub mod connector;
pub mod error;
pub mod target;

pub use bus::{
    DispatchReport, EventBus, HandlerError, HandlerFailure, HandlerResult, Subscription,
    SubscriptionId,
};
pub use client::{Client, ClientConfig, ConnectionState, FeedReport, Sender};
pub use connector::{connect, connect_with_config};
#[cfg(unix)]
pub use connector::connect_unix;
pub use error::{ClientError, Result};
pub use target::Target;
