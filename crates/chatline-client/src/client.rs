use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chatline_frame::{FrameConfig, LineFramer, LineWriter, Message};
use tracing::{debug, trace, warn};

use crate::bus::{EventBus, HandlerResult, Subscription};
use crate::error::{ClientError, Result};
use crate::target::Target;

const DEFAULT_READ_CHUNK_SIZE: usize = 4 * 1024;

/// Client behavior configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Framing rules for both directions.
    pub frame: FrameConfig,
    /// Maximum bytes pulled from the transport per delivery.
    pub read_chunk_size: usize,
    /// Per-address connect timeout used by [`connect`](crate::connect).
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            connect_timeout: Some(Duration::from_secs(10)),
        }
    }
}

/// Lifecycle of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Deliveries are framed, parsed and dispatched.
    Connected,
    /// The transport is gone; nothing more is fed.
    Closed,
}

/// Totals for one delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Records framed, parsed and dispatched.
    pub records: usize,
    /// Handler invocations across those records.
    pub delivered: usize,
    /// Handler invocations that returned an error or panicked.
    pub failed: usize,
    /// Records dropped for exceeding the configured line cap.
    pub oversized: usize,
}

impl FeedReport {
    fn absorb(&mut self, other: FeedReport) {
        self.records += other.records;
        self.delivered += other.delivered;
        self.failed += other.failed;
        self.oversized += other.oversized;
    }
}

/// Outbound half of a client. Cheap to clone and safe to capture in handlers.
pub struct Sender<W> {
    writer: Arc<Mutex<LineWriter<W>>>,
    closed: Arc<AtomicBool>,
}

impl<W> Clone for Sender<W> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<W: Write> Sender<W> {
    /// Append the line terminator to `text` and write it to the transport.
    pub fn send_raw(&self, text: &str) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClientError::Closed);
        }
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.send_raw(text)?;
        Ok(())
    }

    /// Join `parts` with single spaces and send them as one line.
    ///
    /// No escaping: parts must not contain the line terminator.
    pub fn send_command<I, S>(&self, parts: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.send_raw(&chatline_frame::join_parts(parts))
    }

    /// Run `f` against the underlying writer.
    pub fn with_writer<T>(&self, f: impl FnOnce(&mut W) -> T) -> T {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        f(writer.get_mut())
    }
}

/// Line-protocol client: framer → parser → event bus inbound, sender outbound.
///
/// Handlers receive the parsed [`Message`]; [`Message::parts`] gives the
/// `(trailing, prefix, command)` view.
pub struct Client<R, W> {
    reader: R,
    framer: LineFramer,
    bus: EventBus<Message>,
    sender: Sender<W>,
    config: ClientConfig,
    state: ConnectionState,
}

impl<R: Read, W: Write> Client<R, W> {
    /// Create a client over a read half and a write half.
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, ClientConfig::default())
    }

    /// Create a client with explicit configuration.
    pub fn with_config(reader: R, writer: W, config: ClientConfig) -> Self {
        Self {
            reader,
            framer: LineFramer::with_config(config.frame.clone()),
            bus: EventBus::new(),
            sender: Sender {
                writer: Arc::new(Mutex::new(LineWriter::with_config(
                    writer,
                    config.frame.clone(),
                ))),
                closed: Arc::new(AtomicBool::new(false)),
            },
            config,
            state: ConnectionState::Connected,
        }
    }

    /// Subscribe `handler` to messages matching `target`; chainable.
    ///
    /// ```no_run
    /// # fn demo() -> chatline_client::Result<()> {
    /// let client = chatline_client::connect("irc.example.net:6667")?;
    /// let tx = client.sender();
    /// client
    ///     .subscribe("PING", move |msg| {
    ///         tx.send_command(["PONG", msg.trailing_or_empty()])?;
    ///         Ok(())
    ///     })
    ///     .subscribe(["353", "366"], |msg| {
    ///         println!("{}", msg.trailing_or_empty());
    ///         Ok(())
    ///     });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<T, H>(&self, target: T, handler: H) -> &Self
    where
        T: Into<Target>,
        H: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscription(target, handler);
        self
    }

    /// Subscribe and keep the cancellation handle.
    pub fn subscription<T, H>(&self, target: T, handler: H) -> Subscription<Message>
    where
        T: Into<Target>,
        H: Fn(&Message) -> HandlerResult + Send + Sync + 'static,
    {
        let target = target.into();
        trace!(?target, "subscribing");
        self.bus.subscribe_filtered(handler, target.into_predicate())
    }

    /// Process one delivery: frame it, parse each record, dispatch each message.
    ///
    /// Records are dispatched strictly in arrival order; every matching
    /// handler for one record runs before the next record is parsed.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<FeedReport> {
        if self.state == ConnectionState::Closed {
            return Err(ClientError::Closed);
        }

        let encoding = self.config.frame.encoding;
        let mut report = FeedReport::default();
        for record in self.framer.feed(chunk) {
            let record = match record {
                Ok(record) => record,
                Err(_) => {
                    report.oversized += 1;
                    continue;
                }
            };
            let text = record.text(encoding);
            trace!(">>> {text}");

            let message = Message::parse(&text);
            let dispatch = self.bus.notify(&message);
            report.absorb(FeedReport {
                records: 1,
                delivered: dispatch.delivered,
                failed: dispatch.failures.len(),
                oversized: 0,
            });
        }
        Ok(report)
    }

    /// Pull one delivery from the transport and feed it.
    ///
    /// Returns `Ok(None)` once the transport reports end-of-stream; the client
    /// is then closed. A read timeout yields an empty report and keeps the
    /// client connected. Any other I/O error closes the client.
    pub fn poll(&mut self) -> Result<Option<FeedReport>> {
        if self.state == ConnectionState::Closed {
            return Err(ClientError::Closed);
        }

        let mut chunk = vec![0u8; self.config.read_chunk_size.max(1)];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.close();
                    return Ok(None);
                }
                Ok(n) => return self.feed(&chunk[..n]).map(Some),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
                {
                    return Ok(Some(FeedReport::default()));
                }
                Err(err) => {
                    warn!(error = %err, "transport read failed");
                    self.close();
                    return Err(ClientError::Disconnected(err.to_string()));
                }
            }
        }
    }

    /// Poll until the transport closes.
    pub fn run(&mut self) -> Result<FeedReport> {
        self.run_while(|_| true)
    }

    /// Poll while `keep_going` approves the running totals.
    ///
    /// Stops without closing when `keep_going` returns false.
    pub fn run_while(
        &mut self,
        mut keep_going: impl FnMut(&FeedReport) -> bool,
    ) -> Result<FeedReport> {
        let mut total = FeedReport::default();
        while keep_going(&total) {
            match self.poll()? {
                Some(report) => total.absorb(report),
                None => break,
            }
        }
        Ok(total)
    }

    /// Enter the closed state. Buffered partial input is discarded.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Closed {
            return;
        }
        if self.framer.buffered() > 0 {
            debug!(bytes = self.framer.buffered(), "discarding partial line on close");
        }
        self.framer.clear();
        self.sender.closed.store(true, Ordering::SeqCst);
        self.state = ConnectionState::Closed;
        debug!("client closed");
    }

    /// Write `text` plus the line terminator.
    pub fn send_raw(&self, text: &str) -> Result<&Self> {
        self.sender.send_raw(text)?;
        Ok(self)
    }

    /// Join `parts` with single spaces and send them; chainable.
    pub fn send_command<I, S>(&self, parts: I) -> Result<&Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.sender.send_command(parts)?;
        Ok(self)
    }

    /// Handle for sending from inside handlers.
    pub fn sender(&self) -> Sender<W> {
        self.sender.clone()
    }

    /// The client's event bus.
    pub fn bus(&self) -> &EventBus<Message> {
        &self.bus
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Current client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Borrow the read half.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }
}
