use crate::Result;

/// One WebSocket message, either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireMessage {
    Text(String),
    Binary(Vec<u8>),
}

impl WireMessage {
    pub fn len(&self) -> usize {
        match self {
            WireMessage::Text(s) => s.len(),
            WireMessage::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Transport-level events, drained by the shard each drive pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(WireMessage),
    Error(String),
    Closed {
        /// Close code when the transport surfaced one.
        code: Option<u16>,
        reason: String,
        clean: bool,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadyState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Options handed through to the transport at open time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions {
    /// Cap on a single inbound frame; `None` leaves the transport default.
    pub max_frame_size: Option<usize>,
}

/// The socket capability the core consumes. Implementations surface inbound
/// traffic through `try_recv` and wake the host loop when new events arrive.
pub trait Transport {
    fn send(&mut self, msg: WireMessage);

    fn try_recv(&mut self) -> Option<TransportEvent>;

    /// Clean close with the given code.
    fn close(&mut self, code: u16);

    /// Abrupt teardown, no close handshake. Used when the session will be
    /// resumed so the server keeps it alive.
    fn terminate(&mut self);

    fn ready_state(&self) -> ReadyState;
}

/// Opens transports. Injected at shard construction so hosts and tests can
/// substitute their own socket layer.
pub trait Connector {
    fn open(&mut self, url: &str, options: &TransportOptions) -> Result<Box<dyn Transport>>;
}
