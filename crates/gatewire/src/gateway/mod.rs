mod batch;
mod bucket;
mod close;
pub mod codec;
mod heartbeat;
mod outbound;
mod ready;
pub mod shard;
pub mod transport;
pub mod websocket;
pub mod wire;

#[cfg(test)]
pub mod test_utils;

use crate::error::Error;
use crate::event::Event;
use wire::Envelope;

pub use close::{classify, CloseDisposition, Retry, SessionImpact};
pub use codec::{FrameCodec, InflateStrategy, FLUSH_SENTINEL};
pub use shard::Shard;

/// Where the session lifecycle currently stands. Only `Ready` lets domain
/// events reach the host's signal stream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Handshaking,
    Resuming,
    Ready,
}

/// Everything a shard makes observable, drained via [`Shard::try_recv`].
#[derive(Debug)]
pub enum ShardSignal {
    /// The socket opened; the handshake is underway.
    Connect,
    Hello {
        trace: Vec<String>,
    },
    /// READY packet received; the ready gate is still draining.
    PreReady,
    Ready,
    Resume,
    Disconnect(Option<Error>),
    /// A live-session domain event, in wire order.
    Event(Event),
    /// Every decoded inbound envelope, when `raw_frames` is set.
    Raw(Envelope),
    /// A packet the core does not understand.
    Unknown(Envelope),
    Warn(String),
    Error(Error),
}
