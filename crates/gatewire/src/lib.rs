mod config;
mod error;
mod event;
pub mod gateway;
mod presence;

pub use config::{Config, Encoding};
pub use error::Error;
pub use event::{DomainSink, Event, GuildStub, NullSink, ReadyData, ReadyUser};
pub use ewebsock;
pub use gateway::transport::{
    Connector, ReadyState, Transport, TransportEvent, TransportOptions, WireMessage,
};
pub use gateway::websocket::{connector_from_fn, WebsocketConnector, WebsocketTransport};
pub use gateway::wire::{Envelope, Opcode, GATEWAY_VERSION};
pub use gateway::{ConnectionStatus, FrameCodec, InflateStrategy, Shard, ShardSignal};
pub use presence::{Activity, Presence, Status};

pub type Result<T> = std::result::Result<T, error::Error>;

pub trait Wakeup: Send + Sync + Clone + 'static {
    fn wake(&self);
}
