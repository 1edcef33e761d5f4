use std::time::Duration;

use hashbrown::HashSet;

use crate::gateway::codec::InflateStrategy;
use crate::gateway::transport::TransportOptions;
use crate::presence::Presence;

/// Wire encoding negotiated at session init and sticky for the session.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Textual JSON envelopes.
    #[default]
    Json,
    /// Compact binary envelopes (MessagePack).
    Pack,
}

impl Encoding {
    pub fn query_value(&self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::Pack => "pack",
        }
    }
}

/// Client configuration recognized by the shard core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Authentication token. Required before `connect`.
    pub token: String,

    /// Gateway endpoint, e.g. `wss://gateway.example.gg`.
    pub gateway_url: String,

    /// Re-arm the reconnect timer after recoverable disconnects.
    pub autoreconnect: bool,

    /// Negotiate transport compression (zlib stream with sync-flush framing).
    pub compress: bool,

    /// Which inflate pipeline services compressed frames.
    pub inflate: InflateStrategy,

    pub encoding: Encoding,

    /// Member-list threshold above which a guild arrives without offline members.
    pub large_threshold: u32,

    pub shard_id: u16,
    pub max_shards: u16,

    /// Dispatch names that are dropped before reaching the domain sink.
    pub disable_events: HashSet<String>,

    pub connection_timeout: Duration,
    pub guild_create_timeout: Duration,

    /// Request member chunks for every large guild after READY.
    pub get_all_users: bool,

    /// Emit a `Raw` signal for every decoded inbound envelope.
    pub raw_frames: bool,

    /// Default presence template; the live snapshot is re-copied from this on
    /// hard reset. `None` omits presence from IDENTIFY.
    pub presence: Option<Presence>,

    pub transport: TransportOptions,
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Config {
            token: token.into(),
            gateway_url: String::new(),
            autoreconnect: true,
            compress: false,
            inflate: InflateStrategy::default(),
            encoding: Encoding::default(),
            large_threshold: 250,
            shard_id: 0,
            max_shards: 1,
            disable_events: HashSet::new(),
            connection_timeout: Duration::from_secs(30),
            guild_create_timeout: Duration::from_millis(2000),
            get_all_users: false,
            raw_frames: false,
            presence: None,
            transport: TransportOptions::default(),
        }
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    pub fn with_compression(mut self, strategy: InflateStrategy) -> Self {
        self.compress = true;
        self.inflate = strategy;
        self
    }

    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_shard(mut self, id: u16, total: u16) -> Self {
        self.shard_id = id;
        self.max_shards = total;
        self
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = Some(presence);
        self
    }

    pub fn disable_event(mut self, name: impl Into<String>) -> Self {
        self.disable_events.insert(name.into());
        self
    }
}
