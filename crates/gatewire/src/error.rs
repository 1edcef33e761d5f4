use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("existing connection detected")]
    AlreadyConnected,

    #[error("token not specified")]
    MissingToken,

    #[error("connection timed out")]
    ConnectionTimeout,

    #[error("connection reset by peer")]
    ConnectionReset,

    #[error("Server didn't acknowledge previous heartbeat, possible lost connection")]
    HeartbeatLost,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("invalid shard key")]
    InvalidShardKey,

    #[error("too many guilds")]
    TooManyGuilds,

    /// Non-fatal gateway close, `<code>: <reason>`.
    #[error("{code}: {reason}")]
    CloseCode { code: u16, reason: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("inflate failed: {0}")]
    Inflate(String),

    #[error("payload decode failed: {0}")]
    Pack(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Transport(s)
    }
}
