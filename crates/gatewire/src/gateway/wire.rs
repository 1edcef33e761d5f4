use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::presence::Presence;

/// Gateway protocol version spoken by this crate.
pub const GATEWAY_VERSION: u8 = 6;

/// Numeric opcodes. Values are protocol-defined and must match upstream.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Dispatch = 0,
    Heartbeat = 1,
    Identify = 2,
    StatusUpdate = 3,
    VoiceStateUpdate = 4,
    Resume = 6,
    Reconnect = 7,
    GetGuildMembers = 8,
    InvalidSession = 9,
    Hello = 10,
    HeartbeatAck = 11,
    SyncGuild = 12,
}

impl Opcode {
    pub fn from_u8(op: u8) -> Option<Opcode> {
        Some(match op {
            0 => Opcode::Dispatch,
            1 => Opcode::Heartbeat,
            2 => Opcode::Identify,
            3 => Opcode::StatusUpdate,
            4 => Opcode::VoiceStateUpdate,
            6 => Opcode::Resume,
            7 => Opcode::Reconnect,
            8 => Opcode::GetGuildMembers,
            9 => Opcode::InvalidSession,
            10 => Opcode::Hello,
            11 => Opcode::HeartbeatAck,
            12 => Opcode::SyncGuild,
            _ => return None,
        })
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The wire envelope, both directions: `{op, d, s?, t?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl Envelope {
    pub fn outbound(op: Opcode, d: Value) -> Envelope {
        Envelope {
            op: op.as_u8(),
            d,
            s: None,
            t: None,
        }
    }
}

/// HELLO payload slice the core consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct Hello {
    #[serde(default)]
    pub heartbeat_interval: u64,
    #[serde(default, rename = "_trace")]
    pub trace: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IdentifyProperties<'a> {
    pub os: &'a str,
    pub browser: &'a str,
    pub device: &'a str,
}

impl Default for IdentifyProperties<'_> {
    fn default() -> Self {
        IdentifyProperties {
            os: std::env::consts::OS,
            browser: "gatewire",
            device: "gatewire",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Identify<'a> {
    pub token: &'a str,
    pub v: u8,
    pub compress: bool,
    pub large_threshold: u32,
    pub properties: IdentifyProperties<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shard: Option<[u16; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<&'a Presence>,
}

#[derive(Debug, Serialize)]
pub struct Resume<'a> {
    pub token: &'a str,
    pub session_id: &'a str,
    pub seq: u64,
}

/// Member-fetch request; `query: ""` with `limit: 0` asks for everyone.
#[derive(Debug, Serialize)]
pub struct RequestMembers<'a> {
    pub guild_id: &'a [String],
    pub query: &'a str,
    pub limit: u32,
}

#[derive(Debug, Serialize)]
pub struct VoiceStateUpdate<'a> {
    pub guild_id: &'a str,
    pub channel_id: Option<&'a str>,
    pub self_mute: bool,
    pub self_deaf: bool,
}
