use serde::Deserialize;
use serde_json::Value;

/// A decoded dispatch frame. Variants carry the raw payload; the domain layer
/// owns the typed interpretation. Names the core does not recognize are kept
/// as [`Event::Unknown`] instead of being dropped on the floor.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Ready(Value),
    Resumed(Value),
    GuildCreate(Value),
    GuildDelete(Value),
    GuildUpdate(Value),
    GuildBanAdd(Value),
    GuildBanRemove(Value),
    GuildEmojisUpdate(Value),
    GuildMemberAdd(Value),
    GuildMemberRemove(Value),
    GuildMemberUpdate(Value),
    GuildMembersChunk(Value),
    GuildRoleCreate(Value),
    GuildRoleDelete(Value),
    GuildRoleUpdate(Value),
    GuildSync(Value),
    ChannelCreate(Value),
    ChannelDelete(Value),
    ChannelUpdate(Value),
    ChannelPinsUpdate(Value),
    ChannelRecipientAdd(Value),
    ChannelRecipientRemove(Value),
    MessageCreate(Value),
    MessageUpdate(Value),
    MessageDelete(Value),
    MessageDeleteBulk(Value),
    MessageReactionAdd(Value),
    MessageReactionRemove(Value),
    MessageReactionRemoveAll(Value),
    PresenceUpdate(Value),
    PresencesReplace(Value),
    TypingStart(Value),
    UserUpdate(Value),
    VoiceStateUpdate(Value),
    VoiceServerUpdate(Value),
    RelationshipAdd(Value),
    RelationshipRemove(Value),
    WebhooksUpdate(Value),
    Unknown(String, Value),
}

impl Event {
    pub fn from_wire(name: &str, data: Value) -> Event {
        match name {
            "READY" => Event::Ready(data),
            "RESUMED" => Event::Resumed(data),
            "GUILD_CREATE" => Event::GuildCreate(data),
            "GUILD_DELETE" => Event::GuildDelete(data),
            "GUILD_UPDATE" => Event::GuildUpdate(data),
            "GUILD_BAN_ADD" => Event::GuildBanAdd(data),
            "GUILD_BAN_REMOVE" => Event::GuildBanRemove(data),
            "GUILD_EMOJIS_UPDATE" => Event::GuildEmojisUpdate(data),
            "GUILD_MEMBER_ADD" => Event::GuildMemberAdd(data),
            "GUILD_MEMBER_REMOVE" => Event::GuildMemberRemove(data),
            "GUILD_MEMBER_UPDATE" => Event::GuildMemberUpdate(data),
            "GUILD_MEMBERS_CHUNK" => Event::GuildMembersChunk(data),
            "GUILD_ROLE_CREATE" => Event::GuildRoleCreate(data),
            "GUILD_ROLE_DELETE" => Event::GuildRoleDelete(data),
            "GUILD_ROLE_UPDATE" => Event::GuildRoleUpdate(data),
            "GUILD_SYNC" => Event::GuildSync(data),
            "CHANNEL_CREATE" => Event::ChannelCreate(data),
            "CHANNEL_DELETE" => Event::ChannelDelete(data),
            "CHANNEL_UPDATE" => Event::ChannelUpdate(data),
            "CHANNEL_PINS_UPDATE" => Event::ChannelPinsUpdate(data),
            "CHANNEL_RECIPIENT_ADD" => Event::ChannelRecipientAdd(data),
            "CHANNEL_RECIPIENT_REMOVE" => Event::ChannelRecipientRemove(data),
            "MESSAGE_CREATE" => Event::MessageCreate(data),
            "MESSAGE_UPDATE" => Event::MessageUpdate(data),
            "MESSAGE_DELETE" => Event::MessageDelete(data),
            "MESSAGE_DELETE_BULK" => Event::MessageDeleteBulk(data),
            "MESSAGE_REACTION_ADD" => Event::MessageReactionAdd(data),
            "MESSAGE_REACTION_REMOVE" => Event::MessageReactionRemove(data),
            "MESSAGE_REACTION_REMOVE_ALL" => Event::MessageReactionRemoveAll(data),
            "PRESENCE_UPDATE" => Event::PresenceUpdate(data),
            "PRESENCES_REPLACE" => Event::PresencesReplace(data),
            "TYPING_START" => Event::TypingStart(data),
            "USER_UPDATE" => Event::UserUpdate(data),
            "VOICE_STATE_UPDATE" => Event::VoiceStateUpdate(data),
            "VOICE_SERVER_UPDATE" => Event::VoiceServerUpdate(data),
            "RELATIONSHIP_ADD" => Event::RelationshipAdd(data),
            "RELATIONSHIP_REMOVE" => Event::RelationshipRemove(data),
            "WEBHOOKS_UPDATE" => Event::WebhooksUpdate(data),
            other => Event::Unknown(other.to_owned(), data),
        }
    }

    /// The wire name this event decoded from.
    pub fn name(&self) -> &str {
        match self {
            Event::Ready(_) => "READY",
            Event::Resumed(_) => "RESUMED",
            Event::GuildCreate(_) => "GUILD_CREATE",
            Event::GuildDelete(_) => "GUILD_DELETE",
            Event::GuildUpdate(_) => "GUILD_UPDATE",
            Event::GuildBanAdd(_) => "GUILD_BAN_ADD",
            Event::GuildBanRemove(_) => "GUILD_BAN_REMOVE",
            Event::GuildEmojisUpdate(_) => "GUILD_EMOJIS_UPDATE",
            Event::GuildMemberAdd(_) => "GUILD_MEMBER_ADD",
            Event::GuildMemberRemove(_) => "GUILD_MEMBER_REMOVE",
            Event::GuildMemberUpdate(_) => "GUILD_MEMBER_UPDATE",
            Event::GuildMembersChunk(_) => "GUILD_MEMBERS_CHUNK",
            Event::GuildRoleCreate(_) => "GUILD_ROLE_CREATE",
            Event::GuildRoleDelete(_) => "GUILD_ROLE_DELETE",
            Event::GuildRoleUpdate(_) => "GUILD_ROLE_UPDATE",
            Event::GuildSync(_) => "GUILD_SYNC",
            Event::ChannelCreate(_) => "CHANNEL_CREATE",
            Event::ChannelDelete(_) => "CHANNEL_DELETE",
            Event::ChannelUpdate(_) => "CHANNEL_UPDATE",
            Event::ChannelPinsUpdate(_) => "CHANNEL_PINS_UPDATE",
            Event::ChannelRecipientAdd(_) => "CHANNEL_RECIPIENT_ADD",
            Event::ChannelRecipientRemove(_) => "CHANNEL_RECIPIENT_REMOVE",
            Event::MessageCreate(_) => "MESSAGE_CREATE",
            Event::MessageUpdate(_) => "MESSAGE_UPDATE",
            Event::MessageDelete(_) => "MESSAGE_DELETE",
            Event::MessageDeleteBulk(_) => "MESSAGE_DELETE_BULK",
            Event::MessageReactionAdd(_) => "MESSAGE_REACTION_ADD",
            Event::MessageReactionRemove(_) => "MESSAGE_REACTION_REMOVE",
            Event::MessageReactionRemoveAll(_) => "MESSAGE_REACTION_REMOVE_ALL",
            Event::PresenceUpdate(_) => "PRESENCE_UPDATE",
            Event::PresencesReplace(_) => "PRESENCES_REPLACE",
            Event::TypingStart(_) => "TYPING_START",
            Event::UserUpdate(_) => "USER_UPDATE",
            Event::VoiceStateUpdate(_) => "VOICE_STATE_UPDATE",
            Event::VoiceServerUpdate(_) => "VOICE_SERVER_UPDATE",
            Event::RelationshipAdd(_) => "RELATIONSHIP_ADD",
            Event::RelationshipRemove(_) => "RELATIONSHIP_REMOVE",
            Event::WebhooksUpdate(_) => "WEBHOOKS_UPDATE",
            Event::Unknown(name, _) => name,
        }
    }

    pub fn data(&self) -> &Value {
        match self {
            Event::Ready(d)
            | Event::Resumed(d)
            | Event::GuildCreate(d)
            | Event::GuildDelete(d)
            | Event::GuildUpdate(d)
            | Event::GuildBanAdd(d)
            | Event::GuildBanRemove(d)
            | Event::GuildEmojisUpdate(d)
            | Event::GuildMemberAdd(d)
            | Event::GuildMemberRemove(d)
            | Event::GuildMemberUpdate(d)
            | Event::GuildMembersChunk(d)
            | Event::GuildRoleCreate(d)
            | Event::GuildRoleDelete(d)
            | Event::GuildRoleUpdate(d)
            | Event::GuildSync(d)
            | Event::ChannelCreate(d)
            | Event::ChannelDelete(d)
            | Event::ChannelUpdate(d)
            | Event::ChannelPinsUpdate(d)
            | Event::ChannelRecipientAdd(d)
            | Event::ChannelRecipientRemove(d)
            | Event::MessageCreate(d)
            | Event::MessageUpdate(d)
            | Event::MessageDelete(d)
            | Event::MessageDeleteBulk(d)
            | Event::MessageReactionAdd(d)
            | Event::MessageReactionRemove(d)
            | Event::MessageReactionRemoveAll(d)
            | Event::PresenceUpdate(d)
            | Event::PresencesReplace(d)
            | Event::TypingStart(d)
            | Event::UserUpdate(d)
            | Event::VoiceStateUpdate(d)
            | Event::VoiceServerUpdate(d)
            | Event::RelationshipAdd(d)
            | Event::RelationshipRemove(d)
            | Event::WebhooksUpdate(d)
            | Event::Unknown(_, d) => d,
        }
    }
}

/// Collaborator interface for the domain cache. The core hands every decoded,
/// non-disabled dispatch to the sink in wire order; it never caches domain
/// objects itself.
pub trait DomainSink {
    fn apply(&mut self, event: &Event);
}

/// A sink that drops everything. Useful for hosts that only consume signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DomainSink for NullSink {
    fn apply(&mut self, _event: &Event) {}
}

/// The slice of the READY payload the core itself consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyData {
    pub session_id: String,
    #[serde(default)]
    pub user: ReadyUser,
    #[serde(default)]
    pub guilds: Vec<GuildStub>,
    #[serde(default, rename = "_trace")]
    pub trace: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyUser {
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_bot")]
    pub bot: bool,
}

impl Default for ReadyUser {
    fn default() -> Self {
        ReadyUser {
            id: String::new(),
            bot: true,
        }
    }
}

fn default_bot() -> bool {
    // a payload that doesn't say is assumed to be a bot; the guild-sync path
    // only exists for user sessions
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuildStub {
    pub id: String,
    #[serde(default)]
    pub unavailable: bool,
    #[serde(default)]
    pub large: bool,
    #[serde(default)]
    pub member_count: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_name_roundtrips() {
        let ev = Event::from_wire("MESSAGE_CREATE", json!({"id": "1"}));
        assert_eq!(ev.name(), "MESSAGE_CREATE");
        assert_eq!(ev.data()["id"], "1");
    }

    #[test]
    fn unrecognized_name_is_preserved() {
        let ev = Event::from_wire("CALL_CREATE", json!({"channel_id": "2"}));
        assert_eq!(ev, Event::Unknown("CALL_CREATE".into(), json!({"channel_id": "2"})));
        assert_eq!(ev.name(), "CALL_CREATE");
    }

    #[test]
    fn ready_data_defaults() {
        let d: ReadyData = serde_json::from_value(json!({
            "session_id": "abc",
            "guilds": [{"id": "1", "unavailable": true}, {"id": "2"}]
        }))
        .expect("ready data");

        assert_eq!(d.session_id, "abc");
        assert!(d.user.bot, "sessions default to bot");
        assert!(d.guilds[0].unavailable);
        assert!(!d.guilds[1].unavailable);
        assert!(d.trace.is_empty());
    }
}
