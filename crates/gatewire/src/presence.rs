use serde::{Deserialize, Serialize};

/// Self-presence status as sent in IDENTIFY and STATUS_UPDATE frames.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Idle => "idle",
            Status::Dnd => "dnd",
            Status::Invisible => "invisible",
            Status::Offline => "offline",
        }
    }
}

/// The activity shown under the user's name. `kind` is 0 (playing),
/// 1 (streaming, requires `url`) or 2 (listening).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Activity {
    pub fn playing(name: impl Into<String>) -> Self {
        Activity {
            name: name.into(),
            kind: 0,
            url: None,
        }
    }

    pub fn streaming(name: impl Into<String>, url: impl Into<String>) -> Self {
        Activity {
            name: name.into(),
            kind: 1,
            url: Some(url.into()),
        }
    }

    pub fn listening(name: impl Into<String>) -> Self {
        Activity {
            name: name.into(),
            kind: 2,
            url: None,
        }
    }
}

/// A full self-presence snapshot. The shard keeps one live copy, refreshed
/// from the client default on hard reset.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presence {
    pub status: Status,
    pub afk: bool,
    pub game: Option<Activity>,
}

impl Presence {
    pub fn online() -> Self {
        Presence::default()
    }

    pub fn with_game(status: Status, game: Activity) -> Self {
        Presence {
            status,
            afk: false,
            game: Some(game),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&Status::Dnd).expect("status json");
        assert_eq!(json, "\"dnd\"");
    }

    #[test]
    fn streaming_activity_carries_url() {
        let game = Activity::streaming("speedrun", "https://stream.example/live");
        let json = serde_json::to_value(&game).expect("activity json");
        assert_eq!(json["type"], 1);
        assert_eq!(json["url"], "https://stream.example/live");
    }

    #[test]
    fn playing_activity_omits_url() {
        let json = serde_json::to_value(Activity::playing("chess")).expect("activity json");
        assert!(json.get("url").is_none());
    }
}
