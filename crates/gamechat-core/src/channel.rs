//! Chat-channel side of the bridge: presence status and channel actions

use crate::event::Event;
use crate::sanitize::Sanitizer;
use serde::{Deserialize, Serialize};

/// What the chat platform should do in response to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "text", rename_all = "snake_case")]
pub enum ChannelAction {
    /// Post a message to the bridged channel
    SendMessage(String),
    /// Replace the bot's presence / activity text
    SetStatus(String),
}

/// Last known map and player count, rendered as presence text.
///
/// Owned by the dispatcher; every update goes through [`ChannelStatus::apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStatus {
    map_name: Option<String>,
    player_count: Option<u32>,
}

impl ChannelStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map_name(&self) -> Option<&str> {
        self.map_name.as_deref()
    }

    pub fn player_count(&self) -> Option<u32> {
        self.player_count
    }

    /// Presence text, e.g. `mp_facility (12)`
    pub fn presence(&self) -> String {
        let map = self.map_name.as_deref().unwrap_or("unknown");
        match self.player_count {
            Some(count) => format!("{map} ({count})"),
            None => format!("{map} (?)"),
        }
    }

    /// Update the status from an event and return the channel action it maps to
    pub fn apply(&mut self, event: &Event) -> ChannelAction {
        match event {
            Event::PlayerMessage {
                player_name,
                message,
            } => ChannelAction::SendMessage(format!("**{player_name}**: {message}")),
            Event::MapStarted { map_name } => {
                self.map_name = Some(map_name.clone());
                ChannelAction::SetStatus(self.presence())
            }
            Event::PlayerCountChanged { player_count } => {
                self.player_count = Some(*player_count);
                ChannelAction::SetStatus(self.presence())
            }
            Event::PlayerJoined { player_name } => {
                ChannelAction::SendMessage(format!("*{player_name} joined the server*"))
            }
            Event::PlayerLeft { player_name } => {
                ChannelAction::SendMessage(format!("*{player_name} left the server*"))
            }
            Event::RunFinished {
                player_name,
                run_id,
                time_str,
                map_name,
                route_name,
            } => ChannelAction::SendMessage(format!(
                "**{player_name}** finished {map_name} ({route_name}) in {time_str} [run {run_id}]"
            )),
            Event::PlayerRenamed { old_name, new_name } => {
                ChannelAction::SendMessage(format!("*{old_name} is now known as {new_name}*"))
            }
        }
    }
}

/// A message posted in the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub guild_id: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
}

/// Decides which channel messages are relayed into the game
#[derive(Debug, Clone)]
pub struct ChannelFilter {
    guild_id: String,
    channel_id: String,
    self_id: Option<String>,
    sanitizer: Sanitizer,
}

impl ChannelFilter {
    pub fn new(
        guild_id: impl Into<String>,
        channel_id: impl Into<String>,
        sanitizer: Sanitizer,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            channel_id: channel_id.into(),
            self_id: None,
            sanitizer,
        }
    }

    /// Set the bridge's own author id so its messages are not echoed back
    pub fn with_self_id(mut self, self_id: impl Into<String>) -> Self {
        self.self_id = Some(self_id.into());
        self
    }

    /// Returns the sanitized `(name, message)` to relay, or `None` if the
    /// message is from elsewhere, from the bridge itself, or fails validation
    pub fn accept(&self, message: &ChannelMessage) -> Option<(String, String)> {
        if message.guild_id != self.guild_id || message.channel_id != self.channel_id {
            return None;
        }
        if self.self_id.as_deref() == Some(message.author_id.as_str()) {
            return None;
        }
        let content = self.sanitizer.clean_message(&message.content)?;
        let name = self.sanitizer.clean_name(&message.author_name)?;
        Some((name, content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::SanitizePolicy;

    #[test]
    fn test_presence_text() {
        let mut status = ChannelStatus::new();
        assert_eq!(status.presence(), "unknown (?)");

        let action = status.apply(&Event::PlayerCountChanged { player_count: 5 });
        assert_eq!(action, ChannelAction::SetStatus("unknown (5)".into()));

        let action = status.apply(&Event::MapStarted {
            map_name: "mp_facility".into(),
        });
        assert_eq!(action, ChannelAction::SetStatus("mp_facility (5)".into()));
        assert_eq!(status.map_name(), Some("mp_facility"));
        assert_eq!(status.player_count(), Some(5));
    }

    #[test]
    fn test_map_without_count() {
        let mut status = ChannelStatus::new();
        let action = status.apply(&Event::MapStarted {
            map_name: "crossfire".into(),
        });
        assert_eq!(action, ChannelAction::SetStatus("crossfire (?)".into()));
    }

    #[test]
    fn test_player_message_action() {
        let mut status = ChannelStatus::new();
        let action = status.apply(&Event::PlayerMessage {
            player_name: "Alice".into(),
            message: "gg".into(),
        });
        assert_eq!(action, ChannelAction::SendMessage("**Alice**: gg".into()));
        assert_eq!(status, ChannelStatus::new());
    }

    #[test]
    fn test_action_json_format() {
        let json = serde_json::to_string(&ChannelAction::SetStatus("x (1)".into())).unwrap();
        assert_eq!(json, r#"{"action":"set_status","text":"x (1)"}"#);
    }

    fn message(author: &str, content: &str) -> ChannelMessage {
        ChannelMessage {
            guild_id: "1".into(),
            channel_id: "2".into(),
            author_id: "100".into(),
            author_name: author.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_filter_accepts_channel_messages() {
        let filter = ChannelFilter::new("1", "2", Sanitizer::new(SanitizePolicy::Blacklist, 3));
        assert_eq!(
            filter.accept(&message("Alice", "hi \"there\"")),
            Some(("Alice".into(), "hi .there.".into()))
        );
        assert_eq!(filter.accept(&message("Al", "hi")), None);
        assert_eq!(filter.accept(&message("Alice", "")), None);

        let mut other = message("Alice", "hi");
        other.channel_id = "3".into();
        assert_eq!(filter.accept(&other), None);
    }

    #[test]
    fn test_filter_ignores_own_messages() {
        let filter = ChannelFilter::new("1", "2", Sanitizer::new(SanitizePolicy::Blacklist, 3))
            .with_self_id("100");
        assert_eq!(filter.accept(&message("Bridge", "echo")), None);
    }
}
