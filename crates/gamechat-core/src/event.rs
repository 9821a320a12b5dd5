//! Game events crossing from the game server into the bridge

use serde::{Deserialize, Serialize};
use std::fmt;

/// Wire id of an event kind.
///
/// These numbers are hardcoded in the game-side scripts. Never renumber,
/// only append.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PlayerMessage = 0,
    MapStarted = 1,
    PlayerCountChanged = 2,
    PlayerJoined = 3,
    PlayerLeft = 4,
    RunFinished = 5,
    PlayerRenamed = 6,
}

impl EventKind {
    /// All kinds in wire id order
    pub const ALL: [EventKind; 7] = [
        EventKind::PlayerMessage,
        EventKind::MapStarted,
        EventKind::PlayerCountChanged,
        EventKind::PlayerJoined,
        EventKind::PlayerLeft,
        EventKind::RunFinished,
        EventKind::PlayerRenamed,
    ];

    pub fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.get(id as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            EventKind::PlayerMessage => "PlayerMessage",
            EventKind::MapStarted => "MapStarted",
            EventKind::PlayerCountChanged => "PlayerCountChanged",
            EventKind::PlayerJoined => "PlayerJoined",
            EventKind::PlayerLeft => "PlayerLeft",
            EventKind::RunFinished => "RunFinished",
            EventKind::PlayerRenamed => "PlayerRenamed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed and validated game event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// In-game chat line
    PlayerMessage { player_name: String, message: String },

    /// A new map was loaded
    MapStarted { map_name: String },

    /// Number of connected players changed
    PlayerCountChanged { player_count: u32 },

    PlayerJoined { player_name: String },

    PlayerLeft { player_name: String },

    /// A player completed a run
    RunFinished {
        player_name: String,
        run_id: i64,
        time_str: String,
        map_name: String,
        route_name: String,
    },

    PlayerRenamed { old_name: String, new_name: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::PlayerMessage { .. } => EventKind::PlayerMessage,
            Event::MapStarted { .. } => EventKind::MapStarted,
            Event::PlayerCountChanged { .. } => EventKind::PlayerCountChanged,
            Event::PlayerJoined { .. } => EventKind::PlayerJoined,
            Event::PlayerLeft { .. } => EventKind::PlayerLeft,
            Event::RunFinished { .. } => EventKind::RunFinished,
            Event::PlayerRenamed { .. } => EventKind::PlayerRenamed,
        }
    }
}
