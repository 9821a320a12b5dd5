//! Startup configuration
//!
//! Each game has its own `config_<game>` file of `key=value` lines. The
//! chat-platform credentials are opaque strings passed through to the
//! collaborator; only the listener settings are interpreted here.

use gamechat_bridge::ServerConfig;
use gamechat_core::CatalogProfile;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Games the bridge can be started for
pub const SUPPORTED_GAMES: [&str; 2] = ["cod2", "cod4"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Requested unsupported game {0:?}, supported are cod2 and cod4")]
    UnsupportedGame(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config contains invalid line: {0:?}")]
    InvalidLine(String),

    #[error("Unknown configuration option: {0}")]
    UnknownOption(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("Missing configuration option: {0}")]
    Missing(&'static str),
}

/// Full bridge configuration for one game instance
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Chat-platform authorization token
    pub token: String,
    /// Bridged channel
    pub channel_id: String,
    /// Guild (community) the channel belongs to
    pub guild_id: String,
    /// Listener and protocol settings
    pub server: ServerConfig,
}

impl BridgeConfig {
    /// Default config file path for a game
    pub fn default_path(game: &str) -> PathBuf {
        PathBuf::from(format!("config_{game}"))
    }

    /// Read and parse the config file for `game`
    pub fn load(game: &str, path: &Path) -> Result<Self, ConfigError> {
        validate_game(game)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(game, &contents)
    }

    /// Parse config file contents for `game`
    pub fn parse(game: &str, contents: &str) -> Result<Self, ConfigError> {
        validate_game(game)?;

        let mut token = None;
        let mut channel_id = None;
        let mut guild_id = None;
        let mut server = ServerConfig {
            game_id: game.to_string(),
            ..Default::default()
        };

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // Values may themselves contain '='
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidLine(line.to_string()))?;
            let value = value.trim();
            match key.trim() {
                "token" => token = Some(value.to_string()),
                "channelid" => channel_id = Some(value.to_string()),
                "guildid" => guild_id = Some(value.to_string()),
                "profile" => {
                    server.profile = value
                        .parse::<CatalogProfile>()
                        .map_err(|reason| ConfigError::InvalidValue {
                            key: "profile",
                            reason,
                        })?;
                }
                "platform" => server.platform = value.to_string(),
                "socket_prefix" => server.socket_prefix = value.to_string(),
                "queue_capacity" => {
                    server.queue_capacity =
                        value.parse().map_err(|e| ConfigError::InvalidValue {
                            key: "queue_capacity",
                            reason: format!("{e}"),
                        })?;
                }
                other => return Err(ConfigError::UnknownOption(other.to_string())),
            }
        }

        Ok(Self {
            token: require(token, "token")?,
            channel_id: require(channel_id, "channelid")?,
            guild_id: require(guild_id, "guildid")?,
            server,
        })
    }
}

fn validate_game(game: &str) -> Result<(), ConfigError> {
    if SUPPORTED_GAMES.contains(&game) {
        Ok(())
    } else {
        Err(ConfigError::UnsupportedGame(game.to_string()))
    }
}

fn require(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value.filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "token=abc.def=\nchannelid=123\nguildid=456\n";

    #[test]
    fn test_parse_basic_config() {
        let config = BridgeConfig::parse("cod4", BASIC).unwrap();
        assert_eq!(config.token, "abc.def=");
        assert_eq!(config.channel_id, "123");
        assert_eq!(config.guild_id, "456");
        assert_eq!(config.server.game_id, "cod4");
        assert_eq!(
            config.server.endpoint().path(),
            Path::new("/tmp/opencj_events_cod4")
        );
        assert_eq!(config.server.profile, CatalogProfile::Extended);
    }

    #[test]
    fn test_optional_settings() {
        let contents = format!(
            "{BASIC}profile=minimal\nplatform=Chat\nsocket_prefix=/run/gc_\nqueue_capacity=16\n"
        );
        let config = BridgeConfig::parse("cod2", &contents).unwrap();
        assert_eq!(config.server.profile, CatalogProfile::Minimal);
        assert_eq!(config.server.platform, "Chat");
        assert_eq!(config.server.queue_capacity, 16);
        assert_eq!(config.server.endpoint().path(), Path::new("/run/gc_cod2"));
    }

    #[test]
    fn test_unsupported_game() {
        assert!(matches!(
            BridgeConfig::parse("quake", BASIC),
            Err(ConfigError::UnsupportedGame(_))
        ));
    }

    #[test]
    fn test_invalid_line_and_unknown_option() {
        assert!(matches!(
            BridgeConfig::parse("cod4", "token\n"),
            Err(ConfigError::InvalidLine(_))
        ));
        assert!(matches!(
            BridgeConfig::parse("cod4", "color=blue\n"),
            Err(ConfigError::UnknownOption(key)) if key == "color"
        ));
        assert!(matches!(
            BridgeConfig::parse("cod4", &format!("{BASIC}queue_capacity=lots\n")),
            Err(ConfigError::InvalidValue { key: "queue_capacity", .. })
        ));
    }

    #[test]
    fn test_missing_options() {
        assert!(matches!(
            BridgeConfig::parse("cod4", "token=abc\nguildid=1\n"),
            Err(ConfigError::Missing("channelid"))
        ));
        assert!(matches!(
            BridgeConfig::parse("cod4", "token=\nchannelid=1\nguildid=1\n"),
            Err(ConfigError::Missing("token"))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("gamechat_no_such_config");
        assert!(matches!(
            BridgeConfig::load("cod4", &path),
            Err(ConfigError::Read { .. })
        ));
    }
}
