//! Event catalog: wire id → parse function
//!
//! Each event kind has a parse function that validates the space-split
//! arguments of a protocol line and builds an [`Event`]. Malformed input
//! yields a [`Rejection`], which callers log and drop.

use crate::error::Rejection;
use crate::event::{Event, EventKind};
use crate::sanitize::{SanitizePolicy, Sanitizer};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Catalog and sanitizer combination used by a deployment.
///
/// The two profiles correspond to incompatible game-side scripts and are
/// never mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogProfile {
    /// Ids 0-2, whitelist sanitizer, names of at least 2 characters
    Minimal,
    /// Ids 0-6, blacklist sanitizer, names of at least 3 characters
    #[default]
    Extended,
}

impl CatalogProfile {
    /// Highest event id accepted by this profile
    pub fn max_event_id(self) -> u32 {
        match self {
            CatalogProfile::Minimal => EventKind::PlayerCountChanged.id(),
            CatalogProfile::Extended => EventKind::PlayerRenamed.id(),
        }
    }

    pub fn sanitizer(self) -> Sanitizer {
        match self {
            CatalogProfile::Minimal => Sanitizer::new(SanitizePolicy::Whitelist, 2),
            CatalogProfile::Extended => Sanitizer::new(SanitizePolicy::Blacklist, 3),
        }
    }
}

impl FromStr for CatalogProfile {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(CatalogProfile::Minimal),
            "extended" => Ok(CatalogProfile::Extended),
            other => Err(format!("unknown catalog profile: {other}")),
        }
    }
}

type ParseFn = fn(&Catalog, &[&str]) -> Result<Event, Rejection>;

/// Parse functions in wire id order
const PARSERS: [(EventKind, ParseFn); 7] = [
    (EventKind::PlayerMessage, parse_player_message),
    (EventKind::MapStarted, parse_map_started),
    (EventKind::PlayerCountChanged, parse_player_count),
    (EventKind::PlayerJoined, parse_player_joined),
    (EventKind::PlayerLeft, parse_player_left),
    (EventKind::RunFinished, parse_run_finished),
    (EventKind::PlayerRenamed, parse_player_renamed),
];

/// Builds events from protocol arguments
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    profile: CatalogProfile,
    sanitizer: Sanitizer,
}

impl Catalog {
    pub fn new(profile: CatalogProfile) -> Self {
        Self {
            profile,
            sanitizer: profile.sanitizer(),
        }
    }

    pub fn profile(&self) -> CatalogProfile {
        self.profile
    }

    pub fn sanitizer(&self) -> &Sanitizer {
        &self.sanitizer
    }

    /// Build an event of type `event_type` from its arguments
    pub fn create(&self, event_type: u32, args: &[&str]) -> Result<Event, Rejection> {
        if event_type > self.profile.max_event_id() {
            return Err(Rejection::UnknownEventType(event_type));
        }
        let (_, parse) = PARSERS
            .get(event_type as usize)
            .ok_or(Rejection::UnknownEventType(event_type))?;
        parse(self, args)
    }

    /// Like [`Catalog::create`], with the id still in its textual form
    pub fn create_from_token(&self, token: &str, args: &[&str]) -> Result<Event, Rejection> {
        let event_type = token
            .parse::<u32>()
            .map_err(|_| Rejection::InvalidEventType(token.to_string()))?;
        self.create(event_type, args)
    }
}

fn single_arg<'a>(kind: EventKind, args: &[&'a str]) -> Result<&'a str, Rejection> {
    match args {
        [arg] => Ok(*arg),
        _ => Err(Rejection::Arity {
            kind: kind.name(),
            expected: 1,
            got: args.len(),
        }),
    }
}

fn parse_number<T: FromStr>(field: &'static str, value: &str) -> Result<T, Rejection> {
    value.trim().parse::<T>().map_err(|_| {
        warn!("Failed to parse {} from {:?}", field, value);
        Rejection::InvalidNumber {
            field,
            value: value.to_string(),
        }
    })
}

fn clean_name(catalog: &Catalog, raw: &str) -> Result<String, Rejection> {
    catalog
        .sanitizer
        .clean_name(raw)
        .ok_or_else(|| Rejection::InvalidName(raw.to_string()))
}

fn parse_player_message(catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    // Names and messages may contain spaces, so the whole remainder is rejoined
    let text = args.join(" ");
    let (name, message) = text.split_once(';').ok_or(Rejection::MissingSeparator)?;
    Ok(Event::PlayerMessage {
        player_name: clean_name(catalog, name)?,
        message: catalog
            .sanitizer
            .clean_message(message)
            .ok_or(Rejection::EmptyMessage)?,
    })
}

fn parse_map_started(catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    let map = catalog
        .sanitizer
        .clean_field(single_arg(EventKind::MapStarted, args)?);
    let map_name = if map.is_empty() {
        "unknown".to_string()
    } else {
        map
    };
    Ok(Event::MapStarted { map_name })
}

fn parse_player_count(_catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    let count = single_arg(EventKind::PlayerCountChanged, args)?;
    Ok(Event::PlayerCountChanged {
        player_count: parse_number("player_count", count)?,
    })
}

fn parse_player_joined(catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    let name = single_arg(EventKind::PlayerJoined, args)?;
    Ok(Event::PlayerJoined {
        player_name: clean_name(catalog, name)?,
    })
}

fn parse_player_left(catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    let name = single_arg(EventKind::PlayerLeft, args)?;
    Ok(Event::PlayerLeft {
        player_name: clean_name(catalog, name)?,
    })
}

fn parse_run_finished(catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    let text = args.join(" ");
    if !text.contains(';') {
        return Err(Rejection::MissingSeparator);
    }
    // name;run_id;time;map;route -- the route keeps any further semicolons
    let mut parts = text.splitn(5, ';');
    let mut next = |field: &'static str| parts.next().ok_or(Rejection::MissingField(field));
    let name = next("player_name")?;
    let run_id = next("run_id")?;
    let time_str = next("time_str")?;
    let map_name = next("map_name")?;
    let route_name = next("route_name")?;

    let sanitizer = &catalog.sanitizer;
    Ok(Event::RunFinished {
        player_name: clean_name(catalog, name)?,
        run_id: parse_number("run_id", run_id)?,
        time_str: sanitizer.clean_field(time_str),
        map_name: sanitizer.clean_field(map_name),
        route_name: sanitizer.clean_field(route_name),
    })
}

fn parse_player_renamed(catalog: &Catalog, args: &[&str]) -> Result<Event, Rejection> {
    let text = args.join(" ");
    let (old_name, new_name) = text.split_once(';').ok_or(Rejection::MissingSeparator)?;
    Ok(Event::PlayerRenamed {
        old_name: clean_name(catalog, old_name)?,
        new_name: clean_name(catalog, new_name)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extended() -> Catalog {
        Catalog::new(CatalogProfile::Extended)
    }

    fn minimal() -> Catalog {
        Catalog::new(CatalogProfile::Minimal)
    }

    #[test]
    fn test_table_matches_wire_ids() {
        for (index, (kind, _)) in PARSERS.iter().enumerate() {
            assert_eq!(kind.id() as usize, index);
        }
    }

    #[test]
    fn test_player_message() {
        for catalog in [minimal(), extended()] {
            let event = catalog.create(0, &["Alice;hello", "world"]).unwrap();
            assert_eq!(
                event,
                Event::PlayerMessage {
                    player_name: "Alice".into(),
                    message: "hello world".into(),
                }
            );
        }
    }

    #[test]
    fn test_player_message_keeps_semicolons_in_message() {
        let event = extended().create(0, &["Bob;a;b;", "c"]).unwrap();
        assert_eq!(
            event,
            Event::PlayerMessage {
                player_name: "Bob".into(),
                message: "a;b; c".into(),
            }
        );
    }

    #[test]
    fn test_player_message_rejections() {
        let catalog = extended();
        assert_eq!(
            catalog.create(0, &["no", "separator"]),
            Err(Rejection::MissingSeparator)
        );
        assert_eq!(
            catalog.create(0, &["Al;hi"]),
            Err(Rejection::InvalidName("Al".into()))
        );
        assert_eq!(catalog.create(0, &["Alice;"]), Err(Rejection::EmptyMessage));
        // Two characters is enough for the minimal profile
        assert!(minimal().create(0, &["Al;hi"]).is_ok());
    }

    #[test]
    fn test_player_message_truncates_name() {
        let name = "n".repeat(40);
        let line = format!("{name};hi");
        match extended().create(0, &[line.as_str()]).unwrap() {
            Event::PlayerMessage { player_name, .. } => assert_eq!(player_name.len(), 32),
            other => panic!("Wrong event: {other:?}"),
        }
    }

    #[test]
    fn test_map_started() {
        let catalog = minimal();
        assert_eq!(
            catalog.create(1, &["facility"]),
            Ok(Event::MapStarted {
                map_name: "facility".into()
            })
        );
        assert_eq!(
            catalog.create(1, &[""]),
            Ok(Event::MapStarted {
                map_name: "unknown".into()
            })
        );
        assert!(matches!(
            catalog.create(1, &[]),
            Err(Rejection::Arity { expected: 1, got: 0, .. })
        ));
        assert!(matches!(
            catalog.create(1, &["a", "b"]),
            Err(Rejection::Arity { got: 2, .. })
        ));
    }

    #[test]
    fn test_player_count() {
        let catalog = minimal();
        assert_eq!(
            catalog.create(2, &["17"]),
            Ok(Event::PlayerCountChanged { player_count: 17 })
        );
        assert!(matches!(
            catalog.create(2, &["abc"]),
            Err(Rejection::InvalidNumber { field: "player_count", .. })
        ));
        assert!(matches!(
            catalog.create(2, &["-1"]),
            Err(Rejection::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_minimal_profile_rejects_extended_ids() {
        let catalog = minimal();
        assert_eq!(
            catalog.create(3, &["Alice"]),
            Err(Rejection::UnknownEventType(3))
        );
        assert_eq!(
            extended().create(3, &["Alice"]),
            Ok(Event::PlayerJoined {
                player_name: "Alice".into()
            })
        );
    }

    #[test]
    fn test_unknown_event_type() {
        assert_eq!(
            extended().create(99, &["x"]),
            Err(Rejection::UnknownEventType(99))
        );
        assert_eq!(
            extended().create_from_token("abc", &["x"]),
            Err(Rejection::InvalidEventType("abc".into()))
        );
    }

    #[test]
    fn test_player_left() {
        assert_eq!(
            extended().create(4, &["^1Zed^7"]),
            Ok(Event::PlayerLeft {
                player_name: "Zed".into()
            })
        );
    }

    #[test]
    fn test_run_finished() {
        let event = extended()
            .create(5, &["Alice;42;1:02.500;mp_facility;main", "route"])
            .unwrap();
        assert_eq!(
            event,
            Event::RunFinished {
                player_name: "Alice".into(),
                run_id: 42,
                time_str: "1:02.500".into(),
                map_name: "mp_facility".into(),
                route_name: "main route".into(),
            }
        );
    }

    #[test]
    fn test_run_finished_rejections() {
        let catalog = extended();
        assert_eq!(
            catalog.create(5, &["Alice;42;1:00;map"]),
            Err(Rejection::MissingField("route_name"))
        );
        assert!(matches!(
            catalog.create(5, &["Alice;abc;1:00;map;route"]),
            Err(Rejection::InvalidNumber { field: "run_id", .. })
        ));
        assert_eq!(
            catalog.create(5, &["Alice"]),
            Err(Rejection::MissingSeparator)
        );
        assert_eq!(
            catalog.create(5, &["Al;42;1:00;map;route"]),
            Err(Rejection::InvalidName("Al".into()))
        );
    }

    #[test]
    fn test_run_finished_route_keeps_semicolons() {
        match extended().create(5, &["Alice;1;0:10;map;a;b"]) {
            Ok(Event::RunFinished {
                route_name,
                map_name,
                ..
            }) => {
                assert_eq!(route_name, "a;b");
                assert_eq!(map_name, "map");
            }
            other => panic!("Expected RunFinished, got {:?}", other),
        }
    }

    #[test]
    fn test_player_renamed() {
        assert_eq!(
            extended().create(6, &["Alice;Alicia"]),
            Ok(Event::PlayerRenamed {
                old_name: "Alice".into(),
                new_name: "Alicia".into(),
            })
        );
        assert_eq!(
            extended().create(6, &["Alice"]),
            Err(Rejection::MissingSeparator)
        );
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("minimal".parse::<CatalogProfile>(), Ok(CatalogProfile::Minimal));
        assert_eq!(" Extended ".parse::<CatalogProfile>(), Ok(CatalogProfile::Extended));
        assert!("other".parse::<CatalogProfile>().is_err());
    }
}
