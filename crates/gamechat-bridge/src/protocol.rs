//! Line protocol between the game server and the bridge
//!
//! Game → bridge: newline-delimited ASCII lines `<event_id> <arg> <arg> ...`.
//! Bridge → game: relay lines `[<platform>] <name>: <message>`.
//!
//! Each chunk read from the socket is parsed on its own. A line split across
//! two reads is not reassembled; the game side writes whole lines per send.

use gamechat_core::{Catalog, Event, Rejection};

/// Result of parsing one chunk read from the game connection
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedChunk {
    /// Events in line order
    pub events: Vec<Event>,
    /// Lines that produced no event, with the reason
    pub rejected: Vec<(String, Rejection)>,
}

/// Decode bytes as ASCII, dropping anything outside the ASCII range
pub fn decode_ascii(data: &[u8]) -> String {
    data.iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect()
}

/// Parse a single non-empty protocol line
pub fn parse_line(catalog: &Catalog, line: &str) -> Result<Event, Rejection> {
    let (event_type, rest) = match line.split_once(' ') {
        Some((event_type, rest)) => (event_type, Some(rest)),
        None => (line, None),
    };
    let args: Vec<&str> = rest.map(|r| r.split(' ').collect()).unwrap_or_default();
    catalog.create_from_token(event_type, &args)
}

/// Parse every line contained in a raw chunk
pub fn parse_chunk(catalog: &Catalog, data: &[u8]) -> ParsedChunk {
    let text = decode_ascii(data);
    let mut parsed = ParsedChunk::default();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        match parse_line(catalog, line) {
            Ok(event) => parsed.events.push(event),
            Err(rejection) => parsed.rejected.push((line.to_string(), rejection)),
        }
    }

    parsed
}

/// Format a chat-platform message for the game connection.
///
/// Name and message are expected to be sanitized already; non-ASCII
/// characters are dropped from the output.
pub fn format_relay(platform: &str, name: &str, message: &str) -> Vec<u8> {
    format!("[{platform}] {name}: {message}")
        .chars()
        .filter(char::is_ascii)
        .map(|c| c as u8)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamechat_core::CatalogProfile;

    fn catalog() -> Catalog {
        Catalog::new(CatalogProfile::Minimal)
    }

    #[test]
    fn test_parse_player_message_line() {
        assert_eq!(
            parse_line(&catalog(), "0 Alice;hello world"),
            Ok(Event::PlayerMessage {
                player_name: "Alice".into(),
                message: "hello world".into(),
            })
        );
    }

    #[test]
    fn test_parse_map_lines() {
        assert_eq!(
            parse_line(&catalog(), "1 facility"),
            Ok(Event::MapStarted {
                map_name: "facility".into()
            })
        );
        assert!(matches!(
            parse_line(&catalog(), "1"),
            Err(Rejection::Arity { got: 0, .. })
        ));
    }

    #[test]
    fn test_parse_count_lines() {
        assert_eq!(
            parse_line(&catalog(), "2 17"),
            Ok(Event::PlayerCountChanged { player_count: 17 })
        );
        assert!(parse_line(&catalog(), "2 abc").is_err());
    }

    #[test]
    fn test_message_spacing_is_preserved() {
        assert_eq!(
            parse_line(&catalog(), "0 Alice;a  b"),
            Ok(Event::PlayerMessage {
                player_name: "Alice".into(),
                message: "a  b".into(),
            })
        );
    }

    #[test]
    fn test_chunk_with_multiple_lines() {
        let parsed = parse_chunk(&catalog(), b"1 facility\n2 17\n");
        assert_eq!(
            parsed.events,
            vec![
                Event::MapStarted {
                    map_name: "facility".into()
                },
                Event::PlayerCountChanged { player_count: 17 },
            ]
        );
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn test_unknown_line_does_not_affect_others() {
        let parsed = parse_chunk(&catalog(), b"99 x\n2 4\n\n");
        assert_eq!(parsed.events, vec![Event::PlayerCountChanged { player_count: 4 }]);
        assert_eq!(
            parsed.rejected,
            vec![("99 x".to_string(), Rejection::UnknownEventType(99))]
        );
    }

    #[test]
    fn test_chunk_drops_non_ascii_and_carriage_returns() {
        let parsed = parse_chunk(&catalog(), b"1 fac\xffility\r\n");
        assert_eq!(
            parsed.events,
            vec![Event::MapStarted {
                map_name: "facility".into()
            }]
        );
    }

    #[test]
    fn test_unterminated_line_is_parsed() {
        let parsed = parse_chunk(&catalog(), b"2 8");
        assert_eq!(parsed.events, vec![Event::PlayerCountChanged { player_count: 8 }]);
    }

    #[test]
    fn test_split_line_is_not_reassembled() {
        let first = parse_chunk(&catalog(), b"0 Ali");
        let second = parse_chunk(&catalog(), b"ce;hello\n");
        assert!(first.events.is_empty());
        assert!(second.events.is_empty());
        assert_eq!(first.rejected.len() + second.rejected.len(), 2);
    }

    #[test]
    fn test_format_relay() {
        assert_eq!(
            format_relay("Discord", "test", "this is an injected message"),
            b"[Discord] test: this is an injected message".to_vec()
        );
        assert_eq!(format_relay("Discord", "B\u{f6}b", "hi"), b"[Discord] Bb: hi".to_vec());
    }
}
