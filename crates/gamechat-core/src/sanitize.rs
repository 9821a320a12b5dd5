//! Text sanitizing for names and messages crossing the bridge
//!
//! Both directions carry untrusted text: player names typed in game and
//! display names / messages typed in the chat channel. Everything is passed
//! through [`Sanitizer`] before it is stored on an event or written to the
//! game socket.

use serde::{Deserialize, Serialize};

/// Maximum length of a player or author name, in characters
pub const MAX_NAME_LEN: usize = 32;

/// Maximum length of a chat message, in characters
pub const MAX_MESSAGE_LEN: usize = 128;

/// Character substituted for anything the policy refuses
pub const PLACEHOLDER: char = '.';

/// Punctuation accepted by the whitelist policy (no quote, no backslash)
const WHITELIST_PUNCTUATION: &str = "!#$%&'()*+,-./:;<=>?@[]^_`{|}~";

/// Sanitizing policy. A deployment uses exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizePolicy {
    /// Replace control characters, quote, DEL and backslash
    Blacklist,
    /// Replace everything outside a printable ASCII allow-set
    Whitelist,
}

/// Sanitizer with a fixed policy and name rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    policy: SanitizePolicy,
    min_name_len: usize,
}

impl Sanitizer {
    pub fn new(policy: SanitizePolicy, min_name_len: usize) -> Self {
        Self {
            policy,
            min_name_len,
        }
    }

    pub fn policy(&self) -> SanitizePolicy {
        self.policy
    }

    pub fn min_name_len(&self) -> usize {
        self.min_name_len
    }

    /// Normalize untrusted text. Idempotent, never lengthens the input.
    pub fn sanitize(&self, text: &str) -> String {
        let stripped = strip_colors(text);
        match self.policy {
            SanitizePolicy::Blacklist => replace_blacklisted(&stripped),
            SanitizePolicy::Whitelist => replace_unlisted(&stripped),
        }
    }

    /// Sanitize a name, rejecting it if too short and truncating if too long.
    pub fn clean_name(&self, name: &str) -> Option<String> {
        let name = self.sanitize(name);
        if name.chars().count() < self.min_name_len {
            return None;
        }
        Some(truncate(&name, MAX_NAME_LEN))
    }

    /// Sanitize a message, rejecting it if empty and truncating if too long.
    pub fn clean_message(&self, message: &str) -> Option<String> {
        let message = self.sanitize(message);
        if message.is_empty() {
            return None;
        }
        Some(truncate(&message, MAX_MESSAGE_LEN))
    }

    /// Sanitize free text that has no minimum length (map, route, time).
    pub fn clean_field(&self, field: &str) -> String {
        truncate(&self.sanitize(field), MAX_MESSAGE_LEN)
    }
}

/// Remove `^<digit>` color escapes.
///
/// Runs to a fixed point: removing one escape can join a caret with a
/// following digit (`^^11`), and that pair is removed as well.
pub fn strip_colors(text: &str) -> String {
    let mut out: Vec<char> = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_digit() && out.last() == Some(&'^') {
            out.pop();
            continue;
        }
        out.push(c);
    }
    out.into_iter().collect()
}

/// Collapse runs of control characters into one placeholder, then runs of
/// quote / DEL / backslash into one placeholder.
fn replace_blacklisted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_control = false;
    let mut in_blocked = false;
    for c in text.chars() {
        if (c as u32) < 0x20 {
            in_blocked = false;
            if !in_control {
                out.push(PLACEHOLDER);
                in_control = true;
            }
        } else if matches!(c, '"' | '\x7f' | '\\') {
            in_control = false;
            if !in_blocked {
                out.push(PLACEHOLDER);
                in_blocked = true;
            }
        } else {
            in_control = false;
            in_blocked = false;
            out.push(c);
        }
    }
    out
}

fn replace_unlisted(text: &str) -> String {
    text.chars()
        .map(|c| if is_whitelisted(c) { c } else { PLACEHOLDER })
        .collect()
}

fn is_whitelisted(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == ' ' || WHITELIST_PUNCTUATION.contains(c)
}

/// Truncate to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
