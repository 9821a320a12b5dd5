//! # gamechat-core
//!
//! Core types for bridging a game server and a chat channel.
//!
//! This crate provides:
//! - Event model with stable wire ids
//! - Event catalog turning protocol arguments into validated events
//! - Text sanitizer with blacklist and whitelist policies
//! - Channel-side presence status and message filtering
//! - Error and rejection types

pub mod catalog;
pub mod channel;
pub mod error;
pub mod event;
pub mod sanitize;

pub use catalog::{Catalog, CatalogProfile};
pub use channel::{ChannelAction, ChannelFilter, ChannelMessage, ChannelStatus};
pub use error::{BridgeError, Rejection, Result};
pub use event::{Event, EventKind};
pub use sanitize::{MAX_MESSAGE_LEN, MAX_NAME_LEN, SanitizePolicy, Sanitizer};
