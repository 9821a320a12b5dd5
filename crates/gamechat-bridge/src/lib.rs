//! Bridge server between a game server process and a chat channel
//!
//! This crate provides:
//! - Line protocol parsing for game events and relay line formatting
//! - Transport abstractions (ChunkReader/LineWriter traits)
//! - Unix socket endpoint handling
//! - Bounded dispatch queue towards the chat platform
//! - The single-connection bridge server

pub mod dispatch;
pub mod protocol;
#[cfg(unix)]
pub mod server;
pub mod transport;
#[cfg(unix)]
pub mod unix;

pub use dispatch::{DispatchQueue, DispatchSnapshot, Dispatcher, SubmitOutcome};
pub use protocol::{ParsedChunk, format_relay, parse_chunk, parse_line};
#[cfg(unix)]
pub use server::{BridgeHandle, BridgeServer, ConnectionId, RelayOutcome, ServerConfig};
pub use transport::{ChunkReader, LineWriter};
#[cfg(unix)]
pub use unix::{EndpointLock, ListenerEndpoint};
