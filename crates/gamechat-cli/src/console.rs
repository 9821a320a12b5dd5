//! Console stand-in for the chat platform
//!
//! Game events come out on stdout as JSON channel actions, one per line.
//! Lines typed on stdin as `<author>;<message>` are treated as messages
//! posted in the bridged channel and relayed into the game.

use async_trait::async_trait;
use gamechat_bridge::{BridgeHandle, Dispatcher, RelayOutcome};
use gamechat_core::{BridgeError, ChannelFilter, ChannelMessage, ChannelStatus, Event, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Author id used for lines typed on the console
const CONSOLE_AUTHOR_ID: &str = "console";

/// Dispatcher writing channel actions as JSON lines
pub struct ConsoleDispatcher<W> {
    ready: AtomicBool,
    status: Mutex<ChannelStatus>,
    out: Mutex<W>,
}

impl ConsoleDispatcher<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> ConsoleDispatcher<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(out: W) -> Self {
        Self {
            ready: AtomicBool::new(false),
            status: Mutex::new(ChannelStatus::new()),
            out: Mutex::new(out),
        }
    }

    /// Start accepting events
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        info!("Console chat channel is ready");
    }
}

#[async_trait]
impl<W> Dispatcher for ConsoleDispatcher<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn dispatch(&self, event: Event) -> Result<()> {
        let action = self.status.lock().await.apply(&event);
        let mut line = serde_json::to_vec(&action)?;
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line)
            .await
            .map_err(|e| BridgeError::DispatchError(format!("Failed to write action: {}", e)))?;
        out.flush()
            .await
            .map_err(|e| BridgeError::DispatchError(format!("Failed to flush: {}", e)))?;
        Ok(())
    }
}

/// Split a console line into author and message
pub fn parse_console_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (author, content) = line.split_once(';')?;
    Some((author.trim(), content))
}

/// Relay console lines into the game until the input ends
pub async fn relay_lines<R>(
    reader: R,
    handle: BridgeHandle,
    filter: ChannelFilter,
    guild_id: String,
    channel_id: String,
) where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read console input: {}", e);
                break;
            }
        };

        let Some((author, content)) = parse_console_line(&line) else {
            warn!("Expected <author>;<message>, got {:?}", line);
            continue;
        };
        let message = ChannelMessage {
            guild_id: guild_id.clone(),
            channel_id: channel_id.clone(),
            author_id: CONSOLE_AUTHOR_ID.to_string(),
            author_name: author.to_string(),
            content: content.to_string(),
        };
        let Some((name, text)) = filter.accept(&message) else {
            debug!("Ignoring channel message from {:?}", author);
            continue;
        };

        match handle.relay(&name, &text).await {
            Ok(RelayOutcome::Delivered(id)) => debug!("Relayed message from {} to {}", name, id),
            Ok(RelayOutcome::NoConnection) => {
                info!("Can't relay message yet, no game server is connected")
            }
            Ok(RelayOutcome::Rejected) => debug!("Relay rejected message from {}", name),
            Err(e) => warn!("Relay failed: {}", e),
        }
    }
}
