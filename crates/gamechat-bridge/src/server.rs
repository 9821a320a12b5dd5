//! Bridge server: accepts the game connection and relays in both directions
//!
//! At most one game connection is active. A new connection replaces the
//! previous one, which is shut down and closed first. Each connection gets a
//! reader task that parses incoming chunks and queues the events, and a
//! writer task that writes relay lines from the chat platform. The slot lock
//! is never held across socket I/O, so a game server that stops reading can
//! stall its own writer but not the accept loop.

use crate::dispatch::{DEFAULT_QUEUE_CAPACITY, DispatchQueue, DispatchSnapshot, Dispatcher};
use crate::protocol::{format_relay, parse_chunk};
use crate::transport::{ChunkReader, LineWriter};
use crate::unix::{DEFAULT_SOCKET_PREFIX, EndpointLock, ListenerEndpoint};
use gamechat_core::{BridgeError, Catalog, CatalogProfile, Result};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

/// Configuration for the bridge server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket path prefix (default: /tmp/opencj_events_)
    pub socket_prefix: String,
    /// Game instance id appended to the prefix
    pub game_id: String,
    /// Label shown in relay lines (default: Discord)
    pub platform: String,
    /// Event catalog and sanitizer profile
    pub profile: CatalogProfile,
    /// Dispatch queue capacity
    pub queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_prefix: DEFAULT_SOCKET_PREFIX.into(),
            game_id: "cod4".into(),
            platform: "Discord".into(),
            profile: CatalogProfile::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn endpoint(&self) -> ListenerEndpoint {
        ListenerEndpoint::new(&self.socket_prefix, &self.game_id)
    }
}

/// Identifier of an accepted game connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Result of a relay request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Line written to the current connection
    Delivered(ConnectionId),
    /// No game connection; nothing written
    NoConnection,
    /// Name or message failed validation; nothing written
    Rejected,
}

/// Relay lines waiting for a connection's writer task
const WRITE_QUEUE_CAPACITY: usize = 32;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct WriteRequest {
    data: Vec<u8>,
    done: oneshot::Sender<Result<()>>,
}

/// The current game connection
struct ActiveConnection {
    id: ConnectionId,
    writes: mpsc::Sender<WriteRequest>,
    writer: AbortHandle,
    reader: AbortHandle,
}

impl ActiveConnection {
    /// Stop both tasks. Dropping the stream halves shuts the socket down,
    /// even while a write is blocked on a peer that stopped reading.
    fn close(self) {
        self.writer.abort();
        self.reader.abort();
    }
}

/// Connection slot shared by the accept loop, reader tasks and relays
#[derive(Default)]
struct BridgeState {
    active: Option<ActiveConnection>,
}

impl BridgeState {
    /// Clear the slot only if it still holds `id`
    fn clear_if(&mut self, id: ConnectionId) -> Option<ActiveConnection> {
        if self.active.as_ref().map(|c| c.id) == Some(id) {
            self.active.take()
        } else {
            None
        }
    }
}

struct Shared {
    state: Mutex<BridgeState>,
    catalog: Catalog,
    platform: String,
    queue: DispatchQueue,
    next_id: AtomicU64,
    connection_tx: watch::Sender<Option<ConnectionId>>,
}

impl Shared {
    /// Close and clear `id` if it is still the current connection
    async fn release(&self, id: ConnectionId) {
        let cleared = self.state.lock().await.clear_if(id);
        if let Some(connection) = cleared {
            connection.close();
            self.connection_tx.send_replace(None);
        }
    }
}

/// Cloneable handle for relaying chat messages into the game
#[derive(Clone)]
pub struct BridgeHandle {
    shared: Arc<Shared>,
}

impl BridgeHandle {
    /// Sanitize a chat message and write it to the current game connection
    pub async fn relay(&self, name: &str, message: &str) -> Result<RelayOutcome> {
        let sanitizer = self.shared.catalog.sanitizer();
        let (Some(name), Some(message)) =
            (sanitizer.clean_name(name), sanitizer.clean_message(message))
        else {
            return Ok(RelayOutcome::Rejected);
        };

        let data = format_relay(&self.shared.platform, &name, &message);

        let (id, writes) = {
            let state = self.shared.state.lock().await;
            match state.active.as_ref() {
                Some(connection) => (connection.id, connection.writes.clone()),
                None => return Ok(RelayOutcome::NoConnection),
            }
        };
        debug!("[Bridge→Game] {} len={}", id, data.len());

        let (done, written) = oneshot::channel();
        let result = match writes.send(WriteRequest { data, done }).await {
            Ok(()) => written
                .await
                .unwrap_or_else(|_| Err(BridgeError::IpcError(format!("{} closed", id)))),
            Err(_) => Err(BridgeError::IpcError(format!("{} closed", id))),
        };

        match result {
            Ok(()) => Ok(RelayOutcome::Delivered(id)),
            Err(e) => {
                warn!("Relay to {} failed: {}", id, e);
                self.shared.release(id).await;
                Err(e)
            }
        }
    }

    /// Id of the current game connection, if any
    pub fn current_connection(&self) -> Option<ConnectionId> {
        *self.shared.connection_tx.borrow()
    }

    /// Watch connection changes
    pub fn subscribe_connections(&self) -> watch::Receiver<Option<ConnectionId>> {
        self.shared.connection_tx.subscribe()
    }

    pub fn dispatch_stats(&self) -> DispatchSnapshot {
        self.shared.queue.stats()
    }
}

/// Bridge server bound to its endpoint
pub struct BridgeServer {
    listener: UnixListener,
    endpoint: ListenerEndpoint,
    _lock: EndpointLock,
    shared: Arc<Shared>,
    _dispatch_worker: JoinHandle<()>,
}

impl BridgeServer {
    /// Bind the endpoint and start the dispatch worker
    pub async fn bind(config: ServerConfig, dispatcher: Arc<dyn Dispatcher>) -> Result<Self> {
        if config.game_id.is_empty() {
            return Err(BridgeError::ConfigError("game id is empty".into()));
        }

        let endpoint = config.endpoint();
        let (listener, lock) = endpoint.bind().await?;
        let (queue, worker) = DispatchQueue::spawn(dispatcher, config.queue_capacity);
        let (connection_tx, _) = watch::channel(None);

        let shared = Arc::new(Shared {
            state: Mutex::new(BridgeState::default()),
            catalog: Catalog::new(config.profile),
            platform: config.platform,
            queue,
            next_id: AtomicU64::new(1),
            connection_tx,
        });

        Ok(Self {
            listener,
            endpoint,
            _lock: lock,
            shared,
            _dispatch_worker: worker,
        })
    }

    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle {
            shared: self.shared.clone(),
        }
    }

    pub fn endpoint(&self) -> &ListenerEndpoint {
        &self.endpoint
    }

    /// Accept game connections forever
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept game connections until `shutdown` completes, then close the
    /// current connection and remove the socket file
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Bridge server is listening for connections");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => accept_connection(&self.shared, stream).await,
                        Err(e) => {
                            error!("Accept failed: {}", e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                        }
                    }
                }
                _ = &mut shutdown => {
                    info!("Bridge server shutting down");
                    break;
                }
            }
        }

        let active = self.shared.state.lock().await.active.take();
        if let Some(connection) = active {
            connection.close();
            self.shared.connection_tx.send_replace(None);
        }
        self.endpoint.remove();
        Ok(())
    }
}

/// Install a new connection, closing the previous one first
async fn accept_connection(shared: &Arc<Shared>, stream: UnixStream) {
    let id = ConnectionId(shared.next_id.fetch_add(1, Ordering::Relaxed));
    let (read_half, write_half) = stream.into_split();

    let mut state = shared.state.lock().await;
    if let Some(previous) = state.active.take() {
        warn!(
            "Unexpected game server connection {}, dropping previous {}",
            id, previous.id
        );
        previous.close();
    }

    // The reader cannot clear the slot before it is filled: it needs the lock
    let (writes, requests) = mpsc::channel(WRITE_QUEUE_CAPACITY);
    let writer = tokio::spawn(writer_loop(id, write_half, requests));
    let reader = tokio::spawn(connection_loop(shared.clone(), id, read_half));
    state.active = Some(ActiveConnection {
        id,
        writes,
        writer: writer.abort_handle(),
        reader: reader.abort_handle(),
    });
    shared.connection_tx.send_replace(Some(id));
    info!("Now handling game server connection {}", id);
}

/// Read chunks until end of stream, queueing every parsed event
async fn connection_loop<R: ChunkReader>(shared: Arc<Shared>, id: ConnectionId, mut reader: R) {
    loop {
        match reader.read_chunk().await {
            Ok(Some(data)) => {
                debug!("[Game→Bridge] {} len={}", id, data.len());
                let parsed = parse_chunk(&shared.catalog, &data);
                for (line, rejection) in parsed.rejected {
                    debug!("Flushing {:?}: {}", line, rejection);
                }
                for event in parsed.events {
                    shared.queue.submit(event);
                }
            }
            Ok(None) => {
                info!("Game server connection {} closed", id);
                break;
            }
            Err(e) => {
                warn!("Game server connection {} failed: {}", id, e);
                break;
            }
        }
    }

    // Dropping the slot closes the write queue; the writer shuts down on its own
    let cleared = shared.state.lock().await.clear_if(id);
    if cleared.is_some() {
        shared.connection_tx.send_replace(None);
    }
}

/// Write relay lines in order until the queue closes or a write fails
async fn writer_loop<W: LineWriter>(
    id: ConnectionId,
    mut writer: W,
    mut requests: mpsc::Receiver<WriteRequest>,
) {
    while let Some(request) = requests.recv().await {
        let result = writer.write_line(&request.data).await;
        let failed = result.is_err();
        if request.done.send(result).is_err() {
            debug!("Relay caller for {} went away", id);
        }
        if failed {
            return;
        }
    }

    if let Err(e) = writer.shutdown_write().await {
        debug!("Shutdown of {} failed: {}", id, e);
    }
}
