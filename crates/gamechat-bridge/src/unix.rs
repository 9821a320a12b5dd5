//! Unix socket endpoint for the game connection
//!
//! The socket path is `<prefix><game_id>`, one per running game instance.
//! Ownership of the path is held through an advisory lock on
//! `<prefix><game_id>.lock`; whoever holds the lock may remove a leftover
//! socket file and bind. The lock is released when the process exits, so a
//! crashed bridge never blocks the next start.

use gamechat_core::{BridgeError, Result};
use std::fs::{File, OpenOptions, TryLockError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::net::UnixListener;
use tracing::{debug, info};

/// Default socket path prefix; the game-side plugin connects to the same path
pub const DEFAULT_SOCKET_PREFIX: &str = "/tmp/opencj_events_";

/// Listener address derived from a prefix and game instance id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerEndpoint {
    path: PathBuf,
}

/// Exclusive claim on an endpoint, held for as long as the listener lives
#[derive(Debug)]
pub struct EndpointLock {
    _file: File,
}

impl ListenerEndpoint {
    pub fn new(prefix: &str, game_id: &str) -> Self {
        Self {
            path: PathBuf::from(format!("{prefix}{game_id}")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        let mut path = self.path.clone().into_os_string();
        path.push(".lock");
        PathBuf::from(path)
    }

    /// Claim the endpoint, remove a stale socket file and bind a fresh listener.
    ///
    /// Fails with `AddressInUse` if another bridge holds the endpoint. The
    /// running bridge is never contacted, so its game connection is untouched.
    pub async fn bind(&self) -> Result<(UnixListener, EndpointLock)> {
        let lock = self.claim()?;
        remove_stale(&self.path)?;
        let listener = UnixListener::bind(&self.path).map_err(|e| {
            BridgeError::Bind(format!("Failed to bind {}: {}", self.path.display(), e))
        })?;
        info!("Listening on {}", self.path.display());
        Ok((listener, lock))
    }

    /// Remove the socket file, ignoring a missing file
    pub fn remove(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed socket {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to remove socket {}: {}", self.path.display(), e),
        }
    }

    fn claim(&self) -> Result<EndpointLock> {
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| {
                BridgeError::Bind(format!("Failed to open {}: {}", lock_path.display(), e))
            })?;

        match file.try_lock() {
            Ok(()) => Ok(EndpointLock { _file: file }),
            Err(TryLockError::WouldBlock) => Err(BridgeError::AddressInUse(format!(
                "{} is in use by another bridge",
                self.path.display()
            ))),
            Err(TryLockError::Error(e)) => Err(BridgeError::Bind(format!(
                "Failed to lock {}: {}",
                lock_path.display(),
                e
            ))),
        }
    }
}

/// Remove a socket file left behind by a bridge that no longer holds the lock
fn remove_stale(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed stale socket {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BridgeError::AddressInUse(format!(
            "{} exists but could not be removed: {}",
            path.display(),
            e
        ))),
    }
}
