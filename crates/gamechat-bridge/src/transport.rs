//! Transport abstractions for the game connection
//!
//! Provides ChunkReader/LineWriter traits over any tokio stream half, so the
//! connection loop does not care whether it talks to a Unix socket or a
//! test double.

use async_trait::async_trait;
use gamechat_core::{BridgeError, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum bytes taken from the socket per read
pub const READ_CHUNK_SIZE: usize = 512;

/// Trait for async reading from a transport
#[async_trait]
pub trait ChunkReader: Send {
    /// Read the next chunk of raw bytes.
    /// Returns `Ok(None)` at end of stream.
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Trait for async writing to a transport
#[async_trait]
pub trait LineWriter: Send {
    /// Write all bytes and flush
    async fn write_line(&mut self, data: &[u8]) -> Result<()>;

    /// Shut down the write direction, signalling end of stream to the peer
    async fn shutdown_write(&mut self) -> Result<()>;
}

#[async_trait]
impl<R> ChunkReader for R
where
    R: AsyncRead + Unpin + Send,
{
    async fn read_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        let n = self
            .read(&mut buf)
            .await
            .map_err(|e| BridgeError::IpcError(format!("Read failed: {}", e)))?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }
}

#[async_trait]
impl<W> LineWriter for W
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_line(&mut self, data: &[u8]) -> Result<()> {
        self.write_all(data)
            .await
            .map_err(|e| BridgeError::IpcError(format!("Write failed: {}", e)))?;

        // Flush to ensure data is sent
        self.flush()
            .await
            .map_err(|e| BridgeError::IpcError(format!("Flush failed: {}", e)))?;

        Ok(())
    }

    async fn shutdown_write(&mut self) -> Result<()> {
        AsyncWriteExt::shutdown(self)
            .await
            .map_err(|e| BridgeError::IpcError(format!("Shutdown failed: {}", e)))
    }
}
