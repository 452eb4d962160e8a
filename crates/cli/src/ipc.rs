//! IPC between the CLI and a tracking process over Unix sockets
//!
//! Frames are length-prefixed bincode, one request/response per connection.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};

/// Maximum IPC message size (1MB)
const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Request from CLI to tracking process
#[derive(Debug, Serialize, Deserialize)]
pub enum IpcRequest {
    /// Get tracking status
    GetStatus,
    /// Request graceful shutdown (drain pending events, then exit)
    Stop,
}

/// Response from tracking process to CLI
#[derive(Debug, Serialize, Deserialize)]
pub enum IpcResponse {
    /// Tracking status information
    Status(TrackStatus),
    /// Simple acknowledgment
    Ok,
    /// Error occurred
    Error(String),
}

/// Status of one tracking process
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackStatus {
    pub pid: u32,
    pub anchor: String,
    pub session: String,
    pub started_at_ms: u64,
}

/// Socket path for one tracked anchor
pub fn socket_path(moor_dir: &Path, anchor: &str) -> PathBuf {
    moor_dir.join("state").join(format!("track-{anchor}.sock"))
}

/// Client side: CLI talking to a tracking process
pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    /// Connect to a tracking process socket
    pub async fn connect(socket: &Path) -> Result<Self> {
        let stream = UnixStream::connect(socket)
            .await
            .context("Failed to connect to tracking process")?;
        Ok(Self { stream })
    }

    /// Send one request and receive the response
    pub async fn send_request(&mut self, request: &IpcRequest) -> Result<IpcResponse> {
        let payload = bincode::serialize(request).context("Failed to serialize request")?;
        if payload.len() > MAX_MESSAGE_SIZE {
            anyhow::bail!("request too large: {} bytes", payload.len());
        }

        self.stream
            .write_all(&(payload.len() as u32).to_le_bytes())
            .await
            .context("Failed to write request length")?;
        self.stream
            .write_all(&payload)
            .await
            .context("Failed to write request payload")?;
        self.stream.flush().await?;

        let mut len_buf = [0u8; 4];
        self.stream
            .read_exact(&mut len_buf)
            .await
            .context("Failed to read response length")?;
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_MESSAGE_SIZE {
            anyhow::bail!("response too large: {len} bytes");
        }

        let mut payload = vec![0u8; len];
        self.stream
            .read_exact(&mut payload)
            .await
            .context("Failed to read response payload")?;

        bincode::deserialize(&payload).context("Failed to deserialize response")
    }

    /// Get tracking status
    pub async fn get_status(&mut self) -> Result<TrackStatus> {
        match self.send_request(&IpcRequest::GetStatus).await? {
            IpcResponse::Status(status) => Ok(status),
            IpcResponse::Error(err) => anyhow::bail!("tracking process error: {err}"),
            _ => anyhow::bail!("unexpected response to GetStatus"),
        }
    }

    /// Request graceful shutdown
    pub async fn stop(&mut self) -> Result<()> {
        match self.send_request(&IpcRequest::Stop).await? {
            IpcResponse::Ok => Ok(()),
            IpcResponse::Error(err) => anyhow::bail!("stop failed: {err}"),
            _ => anyhow::bail!("unexpected response to Stop"),
        }
    }
}

/// Server side: tracking process accepting CLI requests
pub struct IpcServer {
    listener: UnixListener,
}

impl IpcServer {
    /// Bind the socket, replacing any stale one
    pub async fn start(socket: &Path) -> Result<Self> {
        if socket.exists() {
            std::fs::remove_file(socket).context("Failed to remove stale socket")?;
        }
        if let Some(parent) = socket.parent() {
            std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
        }

        let listener = UnixListener::bind(socket).context("Failed to bind Unix socket")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket, std::fs::Permissions::from_mode(0o600))
                .context("Failed to set socket permissions")?;
        }

        Ok(Self { listener })
    }

    /// Accept one connection
    pub async fn accept(&self) -> Result<UnixStream> {
        let (stream, _addr) = self
            .listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        Ok(stream)
    }
}

/// Handle a single request/response exchange on a connection
pub async fn handle_connection<F, Fut>(mut stream: UnixStream, handler: F) -> Result<()>
where
    F: FnOnce(IpcRequest) -> Fut,
    Fut: std::future::Future<Output = IpcResponse>,
{
    let mut len_buf = [0u8; 4];
    stream
        .read_exact(&mut len_buf)
        .await
        .context("Failed to read request length")?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_SIZE {
        anyhow::bail!("IPC message too large: {len} bytes");
    }

    let mut payload = vec![0u8; len];
    stream
        .read_exact(&mut payload)
        .await
        .context("Failed to read request payload")?;
    let request: IpcRequest =
        bincode::deserialize(&payload).context("Failed to deserialize request")?;

    let response = handler(request).await;

    let response_bytes = bincode::serialize(&response).context("Failed to serialize response")?;
    stream
        .write_all(&(response_bytes.len() as u32).to_le_bytes())
        .await?;
    stream.write_all(&response_bytes).await?;
    stream.flush().await?;

    Ok(())
}
