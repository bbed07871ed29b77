//! Control socket.
//!
//! Newline-delimited JSON over a Unix socket: one request per line, one
//! response per line. This is how a window manager's click handler (or the
//! `blockline click` subcommand) asks for a block to run now.

use anyhow::{Context, Result, bail};
use blockline_core::{BlockSpec, Registry, TriggerHandle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::watch;

/// Longest request line a client may send, newline included.
pub const MAX_REQUEST_BYTES: usize = 4096;

/// Request types the daemon can handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ControlRequest {
    /// Liveness check
    Ping,

    /// Last published status line
    Status,

    /// The configured blocks, in status-line order
    Blocks,

    /// Run one block now
    RunBlock { index: usize, button: Option<u8> },
}

/// Response types from the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ControlResponse {
    Ok,

    Error { message: String },

    Pong { version: String },

    Status { text: String },

    Blocks { blocks: Vec<BlockSpec> },
}

impl ControlRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ControlResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What request handlers can see of the running engine.
#[derive(Debug, Clone)]
pub struct ControlState {
    pub trigger: TriggerHandle,
    pub status: watch::Receiver<String>,
    pub registry: Registry,
}

impl ControlState {
    pub async fn handle(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Ping => ControlResponse::Pong {
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            ControlRequest::Status => ControlResponse::Status {
                text: self.status.borrow().clone(),
            },
            ControlRequest::Blocks => ControlResponse::Blocks {
                blocks: self.registry.blocks().to_vec(),
            },
            ControlRequest::RunBlock { index, button } => {
                match self.trigger.run_block(index, button).await {
                    Ok(()) => ControlResponse::Ok,
                    Err(e) => {
                        tracing::warn!("rejected run request: {}", e);
                        ControlResponse::Error {
                            message: e.to_string(),
                        }
                    }
                }
            }
        }
    }
}

/// Binds the control socket, replacing a stale socket file.
///
/// Fails if another instance still answers on `path`.
pub fn bind(path: &Path) -> Result<UnixListener> {
    if path.exists() {
        if std::os::unix::net::UnixStream::connect(path).is_ok() {
            bail!(
                "Another blockline is already listening on {}",
                path.display()
            );
        }
        std::fs::remove_file(path).context("Failed to remove existing socket")?;
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }
    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind control socket {}", path.display()))?;
    tracing::info!("control socket listening on {}", path.display());
    Ok(listener)
}

/// Accepts clients until the task is dropped.
pub async fn serve(listener: UnixListener, state: ControlState) {
    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, state).await {
                        tracing::error!("Error handling control client: {:#}", e);
                    }
                });
            }
            Err(e) => tracing::error!("Control socket accept failed: {}", e),
        }
    }
}

async fn handle_client(stream: UnixStream, state: ControlState) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(MAX_REQUEST_BYTES as u64)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            break;
        }
        let complete = buf.ends_with(b"\n");
        if !complete && read == MAX_REQUEST_BYTES {
            tracing::warn!("control request over {} bytes, dropping client", MAX_REQUEST_BYTES);
            let response = ControlResponse::Error {
                message: format!("Request exceeds {} bytes", MAX_REQUEST_BYTES),
            };
            write_response(&mut writer, &response).await?;
            break;
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if line.is_empty() {
            continue;
        }
        tracing::debug!("control request: {}", line);

        let response = match ControlRequest::from_json(line) {
            Ok(request) => state.handle(request).await,
            Err(e) => ControlResponse::Error {
                message: format!("Invalid request: {}", e),
            },
        };
        write_response(&mut writer, &response).await?;
    }
    Ok(())
}

async fn write_response(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &ControlResponse,
) -> Result<()> {
    let mut json = response.to_json()?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Sends one request to a running daemon and waits for its response.
pub async fn request(path: &Path, request: &ControlRequest) -> Result<ControlResponse> {
    let stream = UnixStream::connect(path)
        .await
        .with_context(|| format!("Failed to connect to {} (is blockline running?)", path.display()))?;
    let (reader, mut writer) = stream.into_split();

    let mut json = request.to_json()?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;

    let mut lines = BufReader::new(reader).lines();
    let line = lines
        .next_line()
        .await?
        .context("Daemon closed the connection without answering")?;
    ControlResponse::from_json(&line)
}
