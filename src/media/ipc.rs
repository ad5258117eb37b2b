//! The IPC channel to the player subprocess: a unix socket speaking one
//! JSON object per line. One writer (commands), one reader task that
//! matches replies to pending requests and forwards events.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::UnixStream;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, trace, warn};

use crate::common::errors::MediaError;
use crate::media::protocol::{IpcMessage, IpcRequest};

const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

type Writer = FramedWrite<tokio::net::unix::OwnedWriteHalf, LinesCodec>;

pub struct IpcChannel {
    writer: AsyncMutex<Writer>,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<IpcMessage>>>>,
    next_id: AtomicU64,
    command_timeout: Duration,
    reader_handle: tokio::task::JoinHandle<()>,
}

impl IpcChannel {
    /// Connects to the player's socket, retrying while the subprocess is
    /// still creating it.
    pub async fn connect(
        socket_path: &str,
        command_timeout: Duration,
        events: flume::Sender<IpcMessage>,
    ) -> Result<Self, MediaError> {
        let mut attempt = 0;
        let stream = loop {
            match UnixStream::connect(socket_path).await {
                Ok(stream) => break stream,
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    attempt += 1;
                    trace!("ipc connect attempt {} failed: {}", attempt, e);
                    tokio::time::sleep(CONNECT_BACKOFF).await;
                }
                Err(e) => return Err(MediaError::Spawn(e)),
            }
        };

        let (read_half, write_half) = stream.into_split();
        let writer = FramedWrite::new(write_half, LinesCodec::new());
        let mut reader = FramedRead::new(read_half, LinesCodec::new());

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<IpcMessage>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        let pending_reader = pending.clone();
        let reader_handle = tokio::spawn(async move {
            while let Some(line) = reader.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("ipc read error: {}", e);
                        break;
                    }
                };
                let msg: IpcMessage = match serde_json::from_str(&line) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("unparseable ipc line: {} ({})", line, e);
                        continue;
                    }
                };
                if let Some(id) = msg.request_id {
                    if let Some(tx) = pending_reader.lock().remove(&id) {
                        let _ = tx.send(msg);
                    }
                } else if msg.event.is_some() {
                    if events.send(msg).is_err() {
                        break;
                    }
                }
            }
            debug!("ipc reader finished");
        });

        Ok(Self {
            writer: AsyncMutex::new(writer),
            pending,
            next_id: AtomicU64::new(1),
            command_timeout,
            reader_handle,
        })
    }

    /// One request, one typed reply, bounded wait. A timeout or a
    /// non-success reply surfaces as an error; the caller decides whether
    /// that is fatal.
    pub async fn command(&self, command: Vec<Value>) -> Result<IpcMessage, MediaError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(id, tx);

        let line = serde_json::to_string(&IpcRequest::new(command, id))
            .map_err(|_| MediaError::ChannelClosed)?;

        {
            let mut writer = self.writer.lock().await;
            if writer.send(line).await.is_err() {
                self.pending.lock().remove(&id);
                return Err(MediaError::ChannelClosed);
            }
        }

        let reply = match tokio::time::timeout(self.command_timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(MediaError::ChannelClosed);
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                return Err(MediaError::Timeout);
            }
        };

        if reply.is_success() {
            Ok(reply)
        } else {
            Err(MediaError::Rejected(
                reply.error.unwrap_or_else(|| "unknown".into()),
            ))
        }
    }

    /// Fire-and-forget variant for shutdown paths where the reply may
    /// never come.
    pub async fn send_only(&self, command: Vec<Value>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(line) = serde_json::to_string(&IpcRequest::new(command, id)) {
            let mut writer = self.writer.lock().await;
            let _ = writer.send(line).await;
        }
    }
}

impl Drop for IpcChannel {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}
