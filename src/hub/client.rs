use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::warn;

use crate::common::types::{ClientId, SessionKey};
use crate::protocol::ServerMessage;

/// A client whose outbound buffer overflowed or would not accept a frame.
#[derive(Debug)]
pub struct SendFailed;

/// Hub-side view of one connection. The reader and writer tasks own the
/// socket; everyone else talks through this handle.
pub struct ClientHandle {
    pub id: ClientId,
    pub addr: Option<String>,
    pub user_agent: Option<String>,
    /// Decided at the HTTP upgrade; the coordinator turns it into a
    /// persisted admin bit at handshake.
    pub admin_eligible: bool,
    tx: flume::Sender<Arc<str>>,
    /// Broadcasts reach a client only once the coordinator has welcomed
    /// it, so every client's first frame after `welcome` is a snapshot
    /// that directly follows the one embedded in the welcome.
    attached: AtomicBool,
    is_admin: AtomicBool,
    key: Mutex<Option<SessionKey>>,
    kick_reason: Mutex<Option<String>>,
    closed: Notify,
}

impl ClientHandle {
    pub fn new(
        id: ClientId,
        addr: Option<String>,
        user_agent: Option<String>,
        admin_eligible: bool,
        buffer: usize,
    ) -> (Arc<Self>, flume::Receiver<Arc<str>>) {
        let (tx, rx) = flume::bounded(buffer);
        (
            Arc::new(Self {
                id,
                addr,
                user_agent,
                admin_eligible,
                tx,
                attached: AtomicBool::new(false),
                is_admin: AtomicBool::new(false),
                key: Mutex::new(None),
                kick_reason: Mutex::new(None),
                closed: Notify::new(),
            }),
            rx,
        )
    }

    /// Binds the connection to its session and opens the broadcast tap.
    pub fn attach(&self, key: SessionKey, is_admin: bool) {
        *self.key.lock() = Some(key);
        self.is_admin.store(is_admin, Ordering::SeqCst);
        self.attached.store(true, Ordering::SeqCst);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    pub fn session_key(&self) -> Option<SessionKey> {
        self.key.lock().clone()
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin.load(Ordering::SeqCst)
    }

    pub fn set_admin(&self, is_admin: bool) {
        self.is_admin.store(is_admin, Ordering::SeqCst);
    }

    /// Enqueues a pre-serialized frame. Full buffer means the client is
    /// too slow to keep; the caller decides to kick.
    pub fn try_send_raw(&self, json: Arc<str>) -> Result<(), SendFailed> {
        self.tx.try_send(json).map_err(|_| SendFailed)
    }

    pub fn send(&self, msg: &ServerMessage) -> Result<(), SendFailed> {
        let json = serde_json::to_string(msg).map_err(|e| {
            warn!("failed to serialize outbound message: {}", e);
            SendFailed
        })?;
        self.try_send_raw(json.into())
    }

    /// Closes the connection with a final `kicked` frame. Idempotent; the
    /// first reason wins. Does not share the bounded buffer, so a kick
    /// always goes through even when the buffer is full.
    pub fn kick(&self, reason: &str) {
        {
            let mut slot = self.kick_reason.lock();
            if slot.is_some() {
                return;
            }
            *slot = Some(reason.to_string());
        }
        self.attached.store(false, Ordering::SeqCst);
        self.closed.notify_waiters();
        self.closed.notify_one();
    }

    pub fn kick_reason(&self) -> Option<String> {
        self.kick_reason.lock().clone()
    }

    pub async fn closed(&self) {
        self.closed.notified().await;
    }

    pub fn is_kicked(&self) -> bool {
        self.kick_reason.lock().is_some()
    }
}
