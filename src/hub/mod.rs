//! WebSocket hub: accepts upgrades, runs one reader and one writer task
//! per connection, and fans broadcasts out to every attached client.
//! Policy lives in the coordinator; the hub only moves frames.

pub mod client;

pub use client::ClientHandle;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::{
        ConnectInfo, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderMap,
    response::Response,
    routing::get,
};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt, stream::SplitSink};
use tracing::{debug, info, warn};

use crate::common::types::{ClientId, SessionKey};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::RoomEvent;

pub struct HubConfig {
    pub admin_pin: String,
    pub handshake_timeout: Duration,
    pub client_buffer: usize,
}

pub struct Hub {
    config: HubConfig,
    clients: DashMap<ClientId, Arc<ClientHandle>>,
    next_id: AtomicU64,
    events: flume::Sender<RoomEvent>,
}

impl Hub {
    pub fn new(config: HubConfig, events: flume::Sender<RoomEvent>) -> Arc<Self> {
        Arc::new(Self {
            config,
            clients: DashMap::new(),
            next_id: AtomicU64::new(1),
            events,
        })
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/ws", get(ws_handler))
            .with_state(self.clone())
    }

    /// Serializes once, enqueues everywhere. A full buffer drops that
    /// client so one slow phone never stalls the room.
    pub fn broadcast_all(&self, msg: &ServerMessage) {
        let Ok(json) = serde_json::to_string(msg) else {
            warn!("unserializable broadcast dropped");
            return;
        };
        let json: Arc<str> = json.into();
        for entry in self.clients.iter() {
            let client = entry.value();
            if !client.is_attached() {
                continue;
            }
            if client.try_send_raw(json.clone()).is_err() {
                warn!(client = %client.id, "outbound buffer full, dropping client");
                client.kick("connection lagged");
            }
        }
    }

    pub fn broadcast_to_admins(&self, msg: &ServerMessage) {
        let Ok(json) = serde_json::to_string(msg) else {
            return;
        };
        let json: Arc<str> = json.into();
        for entry in self.clients.iter() {
            let client = entry.value();
            if !client.is_attached() || !client.is_admin() {
                continue;
            }
            if client.try_send_raw(json.clone()).is_err() {
                client.kick("connection lagged");
            }
        }
    }

    pub fn send_to(&self, id: ClientId, msg: &ServerMessage) {
        if let Some(client) = self.clients.get(&id) {
            if client.send(msg).is_err() {
                client.kick("connection lagged");
            }
        }
    }

    pub fn get(&self, id: ClientId) -> Option<Arc<ClientHandle>> {
        self.clients.get(&id).map(|c| c.value().clone())
    }

    pub fn find_by_key(&self, key: &SessionKey) -> Option<Arc<ClientHandle>> {
        self.clients
            .iter()
            .find(|entry| entry.value().session_key().as_ref() == Some(key))
            .map(|entry| entry.value().clone())
    }

    pub fn connected_clients(&self) -> Vec<Arc<ClientHandle>> {
        self.clients.iter().map(|e| e.value().clone()).collect()
    }

    pub fn disconnect_all(&self, reason: &str) {
        for entry in self.clients.iter() {
            entry.value().kick(reason);
        }
    }

    pub(crate) fn register(&self, client: Arc<ClientHandle>) {
        self.clients.insert(client.id, client);
    }

    pub(crate) fn remove(&self, id: ClientId) {
        self.clients.remove(&id);
    }

    fn next_client_id(&self) -> ClientId {
        ClientId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    async fn handle_socket(
        self: Arc<Self>,
        mut socket: WebSocket,
        addr: SocketAddr,
        user_agent: Option<String>,
        admin_eligible: bool,
    ) {
        // The first frame must be a handshake, inside a bounded window.
        let first = tokio::time::timeout(self.config.handshake_timeout, async {
            loop {
                match socket.recv().await {
                    Some(Ok(Message::Text(text))) => break Some(text),
                    Some(Ok(Message::Close(_))) | None => break None,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break None,
                }
            }
        })
        .await;

        let text = match first {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(_) => {
                send_kicked(&mut socket, "handshake timeout").await;
                return;
            }
        };

        let (session_key, display_name) = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(ClientMessage::Handshake {
                session_key,
                display_name,
            }) => (session_key, display_name),
            _ => {
                send_kicked(&mut socket, "handshake expected").await;
                return;
            }
        };

        let id = self.next_client_id();
        let (client, outbound) = ClientHandle::new(
            id,
            Some(addr.ip().to_string()),
            user_agent,
            admin_eligible,
            self.config.client_buffer,
        );
        self.register(client.clone());
        debug!(client = %id, addr = %addr, "websocket connected");

        let (sink, mut stream) = socket.split();
        let writer = tokio::spawn(writer_loop(sink, outbound, client.clone()));

        if self
            .events
            .send(RoomEvent::Connected {
                client: client.clone(),
                session_key,
                display_name,
            })
            .is_err()
        {
            self.remove(id);
            writer.abort();
            return;
        }

        while let Some(frame) = stream.next().await {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    debug!(client = %id, "websocket error: {}", e);
                    break;
                }
            };
            match frame {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Handshake { .. }) => {
                        let _ = client.send(&ServerMessage::Error {
                            message: "already connected".into(),
                        });
                    }
                    Ok(msg) => {
                        if self
                            .events
                            .send(RoomEvent::Message {
                                client_id: id,
                                msg,
                            })
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(e) => {
                        let _ = client.send(&ServerMessage::Error {
                            message: format!("bad message: {}", e),
                        });
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }

        let session_key = client.session_key();
        self.remove(id);
        let _ = self.events.send(RoomEvent::Disconnected {
            client_id: id,
            session_key,
        });
        writer.abort();
        info!(client = %id, "websocket disconnected");
    }
}

/// PIN gate at the HTTP boundary, before the room ever sees the
/// connection. An empty PIN confines admin eligibility to loopback.
pub fn admin_eligible(
    admin_pin: &str,
    addr: &SocketAddr,
    pin_header: Option<&str>,
    pin_query: Option<&str>,
) -> bool {
    if admin_pin.is_empty() {
        addr.ip().is_loopback()
    } else {
        pin_header == Some(admin_pin) || pin_query == Some(admin_pin)
    }
}

async fn ws_handler(
    State(hub): State<Arc<Hub>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Query(params): Query<std::collections::HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(String::from);

    let eligible = admin_eligible(
        &hub.config.admin_pin,
        &addr,
        headers.get("x-admin-pin").and_then(|h| h.to_str().ok()),
        params.get("pin").map(String::as_str),
    );

    ws.on_upgrade(move |socket| hub.handle_socket(socket, addr, user_agent, eligible))
}

async fn send_kicked(socket: &mut WebSocket, reason: &str) {
    if let Ok(json) = serde_json::to_string(&ServerMessage::Kicked {
        reason: reason.to_string(),
    }) {
        let _ = socket.send(Message::Text(json.into())).await;
    }
    let _ = socket.send(Message::Close(None)).await;
}

async fn writer_loop(
    mut sink: SplitSink<WebSocket, Message>,
    outbound: flume::Receiver<Arc<str>>,
    client: Arc<ClientHandle>,
) {
    loop {
        tokio::select! {
            frame = outbound.recv_async() => {
                match frame {
                    Ok(json) => {
                        if sink.send(Message::Text(json.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                    Err(_) => {
                        let _ = sink.close().await;
                        break;
                    }
                }
            }
            _ = client.closed() => {
                if let Some(reason) = client.kick_reason() {
                    if let Ok(json) = serde_json::to_string(&ServerMessage::Kicked { reason }) {
                        let _ = sink.send(Message::Text(json.into())).await;
                    }
                }
                let _ = sink.close().await;
                break;
            }
        }
    }
}
