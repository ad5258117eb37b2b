//! The room coordinator: the one place that mutates cross-cutting state.
//! All external stimuli arrive as `RoomEvent`s on a single serialized
//! stream; every handler is followed by a complete snapshot broadcast, so
//! every client observes the same total order of room states.

pub mod countdown;
pub mod events;
pub mod handlers;
pub mod playback;

pub use events::RoomEvent;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::common::types::{SessionKey, SongId};
use crate::configs::Config;
use crate::holding::{HoldingScreen, HoldingScreenInput, NextUp};
use crate::hub::{ClientHandle, Hub};
use crate::library::SongLibrary;
use crate::media::{MediaBackend, MediaEvent};
use crate::protocol::{
    ClientInfo, CountdownView, PlayerView, RoomSnapshot, ServerMessage, SessionView,
};
use crate::queue::{QueueManager, QueueState};
use crate::room::countdown::{Countdown, Ticker};
use crate::session::{DeviceInfo, SessionStore};

/// The playback phase. The countdown lives inside the phase so "at most
/// one countdown, and never while playing" holds by construction.
#[derive(Debug)]
pub(crate) enum Phase {
    Idle,
    Countdown(Countdown),
    Playing { song_id: SongId, paused: bool },
}

pub(crate) struct RoomState {
    pub phase: Phase,
    pub countdown_ticker: Option<Ticker>,
    pub countdown_gen: u64,
    /// Guards the one-shot timers (initial autostart, load retry).
    pub timer_gen: u64,
    /// Runtime BGM preference; seeded from config, flipped by the admin
    /// toggle.
    pub bgm_enabled: bool,
    pub bgm_active: bool,
    /// Singer of the last song that finished (or failed) this run.
    pub last_singer: Option<SessionKey>,
    /// Load id of the song the player is expected to finish next.
    pub current_load: u64,
    pub admin_message: Option<String>,
    pub last_holding: Option<HoldingScreenInput>,
}

pub struct Coordinator {
    pub(crate) config: Config,
    pub(crate) store: Arc<SessionStore>,
    pub(crate) library: Arc<dyn SongLibrary>,
    pub(crate) media: Arc<dyn MediaBackend>,
    pub(crate) holding: Arc<dyn HoldingScreen>,
    pub(crate) hub: Arc<Hub>,
    pub(crate) queue: QueueManager,
    pub(crate) events_tx: flume::Sender<RoomEvent>,
    events_rx: flume::Receiver<RoomEvent>,
    pub(crate) ticks_tx: flume::Sender<RoomEvent>,
    ticks_rx: flume::Receiver<RoomEvent>,
    pub(crate) state: RoomState,
}

impl Coordinator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        store: Arc<SessionStore>,
        library: Arc<dyn SongLibrary>,
        media: Arc<dyn MediaBackend>,
        holding: Arc<dyn HoldingScreen>,
        hub: Arc<Hub>,
        events_tx: flume::Sender<RoomEvent>,
        events_rx: flume::Receiver<RoomEvent>,
    ) -> Self {
        let (ticks_tx, ticks_rx) = flume::unbounded();

        let persisted = match store.load_queue() {
            Ok(state) => state,
            Err(e) => {
                error!("failed to load persisted queue, starting empty: {}", e);
                None
            }
        };
        let queue_state = persisted.unwrap_or_else(|| QueueState {
            songs: Vec::new(),
            position: 0,
            autoplay: config.room.autoplay_default,
        });
        let mut queue = QueueManager::new(queue_state, store.clone());
        queue.set_fair_rotation(config.features.fair_rotation);
        {
            let tx = events_tx.clone();
            queue.set_on_change(Box::new(move || {
                let _ = tx.send(RoomEvent::QueueChanged);
            }));
        }

        let admin_message = store.holding_message().ok().flatten().or_else(|| {
            (!config.server.holding_message.is_empty())
                .then(|| config.server.holding_message.clone())
        });
        let bgm_enabled = config.bgm.usable();

        Self {
            config,
            store,
            library,
            media,
            holding,
            hub,
            queue,
            events_tx,
            events_rx,
            ticks_tx,
            ticks_rx,
            state: RoomState {
                phase: Phase::Idle,
                countdown_ticker: None,
                countdown_gen: 0,
                timer_gen: 0,
                bgm_enabled,
                bgm_active: false,
                last_singer: None,
                current_load: 0,
                admin_message,
                last_holding: None,
            },
        }
    }

    /// Bridges the media controller's event channel into the room stream.
    pub fn spawn_media_forwarder(
        events_tx: flume::Sender<RoomEvent>,
        media_rx: flume::Receiver<MediaEvent>,
    ) {
        tokio::spawn(async move {
            while let Ok(event) = media_rx.recv_async().await {
                if events_tx.send(RoomEvent::Media(event)).is_err() {
                    break;
                }
            }
        });
    }

    pub async fn run(mut self) {
        info!("room coordinator running");
        self.refresh_holding_screen(true).await;
        loop {
            // Client messages outrank countdown ticks: a pending
            // `start_now` is never lost to a racing tick.
            let event = tokio::select! {
                biased;
                ev = self.events_rx.recv_async() => ev,
                ev = self.ticks_rx.recv_async() => ev,
            };
            let Ok(event) = event else { break };
            if matches!(event, RoomEvent::Shutdown) {
                self.shutdown().await;
                break;
            }
            self.handle_event(event).await;
        }
        info!("room coordinator stopped");
    }

    pub(crate) async fn handle_event(&mut self, event: RoomEvent) {
        let changed = match event {
            RoomEvent::Connected {
                client,
                session_key,
                display_name,
            } => self.handle_connected(client, session_key, display_name).await,
            RoomEvent::Message { client_id, msg } => {
                self.handle_message(client_id, msg).await
            }
            RoomEvent::Disconnected {
                client_id,
                session_key,
            } => self.handle_disconnected(client_id, session_key).await,
            RoomEvent::Media(MediaEvent::TrackEnded { load_id }) => {
                self.handle_track_end(load_id).await
            }
            RoomEvent::Media(MediaEvent::StateChanged { paused }) => {
                self.handle_player_state_change(paused)
            }
            RoomEvent::Media(MediaEvent::PlayerExited) => self.handle_player_exit().await,
            RoomEvent::QueueChanged => self.handle_queue_changed().await,
            RoomEvent::CountdownTick { generation } => self.handle_tick(generation).await,
            RoomEvent::AutoStartDue { generation } => {
                self.handle_autostart_due(generation).await
            }
            RoomEvent::RetryPlayback { generation } => self.handle_retry(generation).await,
            RoomEvent::Shutdown => false,
        };
        if changed {
            self.broadcast_room().await;
        }
    }

    async fn handle_connected(
        &mut self,
        client: Arc<ClientHandle>,
        session_key: Option<SessionKey>,
        display_name: Option<String>,
    ) -> bool {
        // A blocked key is turned away before any session mutation.
        if let Some(key) = session_key.as_ref().filter(|k| !k.is_empty()) {
            match self.store.is_blocked(key) {
                Ok(Some(reason)) => {
                    client.kick(&format!("You have been blocked: {}", reason));
                    return false;
                }
                Ok(None) => {}
                Err(e) => {
                    error!("block lookup failed: {}", e);
                    client.kick("server error");
                    return false;
                }
            }
        }

        let mut session = match self
            .store
            .get_or_create(session_key.as_ref(), display_name.as_deref())
        {
            Ok(session) => session,
            Err(e) => {
                error!("session load failed: {}", e);
                client.kick("server error");
                return false;
            }
        };

        if client.admin_eligible && !session.is_admin {
            if let Err(e) = self.store.set_admin(&session.key, true) {
                warn!("could not persist admin bit: {}", e);
            } else {
                session.is_admin = true;
            }
        }

        self.store.set_online(&session.key, true);
        let _ = self.store.touch(&session.key);
        let _ = self.store.update_device_info(
            &session.key,
            &DeviceInfo {
                ip: client.addr.clone(),
                user_agent: client.user_agent.clone(),
                device_name: None,
            },
        );

        client.attach(session.key.clone(), session.is_admin);
        session.is_online = true;
        info!(key = %session.key, name = %session.display_name, "client attached");

        let snapshot = self.compose_snapshot().await;
        if client
            .send(&ServerMessage::Welcome {
                session,
                state: snapshot,
            })
            .is_err()
        {
            client.kick("connection lagged");
            return false;
        }

        self.send_client_list();
        true
    }

    async fn handle_disconnected(
        &mut self,
        client_id: crate::common::types::ClientId,
        session_key: Option<SessionKey>,
    ) -> bool {
        info!(client = %client_id, "client detached");
        let Some(key) = session_key else {
            return false;
        };
        // Another device may still be connected with the same identity.
        if self.hub.find_by_key(&key).is_none() {
            self.store.set_online(&key, false);
        }
        self.send_client_list();
        true
    }

    async fn handle_queue_changed(&mut self) -> bool {
        self.refresh_ticker().await;
        if !matches!(self.state.phase, Phase::Playing { .. }) {
            self.refresh_holding_screen(false).await;
        }
        true
    }

    /// Full room snapshot; receivers replace their state wholesale.
    pub(crate) async fn compose_snapshot(&self) -> RoomSnapshot {
        let player = match &self.state.phase {
            Phase::Idle if self.state.bgm_active => PlayerView::Bgm {
                source_url: self.config.bgm.url.clone(),
                volume: self.config.bgm.volume,
            },
            Phase::Idle => PlayerView::Idle,
            Phase::Countdown(cd) => PlayerView::CountingDown {
                seconds_remaining: cd.seconds_remaining,
                requires_approval: cd.requires_approval,
                next_song_id: cd.song_id.clone(),
                next_singer: cd.singer.clone(),
            },
            Phase::Playing { song_id, paused } => PlayerView::Playing {
                song_id: song_id.clone(),
                position_seconds: self.media.position_seconds().await.unwrap_or(0.0),
                paused: *paused,
            },
        };

        let countdown = match &self.state.phase {
            Phase::Countdown(cd) => Some(CountdownView {
                active: true,
                seconds_remaining: cd.seconds_remaining,
                next_song_id: cd.song_id.clone(),
                next_singer_key: cd.singer.clone(),
                requires_approval: cd.requires_approval,
            }),
            _ => None,
        };

        let active_sessions = self
            .store
            .list_active()
            .map(|sessions| sessions.iter().map(SessionView::from).collect())
            .unwrap_or_default();

        RoomSnapshot {
            player,
            queue: self.queue.state().clone(),
            countdown,
            active_sessions,
            bgm_active: self.state.bgm_active,
            bgm_enabled: self.state.bgm_enabled,
            idle: !matches!(self.state.phase, Phase::Playing { .. }),
            player_running: self.media.is_running(),
            admin_message: self.state.admin_message.clone(),
        }
    }

    pub(crate) async fn broadcast_room(&self) {
        let snapshot = self.compose_snapshot().await;
        self.hub.broadcast_all(&ServerMessage::StateUpdate(snapshot));
    }

    pub(crate) fn send_client_list(&self) {
        let mut clients = Vec::new();
        for handle in self.hub.connected_clients() {
            let Some(key) = handle.session_key() else {
                continue;
            };
            let Ok(Some(session)) = self.store.get(&key) else {
                continue;
            };
            clients.push(ClientInfo {
                key,
                display_name: session.display_name,
                addr: handle.addr.clone(),
                user_agent: handle.user_agent.clone(),
                is_admin: session.is_admin,
                is_afk: session.is_afk,
            });
        }
        self.hub
            .broadcast_to_admins(&ServerMessage::ClientList { clients });
    }

    pub(crate) fn display_name_of(&self, key: &SessionKey) -> Option<String> {
        self.store
            .get(key)
            .ok()
            .flatten()
            .map(|s| s.display_name)
    }

    pub(crate) async fn refresh_ticker(&self) {
        if !self.config.features.scrolling_ticker || !self.media.is_running() {
            return;
        }
        let state = self.queue.state();
        let entries: Vec<String> = state
            .songs
            .iter()
            .skip(state.position + 1)
            .take(5)
            .map(|song| {
                let singer = self
                    .display_name_of(&song.added_by)
                    .unwrap_or_else(|| "?".to_string());
                format!("{} – {}", singer, song.title)
            })
            .collect();
        if entries.is_empty() {
            let _ = self.media.hide_ticker().await;
        } else {
            let _ = self.media.show_ticker(&entries).await;
        }
    }

    pub(crate) fn holding_input(&self) -> HoldingScreenInput {
        let next_up = match &self.state.phase {
            Phase::Playing { .. } => None,
            _ => self.queue.current().map(|song| {
                let (singer_name, singer_avatar) = self
                    .store
                    .get(&song.added_by)
                    .ok()
                    .flatten()
                    .map(|s| (s.display_name, s.avatar))
                    .unwrap_or_default();
                NextUp {
                    title: song.title.clone(),
                    artist: song.artist.clone(),
                    singer_name,
                    singer_avatar,
                }
            }),
        };
        HoldingScreenInput {
            connect_url: self.config.server.connect_url(),
            next_up,
            admin_message: self.state.admin_message.clone(),
        }
    }

    /// Renders and shows the holding image. `force` pushes it to the
    /// player even when the inputs are unchanged (e.g. the screen was
    /// showing a song until a moment ago).
    pub(crate) async fn refresh_holding_screen(&mut self, force: bool) {
        if matches!(self.state.phase, Phase::Playing { .. }) {
            return;
        }
        let input = self.holding_input();
        if !force && self.state.last_holding.as_ref() == Some(&input) {
            return;
        }
        let path = match self.holding.render(&input).await {
            Ok(path) => path,
            Err(e) => {
                warn!("holding screen render failed: {}", e);
                return;
            }
        };
        self.state.last_holding = Some(input);
        let path = path.to_string_lossy().to_string();
        if self.state.bgm_active {
            // Swap only the image; BGM audio keeps playing.
            if let Err(e) = self.media.update_bgm_image(&path).await {
                warn!("bgm image update failed: {}", e);
            }
        } else if self.media.is_running() {
            if let Err(e) = self.media.load_image(&path).await {
                warn!("holding image load failed: {}", e);
            }
        }
    }

    async fn shutdown(&mut self) {
        info!("room shutting down");
        self.cancel_countdown();
        self.state.phase = Phase::Idle;
        self.state.bgm_active = false;
        let snapshot = self.compose_snapshot().await;
        self.hub.broadcast_all(&ServerMessage::StateUpdate(snapshot));
        self.hub.disconnect_all("server shutting down");
        // Give writers a moment to flush the final frames.
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Err(e) = self.media.stop().await {
            warn!("player stop failed during shutdown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests;
