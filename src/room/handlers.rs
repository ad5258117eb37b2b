//! Per-message handlers. Each runs on the coordinator's serialized event
//! loop; a handler either mutates state and reports `true` (triggering the
//! snapshot broadcast) or fails with a `ClientError` that is sent to the
//! offending client only.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::common::errors::{ClientError, StoreError};
use crate::common::types::{ClientId, SessionKey, SongId, VocalAssist};
use crate::hub::ClientHandle;
use crate::media::{clamp_semitones, clamp_tempo};
use crate::protocol::{ClientMessage, ServerMessage, SongSummary};
use crate::queue::Song;
use crate::room::{Coordinator, Phase};
use crate::session::{AvatarConfig, Session};

fn store_err(e: StoreError) -> ClientError {
    error!("store failure: {}", e);
    ClientError::Invalid("storage error".into())
}

fn require_admin(actor: &Session) -> Result<(), ClientError> {
    if actor.is_admin {
        Ok(())
    } else {
        Err(ClientError::Unauthorized)
    }
}

impl Coordinator {
    pub(crate) async fn handle_message(&mut self, client_id: ClientId, msg: ClientMessage) -> bool {
        let Some(client) = self.hub.get(client_id) else {
            return false;
        };
        let Some(actor_key) = client.session_key() else {
            let _ = client.send(&ServerMessage::Error {
                message: ClientError::Unauthorized.to_string(),
            });
            return false;
        };
        let actor = match self.store.get(&actor_key) {
            Ok(Some(session)) => session,
            _ => {
                let _ = client.send(&ServerMessage::Error {
                    message: "unknown session".into(),
                });
                return false;
            }
        };

        match self.dispatch(&client, &actor, msg).await {
            Ok(changed) => changed,
            Err(e) => {
                let _ = client.send(&ServerMessage::Error {
                    message: e.to_string(),
                });
                false
            }
        }
    }

    async fn dispatch(
        &mut self,
        client: &Arc<ClientHandle>,
        actor: &Session,
        msg: ClientMessage,
    ) -> Result<bool, ClientError> {
        match msg {
            // A second handshake is answered at the hub; nothing to do.
            ClientMessage::Handshake { .. } => Ok(false),

            ClientMessage::Search { query } => self.on_search(client, &query).await,
            ClientMessage::QueueAdd {
                song_id,
                vocal_assist,
            } => self.on_queue_add(actor, song_id, vocal_assist).await,
            ClientMessage::QueueRemove { song_id } => {
                self.on_queue_remove(actor, &song_id).await
            }
            ClientMessage::QueueMove { from, to } => {
                if self.queue.move_entry(from, to) {
                    Ok(true)
                } else {
                    Err(ClientError::InvalidMove { from, to })
                }
            }
            ClientMessage::QueueClear => {
                require_admin(actor)?;
                self.on_queue_clear().await
            }
            ClientMessage::QueueShuffle => {
                require_admin(actor)?;
                self.queue.shuffle();
                Ok(true)
            }
            ClientMessage::QueueRequeue {
                song_id,
                assigned_key,
            } => {
                require_admin(actor)?;
                if self.queue.requeue(&song_id, assigned_key) {
                    self.schedule_autostart();
                    Ok(true)
                } else {
                    Err(ClientError::Invalid("song is not in the history".into()))
                }
            }

            ClientMessage::Play => {
                require_admin(actor)?;
                self.on_play().await
            }
            ClientMessage::Pause => {
                require_admin(actor)?;
                self.on_pause().await
            }
            ClientMessage::Skip => {
                require_admin(actor)?;
                self.on_skip().await
            }
            ClientMessage::Seek(seconds) => {
                require_admin(actor)?;
                if !matches!(self.state.phase, Phase::Playing { .. }) {
                    return Err(ClientError::Invalid("nothing is playing".into()));
                }
                self.media
                    .seek(seconds)
                    .await
                    .map_err(|e| ClientError::Invalid(e.to_string()))?;
                Ok(true)
            }
            ClientMessage::VocalAssist(level) => self.on_vocal_assist(actor, level).await,
            ClientMessage::Volume(percent) => {
                require_admin(actor)?;
                self.media
                    .set_volume(percent.min(100))
                    .await
                    .map_err(|e| ClientError::Invalid(e.to_string()))?;
                Ok(false)
            }
            ClientMessage::KeyChange(semitones) => {
                require_admin(actor)?;
                self.on_key_change(semitones).await
            }
            ClientMessage::TempoChange(factor) => {
                require_admin(actor)?;
                self.on_tempo_change(factor).await
            }

            ClientMessage::SetDisplayName {
                name,
                avatar_id,
                avatar_config,
            } => self.on_set_display_name(actor, name, avatar_id, avatar_config),
            ClientMessage::SetAvatar(avatar) => {
                self.store
                    .update_avatar(&actor.key, &avatar)
                    .map_err(store_err)?;
                Ok(true)
            }
            ClientMessage::Autoplay(enabled) => {
                require_admin(actor)?;
                self.queue.set_autoplay(enabled);
                if enabled {
                    self.schedule_autostart();
                }
                Ok(true)
            }
            ClientMessage::SetAfk(is_afk) => self.on_set_afk(&actor.key.clone(), is_afk),
            ClientMessage::AddFavorite(song_id) => {
                self.store
                    .favorites_add(&actor.key, &song_id)
                    .map_err(store_err)?;
                Ok(false)
            }
            ClientMessage::RemoveFavorite(song_id) => {
                self.store
                    .favorites_remove(&actor.key, &song_id)
                    .map_err(store_err)?;
                Ok(false)
            }

            ClientMessage::AdminSetAdmin { key, is_admin } => {
                require_admin(actor)?;
                self.store.set_admin(&key, is_admin).map_err(store_err)?;
                if let Some(handle) = self.hub.find_by_key(&key) {
                    handle.set_admin(is_admin);
                }
                self.send_client_list();
                Ok(true)
            }
            ClientMessage::AdminKick { key, reason } => {
                require_admin(actor)?;
                if let Some(handle) = self.hub.find_by_key(&key) {
                    handle.kick(reason.as_deref().unwrap_or("kicked by an admin"));
                    Ok(false)
                } else {
                    Err(ClientError::Invalid("client is not connected".into()))
                }
            }
            ClientMessage::AdminBlock {
                key,
                duration,
                reason,
            } => {
                require_admin(actor)?;
                self.on_admin_block(&key, duration, &reason).await
            }
            ClientMessage::AdminUnblock { key } => {
                require_admin(actor)?;
                self.store.unblock(&key).map_err(store_err)?;
                Ok(false)
            }
            ClientMessage::AdminSetAfk { key, is_afk } => {
                require_admin(actor)?;
                self.on_set_afk(&key, is_afk)
            }
            ClientMessage::AdminSetName { key, name } => {
                require_admin(actor)?;
                self.store.set_name(&key, name.trim()).map_err(store_err)?;
                self.send_client_list();
                Ok(true)
            }
            ClientMessage::AdminSetNameLock { key, locked } => {
                require_admin(actor)?;
                self.store.set_name_lock(&key, locked).map_err(store_err)?;
                Ok(false)
            }

            ClientMessage::AdminPlayNext => {
                require_admin(actor)?;
                self.on_play_next().await
            }
            ClientMessage::AdminStartNow => {
                require_admin(actor)?;
                if self.queue.exhausted() {
                    return Err(ClientError::Invalid("the queue is empty".into()));
                }
                self.start_playing().await;
                Ok(true)
            }
            ClientMessage::AdminStop => {
                require_admin(actor)?;
                self.on_admin_stop().await
            }
            ClientMessage::AdminToggleBgm => {
                require_admin(actor)?;
                self.on_toggle_bgm().await
            }
            ClientMessage::AdminSetMessage { message } => {
                require_admin(actor)?;
                self.store
                    .set_holding_message(&message)
                    .map_err(store_err)?;
                self.state.admin_message = (!message.is_empty()).then_some(message);
                self.refresh_holding_screen(false).await;
                Ok(true)
            }
        }
    }

    async fn on_search(
        &self,
        client: &Arc<ClientHandle>,
        query: &str,
    ) -> Result<bool, ClientError> {
        let entries = self
            .library
            .search(query)
            .await
            .map_err(|e| ClientError::Invalid(format!("search failed: {}", e)))?;
        let results: Vec<SongSummary> = entries.iter().map(SongSummary::from).collect();
        let _ = client.send(&ServerMessage::SearchResult { results });
        Ok(false)
    }

    async fn on_queue_add(
        &mut self,
        actor: &Session,
        song_id: SongId,
        vocal_assist: VocalAssist,
    ) -> Result<bool, ClientError> {
        let entry = self
            .library
            .get(&song_id)
            .await
            .map_err(|e| ClientError::Invalid(format!("library error: {}", e)))?
            .ok_or(ClientError::UnknownSong(song_id))?;
        let song = Song::from_entry(entry, actor.key.clone(), vocal_assist);
        info!(song = %song.id, singer = %actor.key, "queued");
        self.queue.add(song);
        self.schedule_autostart();
        Ok(true)
    }

    async fn on_queue_remove(
        &mut self,
        actor: &Session,
        song_id: &SongId,
    ) -> Result<bool, ClientError> {
        let owner = self
            .queue
            .state()
            .songs
            .iter()
            .find(|s| &s.id == song_id)
            .map(|s| s.added_by.clone())
            .ok_or_else(|| ClientError::NotQueued(song_id.clone()))?;
        if !actor.is_admin && owner != actor.key {
            return Err(ClientError::Unauthorized);
        }
        let (was_current, removed) = self.queue.remove(song_id);
        if was_current {
            let singer = removed.map(|s| s.added_by).unwrap_or(owner);
            self.current_removed(singer).await;
        }
        Ok(true)
    }

    async fn on_queue_clear(&mut self) -> Result<bool, ClientError> {
        if matches!(self.state.phase, Phase::Playing { .. }) {
            let _ = self.media.stop_playback().await;
        }
        self.cancel_countdown();
        self.state.phase = Phase::Idle;
        self.queue.clear();
        self.idle_or_bgm().await;
        Ok(true)
    }

    async fn on_play(&mut self) -> Result<bool, ClientError> {
        match &mut self.state.phase {
            Phase::Playing { paused, .. } if *paused => {
                self.media
                    .resume()
                    .await
                    .map_err(|e| ClientError::Invalid(e.to_string()))?;
                if let Phase::Playing { paused, .. } = &mut self.state.phase {
                    *paused = false;
                }
                Ok(true)
            }
            Phase::Playing { .. } => Ok(false),
            _ => Err(ClientError::Invalid("nothing is playing".into())),
        }
    }

    async fn on_pause(&mut self) -> Result<bool, ClientError> {
        match &self.state.phase {
            Phase::Playing { paused, .. } if !paused => {
                self.media
                    .pause()
                    .await
                    .map_err(|e| ClientError::Invalid(e.to_string()))?;
                if let Phase::Playing { paused, .. } = &mut self.state.phase {
                    *paused = true;
                }
                Ok(true)
            }
            Phase::Playing { .. } => Ok(false),
            _ => Err(ClientError::Invalid("nothing is playing".into())),
        }
    }

    async fn on_skip(&mut self) -> Result<bool, ClientError> {
        match &self.state.phase {
            Phase::Playing { .. } => {
                if let Some(song) = self.queue.current() {
                    self.state.last_singer = Some(song.added_by.clone());
                }
                let _ = self.media.stop_playback().await;
                self.state.phase = Phase::Idle;
                self.queue.skip();
            }
            Phase::Countdown(_) => {
                self.cancel_countdown();
                self.queue.skip();
            }
            Phase::Idle => {
                if self.queue.exhausted() {
                    return Err(ClientError::Invalid("the queue is empty".into()));
                }
                self.queue.skip();
                return Ok(true);
            }
        }
        if self.queue.exhausted() {
            self.idle_or_bgm().await;
        } else {
            self.begin_countdown(self.config.room.admin_countdown_secs, false)
                .await;
        }
        Ok(true)
    }

    async fn on_vocal_assist(
        &mut self,
        actor: &Session,
        level: VocalAssist,
    ) -> Result<bool, ClientError> {
        let current = self
            .queue
            .current()
            .ok_or_else(|| ClientError::Invalid("no current song".into()))?;
        if !actor.is_admin && current.added_by != actor.key {
            return Err(ClientError::Unauthorized);
        }
        let stems = current.stems().map(|(i, v)| (i.to_string(), v.to_string()));
        self.queue.set_current_vocal_assist(level);
        if matches!(self.state.phase, Phase::Playing { .. }) {
            if let Some((instr, vocal)) = stems {
                // Gain-only update: the controller keeps the position.
                self.media
                    .set_vocal_mix(&instr, &vocal, level.gain())
                    .await
                    .map_err(|e| ClientError::Invalid(e.to_string()))?;
            }
        }
        Ok(true)
    }

    async fn on_key_change(&mut self, semitones: i32) -> Result<bool, ClientError> {
        if !self.config.features.pitch_control {
            return Err(ClientError::FeatureDisabled("pitch control"));
        }
        let clamped = clamp_semitones(semitones);
        if !self.queue.set_current_key_change(clamped) {
            return Err(ClientError::Invalid("no current song".into()));
        }
        if matches!(self.state.phase, Phase::Playing { .. }) {
            self.media
                .set_pitch(clamped)
                .await
                .map_err(|e| ClientError::Invalid(e.to_string()))?;
        }
        Ok(true)
    }

    async fn on_tempo_change(&mut self, factor: f64) -> Result<bool, ClientError> {
        if !self.config.features.tempo_control {
            return Err(ClientError::FeatureDisabled("tempo control"));
        }
        let clamped = clamp_tempo(factor);
        if !self.queue.set_current_tempo(clamped) {
            return Err(ClientError::Invalid("no current song".into()));
        }
        if matches!(self.state.phase, Phase::Playing { .. }) {
            self.media
                .set_tempo(clamped)
                .await
                .map_err(|e| ClientError::Invalid(e.to_string()))?;
        }
        Ok(true)
    }

    fn on_set_display_name(
        &mut self,
        actor: &Session,
        name: Option<String>,
        avatar_id: Option<u64>,
        avatar_config: Option<AvatarConfig>,
    ) -> Result<bool, ClientError> {
        let mut changed = false;
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            if actor.name_locked && !actor.is_admin {
                return Err(ClientError::NameLocked);
            }
            self.store
                .set_name(&actor.key, name.trim())
                .map_err(store_err)?;
            changed = true;
        }
        if let Some(avatar) = avatar_config {
            self.store
                .update_avatar(&actor.key, &avatar)
                .map_err(store_err)?;
            changed = true;
        } else if let Some(seed) = avatar_id {
            self.store
                .update_avatar(&actor.key, &AvatarConfig::from_seed(seed))
                .map_err(store_err)?;
            changed = true;
        }
        if changed {
            self.send_client_list();
        }
        Ok(changed)
    }

    fn on_set_afk(&mut self, key: &SessionKey, is_afk: bool) -> Result<bool, ClientError> {
        self.store.set_afk(key, is_afk).map_err(store_err)?;
        if is_afk {
            // Going AFK demotes the user's upcoming songs; coming back
            // changes nothing.
            self.queue.bump_user_to_end(key);
        }
        self.send_client_list();
        Ok(true)
    }

    async fn on_admin_block(
        &mut self,
        key: &SessionKey,
        duration: Option<u64>,
        reason: &str,
    ) -> Result<bool, ClientError> {
        self.store
            .block(key, duration.map(Duration::from_secs), reason)
            .map_err(store_err)?;
        info!(key = %key, reason, "blocked");

        let removed_current = self.queue.remove_by_user(key);
        if removed_current {
            self.current_removed(key.clone()).await;
        }
        if let Some(handle) = self.hub.find_by_key(key) {
            handle.kick(&format!("You have been blocked: {}", reason));
        }
        Ok(true)
    }

    async fn on_play_next(&mut self) -> Result<bool, ClientError> {
        if self.queue.exhausted() {
            return Err(ClientError::Invalid("the queue is empty".into()));
        }
        if matches!(self.state.phase, Phase::Playing { .. }) {
            let _ = self.media.stop_playback().await;
            self.state.phase = Phase::Idle;
        }
        self.begin_countdown(self.config.room.admin_countdown_secs, false)
            .await;
        Ok(true)
    }

    async fn on_admin_stop(&mut self) -> Result<bool, ClientError> {
        match &self.state.phase {
            Phase::Playing { .. } => {
                if let Some(song) = self.queue.current() {
                    self.state.last_singer = Some(song.added_by.clone());
                }
                let _ = self.media.stop_playback().await;
                self.state.phase = Phase::Idle;
                self.queue.skip();
            }
            Phase::Countdown(_) => {
                self.cancel_countdown();
                self.queue.skip();
            }
            Phase::Idle => {}
        }
        self.idle_or_bgm().await;
        Ok(true)
    }

    async fn on_toggle_bgm(&mut self) -> Result<bool, ClientError> {
        if self.state.bgm_active {
            self.state.bgm_enabled = false;
            self.stop_bgm(self.config.bgm.fade_out_secs).await;
            self.refresh_holding_screen(true).await;
            return Ok(true);
        }
        if matches!(self.state.phase, Phase::Countdown(_) | Phase::Playing { .. }) {
            return Err(ClientError::Invalid("cannot start bgm right now".into()));
        }
        if !self.config.bgm.usable() {
            return Err(ClientError::FeatureDisabled("bgm"));
        }
        self.ensure_player()
            .await
            .map_err(|e| ClientError::Invalid(e.to_string()))?;
        self.state.bgm_enabled = true;
        self.start_bgm().await;
        Ok(true)
    }

    /// The song at the cursor vanished (removed or its singer blocked)
    /// while it was current.
    pub(crate) async fn current_removed(&mut self, singer: SessionKey) {
        self.state.last_singer = Some(singer);
        match &self.state.phase {
            Phase::Playing { .. } => {
                let _ = self.media.stop_playback().await;
                self.state.phase = Phase::Idle;
                let next_singer = self.queue.current().map(|s| s.added_by.clone());
                match next_singer {
                    Some(next_singer) if self.queue.autoplay() => {
                        let requires_approval =
                            self.state.last_singer.as_ref() != Some(&next_singer);
                        self.begin_countdown(
                            self.config.room.natural_countdown_secs,
                            requires_approval,
                        )
                        .await;
                    }
                    _ => self.idle_or_bgm().await,
                }
            }
            Phase::Countdown(_) => {
                self.cancel_countdown();
                if self.queue.autoplay() && !self.queue.exhausted() {
                    self.begin_countdown(self.config.room.natural_countdown_secs, true)
                        .await;
                } else {
                    self.idle_or_bgm().await;
                }
            }
            Phase::Idle => {}
        }
    }
}
