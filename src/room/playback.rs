//! Playback state machine: idle → countdown → playing → idle, with BGM as
//! a sub-state of idle. Every transition runs on the coordinator's event
//! loop; nothing else writes these states.

use std::time::Duration;

use tracing::{info, warn};

use crate::common::errors::MediaError;
use crate::queue::Song;
use crate::room::countdown::{Countdown, Ticker};
use crate::room::{Coordinator, Phase, RoomEvent};

impl Coordinator {
    /// Cancels any active countdown. Idempotent: the generation bump makes
    /// in-flight ticks inert, and the ticker task is aborted.
    pub(crate) fn cancel_countdown(&mut self) {
        if let Some(ticker) = self.state.countdown_ticker.take() {
            ticker.cancel();
        }
        self.state.countdown_gen += 1;
        if matches!(self.state.phase, Phase::Countdown(_)) {
            self.state.phase = Phase::Idle;
        }
    }

    /// Seeds a countdown toward the current queue entry. Always stops BGM;
    /// the holding screen shows the "next up" card while counting.
    pub(crate) async fn begin_countdown(&mut self, seconds: u32, requires_approval: bool) -> bool {
        let Some(song) = self.queue.current().cloned() else {
            return false;
        };
        self.cancel_countdown();
        self.stop_bgm(self.config.bgm.fade_out_secs).await;

        self.state.countdown_gen += 1;
        let generation = self.state.countdown_gen;
        self.state.phase = Phase::Countdown(Countdown {
            seconds_remaining: seconds,
            requires_approval,
            song_id: song.id.clone(),
            singer: song.added_by.clone(),
            generation,
        });
        self.state.countdown_ticker = Some(Ticker::spawn(generation, self.ticks_tx.clone()));
        info!(song = %song.id, seconds, requires_approval, "countdown started");
        self.refresh_holding_screen(true).await;
        true
    }

    pub(crate) async fn handle_tick(&mut self, generation: u64) -> bool {
        let Phase::Countdown(cd) = &mut self.state.phase else {
            return false;
        };
        if cd.generation != generation || cd.seconds_remaining == 0 {
            return false;
        }
        cd.seconds_remaining -= 1;
        if cd.seconds_remaining == 0 {
            if cd.requires_approval {
                // Hold at zero; only an admin start advances from here.
                if let Some(ticker) = self.state.countdown_ticker.take() {
                    ticker.cancel();
                }
            } else {
                self.start_playing().await;
            }
        }
        true
    }

    /// Transition into Playing for the current queue entry.
    pub(crate) async fn start_playing(&mut self) {
        self.cancel_countdown();
        self.stop_bgm(0.0).await;

        let Some(song) = self.queue.current().cloned() else {
            self.idle_or_bgm().await;
            return;
        };

        if let Err(e) = self.ensure_player().await {
            warn!("player unavailable: {}", e);
            self.state.phase = Phase::Idle;
            return;
        }

        match self.load_current(&song).await {
            Ok(load_id) => {
                self.state.current_load = load_id;
                self.state.phase = Phase::Playing {
                    song_id: song.id.clone(),
                    paused: false,
                };
                info!(song = %song.id, singer = %song.added_by, "playing");
                if self.config.features.singer_name_overlay {
                    if let Some(name) = self.display_name_of(&song.added_by) {
                        let _ = self
                            .media
                            .show_overlay(&name, self.config.room.overlay_duration_ms)
                            .await;
                    }
                }
                self.refresh_ticker().await;
            }
            Err(e) => {
                warn!(song = %song.id, "load failed: {}", e);
                self.handle_load_failure().await;
            }
        }
    }

    /// Load policy: CDG pair beats stems beats the plain media file.
    /// Pitch and tempo apply after the load.
    async fn load_current(&self, song: &Song) -> Result<u64, MediaError> {
        let load_id = if let Some((graphics, audio)) = song.cdg() {
            self.media.load_cdg(graphics, audio).await?
        } else if let Some((instr, vocal)) = song.stems() {
            self.media
                .set_vocal_mix(instr, vocal, song.vocal_assist.gain())
                .await?
        } else {
            self.media.load_file(&song.primary_media_path).await?
        };
        if song.key_change_semitones != 0 {
            let _ = self.media.set_pitch(song.key_change_semitones).await;
        }
        if (song.tempo_factor - 1.0).abs() > f64::EPSILON {
            let _ = self.media.set_tempo(song.tempo_factor).await;
        }
        Ok(load_id)
    }

    /// A failed load counts as the song having ended: advance, then retry
    /// after a short guard delay so a broken library cannot spin the
    /// player in a tight loop.
    pub(crate) async fn handle_load_failure(&mut self) {
        if let Some(song) = self.queue.current() {
            self.state.last_singer = Some(song.added_by.clone());
        }
        self.state.phase = Phase::Idle;
        self.queue.skip();
        if self.queue.exhausted() {
            self.idle_or_bgm().await;
            return;
        }
        self.state.timer_gen += 1;
        let generation = self.state.timer_gen;
        let tx = self.events_tx.clone();
        let delay = Duration::from_millis(self.config.room.load_retry_delay_ms);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(RoomEvent::RetryPlayback { generation });
        });
    }

    pub(crate) async fn handle_retry(&mut self, generation: u64) -> bool {
        if generation != self.state.timer_gen || !matches!(self.state.phase, Phase::Idle) {
            return false;
        }
        if self.queue.exhausted() {
            self.idle_or_bgm().await;
        } else {
            self.start_playing().await;
        }
        true
    }

    /// Natural end of the most recently loaded song.
    pub(crate) async fn handle_track_end(&mut self, load_id: u64) -> bool {
        if !matches!(self.state.phase, Phase::Playing { .. })
            || load_id != self.state.current_load
        {
            return false;
        }
        if let Some(song) = self.queue.current() {
            self.state.last_singer = Some(song.added_by.clone());
        }
        self.state.phase = Phase::Idle;
        self.queue.skip();

        let next_singer = self.queue.current().map(|song| song.added_by.clone());
        match next_singer {
            Some(next_singer) if self.queue.autoplay() => {
                // A different singer gets an approval gate; the same
                // singer rolls straight through at zero.
                let requires_approval = self.state.last_singer.as_ref() != Some(&next_singer);
                self.begin_countdown(self.config.room.natural_countdown_secs, requires_approval)
                    .await;
            }
            _ => self.idle_or_bgm().await,
        }
        true
    }

    /// The player's own pause state changed under us (someone used the
    /// player window directly). Mirror it so snapshots stay truthful.
    pub(crate) fn handle_player_state_change(&mut self, player_paused: bool) -> bool {
        if let Phase::Playing { paused, .. } = &mut self.state.phase {
            if *paused != player_paused {
                *paused = player_paused;
                return true;
            }
        }
        false
    }

    pub(crate) async fn handle_player_exit(&mut self) -> bool {
        warn!("player subprocess gone; room falls back to idle");
        self.cancel_countdown();
        self.state.phase = Phase::Idle;
        self.state.bgm_active = false;
        true
    }

    /// The queue became non-empty while idle: schedule the delayed
    /// auto-start so the holding screen gets to show "next up" first.
    pub(crate) fn schedule_autostart(&mut self) {
        if !matches!(self.state.phase, Phase::Idle)
            || !self.queue.autoplay()
            || self.queue.exhausted()
        {
            return;
        }
        self.state.timer_gen += 1;
        let generation = self.state.timer_gen;
        let tx = self.events_tx.clone();
        let delay = Duration::from_secs(self.config.room.initial_play_delay_secs);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(RoomEvent::AutoStartDue { generation });
        });
    }

    pub(crate) async fn handle_autostart_due(&mut self, generation: u64) -> bool {
        if generation != self.state.timer_gen
            || !matches!(self.state.phase, Phase::Idle)
            || !self.queue.autoplay()
            || self.queue.exhausted()
        {
            return false;
        }
        let Some(next_singer) = self.queue.current().map(|song| song.added_by.clone()) else {
            return false;
        };
        let same_singer = match &self.state.last_singer {
            Some(last) => last == &next_singer,
            // Nobody has sung yet: play straight away.
            None => true,
        };
        if same_singer {
            self.start_playing().await;
        } else {
            self.begin_countdown(self.config.room.natural_countdown_secs, true)
                .await;
        }
        true
    }

    /// Falls back to the holding screen, or BGM when the room wants it.
    pub(crate) async fn idle_or_bgm(&mut self) {
        self.cancel_countdown();
        self.state.phase = Phase::Idle;
        if self.state.bgm_enabled && !self.state.bgm_active && self.media.is_running() {
            self.start_bgm().await;
        }
        self.refresh_holding_screen(!self.state.bgm_active).await;
    }

    pub(crate) async fn start_bgm(&mut self) {
        if self.state.bgm_active || !self.config.bgm.usable() {
            return;
        }
        let input = self.holding_input();
        let path = match self.holding.render(&input).await {
            Ok(path) => path,
            Err(e) => {
                warn!("holding screen render failed, bgm not started: {}", e);
                return;
            }
        };
        self.state.last_holding = Some(input);
        match self
            .media
            .load_bgm_over_image(
                &path.to_string_lossy(),
                &self.config.bgm.url,
                self.config.bgm.volume,
                Duration::from_secs_f64(self.config.bgm.fade_in_secs),
            )
            .await
        {
            Ok(()) => {
                self.state.bgm_active = true;
                info!(url = %self.config.bgm.url, "bgm started");
            }
            Err(e) => warn!("bgm start failed: {}", e),
        }
    }

    pub(crate) async fn stop_bgm(&mut self, fade_secs: f64) {
        if !self.state.bgm_active {
            return;
        }
        self.state.bgm_active = false;
        if let Err(e) = self
            .media
            .stop_bgm(Duration::from_secs_f64(fade_secs))
            .await
        {
            warn!("bgm stop failed: {}", e);
        }
    }

    pub(crate) async fn ensure_player(&self) -> Result<(), MediaError> {
        if self.media.is_running() {
            return Ok(());
        }
        info!("player not running, restarting");
        self.media.restart().await
    }
}
