//! The media controller owns the one external player subprocess and is
//! the only component talking across the process boundary. High-level
//! intents become IPC commands; the player's end-of-file notifications
//! come back up as typed events.

pub mod fade;
pub mod ipc;
pub mod protocol;

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::common::errors::MediaError;
use crate::configs::{DisplaySettings, MediaConfig};
use crate::media::ipc::IpcChannel;
use crate::media::protocol::cmd;

const QUIT_GRACE: Duration = Duration::from_secs(3);
const KILL_GRACE: Duration = Duration::from_secs(2);

/// What the last `load_*` put on screen. Only a Song load arms the
/// track-end notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    None,
    Song,
    Image,
    Bgm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// The most recently loaded song reached its natural end.
    TrackEnded { load_id: u64 },
    /// Pause flipped on the player side (e.g. through the player's own
    /// controls). Coalesced: only the latest value matters.
    StateChanged { paused: bool },
    /// The subprocess died without being asked to.
    PlayerExited,
}

/// The surface the room coordinator drives. A trait so tests can swap in
/// a recording fake.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn start(&self) -> Result<(), MediaError>;
    async fn stop(&self) -> Result<(), MediaError>;
    async fn restart(&self) -> Result<(), MediaError>;
    fn is_running(&self) -> bool;

    /// Plays a media file; the returned load id tags the eventual
    /// `TrackEnded`.
    async fn load_file(&self, path: &str) -> Result<u64, MediaError>;
    /// Shows a static image indefinitely. Never produces a track end.
    async fn load_image(&self, path: &str) -> Result<(), MediaError>;
    async fn load_cdg(&self, graphics: &str, audio: &str) -> Result<u64, MediaError>;
    /// Dual-track playback with the vocal stem at `gain`. Re-callable to
    /// change the gain live without resetting the position.
    async fn set_vocal_mix(&self, instr: &str, vocal: &str, gain: f64) -> Result<u64, MediaError>;

    async fn set_pitch(&self, semitones: i8) -> Result<(), MediaError>;
    async fn set_tempo(&self, factor: f64) -> Result<(), MediaError>;
    async fn set_volume(&self, percent: u8) -> Result<(), MediaError>;
    async fn pause(&self) -> Result<(), MediaError>;
    async fn resume(&self) -> Result<(), MediaError>;
    async fn seek(&self, seconds: f64) -> Result<(), MediaError>;

    async fn load_bgm_over_image(
        &self,
        image: &str,
        url: &str,
        target_volume: u8,
        fade_in: Duration,
    ) -> Result<(), MediaError>;
    /// Swaps the visible image while BGM audio continues uninterrupted.
    async fn update_bgm_image(&self, image: &str) -> Result<(), MediaError>;
    async fn stop_bgm(&self, fade_out: Duration) -> Result<(), MediaError>;

    /// Stops the current item, leaving the subprocess idle and ready.
    async fn stop_playback(&self) -> Result<(), MediaError>;

    async fn show_ticker(&self, entries: &[String]) -> Result<(), MediaError>;
    async fn hide_ticker(&self) -> Result<(), MediaError>;
    async fn show_overlay(&self, text: &str, duration_ms: u32) -> Result<(), MediaError>;

    async fn position_seconds(&self) -> Option<f64>;
}

pub fn clamp_semitones(value: i32) -> i8 {
    value.clamp(-12, 12) as i8
}

pub fn clamp_tempo(value: f64) -> f64 {
    if value.is_nan() { 1.0 } else { value.clamp(0.5, 2.0) }
}

#[derive(Debug, Clone, Copy)]
struct Load {
    id: u64,
    kind: LoadKind,
}

#[derive(Debug, Clone, Copy, Default)]
struct AfState {
    mix_gain: Option<f64>,
    pitch_semitones: i8,
}

/// Composes the single filter chain: stem mix first, then pitch shift.
/// One chain so a gain change and a key change never clobber each other.
fn af_chain(af: AfState) -> String {
    let mut parts = Vec::new();
    if let Some(gain) = af.mix_gain {
        parts.push(format!(
            "lavfi=[amix=inputs=2:duration=first:weights='1 {:.2}']",
            gain
        ));
    }
    if af.pitch_semitones != 0 {
        let scale = 2f64.powf(f64::from(af.pitch_semitones) / 12.0);
        parts.push(format!("rubberband=pitch-scale={:.6}", scale));
    }
    parts.join(",")
}

/// Arguments the player is spawned with. Display targeting is honored
/// here, on the next start/restart.
fn player_args(display: &DisplaySettings, socket_path: &str) -> Vec<String> {
    let mut args = vec![
        "--idle=yes".to_string(),
        format!("--input-ipc-server={}", socket_path),
        "--force-window=yes".to_string(),
        "--no-terminal".to_string(),
        "--keep-open=no".to_string(),
        "--image-display-duration=inf".to_string(),
        "--audio-pitch-correction=yes".to_string(),
    ];
    if let Some(index) = display.screen_index {
        args.push(format!("--screen={}", index));
    }
    if let Some(name) = &display.target_display_name {
        args.push(format!("--screen-name={}", name));
    }
    if display.auto_fullscreen {
        args.push("--fullscreen".to_string());
    }
    args
}

struct SharedState {
    running: AtomicBool,
    quitting: AtomicBool,
    load: Mutex<Load>,
}

struct Inner {
    ipc: Option<Arc<IpcChannel>>,
    kill_tx: Option<flume::Sender<()>>,
    exited: Option<watch::Receiver<bool>>,
    af: AfState,
    stems: Option<(String, String)>,
    bgm_image: Option<String>,
    volume: u8,
}

pub struct MpvController {
    config: MediaConfig,
    display: DisplaySettings,
    socket_path: String,
    shared: Arc<SharedState>,
    inner: AsyncMutex<Inner>,
    fade_gen: Arc<AtomicU64>,
    events: flume::Sender<MediaEvent>,
}

impl MpvController {
    pub fn new(config: MediaConfig, socket_path: String, events: flume::Sender<MediaEvent>) -> Self {
        let display = config.display_settings();
        Self {
            config,
            display,
            socket_path,
            shared: Arc::new(SharedState {
                running: AtomicBool::new(false),
                quitting: AtomicBool::new(false),
                load: Mutex::new(Load {
                    id: 0,
                    kind: LoadKind::None,
                }),
            }),
            inner: AsyncMutex::new(Inner {
                ipc: None,
                kill_tx: None,
                exited: None,
                af: AfState::default(),
                stems: None,
                bgm_image: None,
                volume: 100,
            }),
            fade_gen: Arc::new(AtomicU64::new(0)),
            events,
        }
    }

    fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.config.command_timeout_secs)
    }

    fn arm_load(&self, kind: LoadKind) -> u64 {
        let mut load = self.shared.load.lock();
        load.id += 1;
        load.kind = kind;
        load.id
    }

    fn disarm_load(&self) {
        self.shared.load.lock().kind = LoadKind::None;
    }

    fn ipc_of(&self, inner: &Inner) -> Result<Arc<IpcChannel>, MediaError> {
        if !self.shared.running.load(Ordering::SeqCst) {
            return Err(MediaError::NotRunning);
        }
        inner.ipc.clone().ok_or(MediaError::NotRunning)
    }

    async fn apply_af(&self, af: AfState, ipc: &IpcChannel) -> Result<(), MediaError> {
        ipc.command(cmd::af_set(&af_chain(af))).await?;
        Ok(())
    }

    async fn await_exit(exited: &mut watch::Receiver<bool>, grace: Duration) -> bool {
        tokio::time::timeout(grace, async {
            while !*exited.borrow() {
                if exited.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .is_ok()
    }
}

#[async_trait]
impl MediaBackend for MpvController {
    async fn start(&self) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        if self.shared.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let _ = std::fs::remove_file(&self.socket_path);
        let mut child = Command::new(&self.config.player)
            .args(player_args(&self.display, &self.socket_path))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let (raw_tx, raw_rx) = flume::unbounded();
        let ipc = match IpcChannel::connect(&self.socket_path, self.command_timeout(), raw_tx).await
        {
            Ok(ipc) => Arc::new(ipc),
            Err(e) => {
                let _ = child.start_kill();
                return Err(e);
            }
        };

        // Handshake: the controller is not "running" until the player
        // answers.
        if ipc.command(cmd::get_property("mpv-version")).await.is_err() {
            let _ = child.start_kill();
            return Err(MediaError::Handshake);
        }
        let _ = ipc.command(cmd::observe_property(1, "pause")).await;

        self.shared.quitting.store(false, Ordering::SeqCst);
        self.shared.running.store(true, Ordering::SeqCst);
        *self.shared.load.lock() = Load {
            id: 0,
            kind: LoadKind::None,
        };

        // End-of-file translation: only eof of a Song load becomes a
        // TrackEnded; stops and replacements never do.
        let shared = self.shared.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let mut last_paused: Option<bool> = None;
            while let Ok(msg) = raw_rx.recv_async().await {
                match msg.event.as_deref() {
                    Some("end-file") if msg.reason.as_deref() == Some("eof") => {
                        let load = {
                            let mut load = shared.load.lock();
                            let snapshot = *load;
                            if snapshot.kind == LoadKind::Song {
                                load.kind = LoadKind::None;
                            }
                            snapshot
                        };
                        if load.kind == LoadKind::Song {
                            let _ = events.send(MediaEvent::TrackEnded { load_id: load.id });
                        }
                    }
                    Some("property-change") if msg.name.as_deref() == Some("pause") => {
                        let Some(paused) = msg.data.as_ref().and_then(|d| d.as_bool()) else {
                            continue;
                        };
                        // Coalesce repeats; only edges go upward.
                        if last_paused != Some(paused) {
                            last_paused = Some(paused);
                            let _ = events.send(MediaEvent::StateChanged { paused });
                        }
                    }
                    _ => {}
                }
            }
        });

        let (kill_tx, kill_rx) = flume::bounded::<()>(1);
        let (exit_tx, exit_rx) = watch::channel(false);
        let shared = self.shared.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let reaped = tokio::select! {
                status = child.wait() => status.is_ok(),
                _ = kill_rx.recv_async() => false,
            };
            if !reaped {
                let _ = child.start_kill();
                let _ = child.wait().await;
            }
            shared.running.store(false, Ordering::SeqCst);
            let _ = exit_tx.send(true);
            if !shared.quitting.load(Ordering::SeqCst) {
                warn!("player subprocess exited unexpectedly");
                let _ = events.send(MediaEvent::PlayerExited);
            }
        });

        inner.ipc = Some(ipc);
        inner.kill_tx = Some(kill_tx);
        inner.exited = Some(exit_rx);
        inner.af = AfState::default();
        inner.stems = None;
        inner.bgm_image = None;
        inner.volume = 100;

        info!(player = %self.config.player, socket = %self.socket_path, "player started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        if !self.shared.running.load(Ordering::SeqCst) {
            inner.ipc = None;
            inner.kill_tx = None;
            inner.exited = None;
            return Ok(());
        }

        self.shared.quitting.store(true, Ordering::SeqCst);
        if let Some(ipc) = &inner.ipc {
            ipc.send_only(cmd::quit()).await;
        }

        if let Some(mut exited) = inner.exited.take() {
            if !Self::await_exit(&mut exited, QUIT_GRACE).await {
                debug!("player did not quit in time, killing");
                if let Some(kill) = &inner.kill_tx {
                    let _ = kill.send(());
                }
                Self::await_exit(&mut exited, KILL_GRACE).await;
            }
        }

        inner.ipc = None;
        inner.kill_tx = None;
        inner.exited = None;
        self.disarm_load();
        let _ = std::fs::remove_file(&self.socket_path);
        info!("player stopped");
        Ok(())
    }

    async fn restart(&self) -> Result<(), MediaError> {
        self.stop().await?;
        self.start().await
    }

    fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    async fn load_file(&self, path: &str) -> Result<u64, MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        let id = self.arm_load(LoadKind::Song);
        inner.stems = None;
        inner.af = AfState::default();
        if let Err(e) = ipc.command(cmd::load_file(path)).await {
            self.disarm_load();
            return Err(e);
        }
        self.apply_af(inner.af, &ipc).await?;
        Ok(id)
    }

    async fn load_image(&self, path: &str) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        self.arm_load(LoadKind::Image);
        inner.stems = None;
        if let Err(e) = ipc.command(cmd::load_file(path)).await {
            self.disarm_load();
            return Err(e);
        }
        Ok(())
    }

    async fn load_cdg(&self, graphics: &str, audio: &str) -> Result<u64, MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        let id = self.arm_load(LoadKind::Song);
        inner.stems = None;
        inner.af = AfState::default();
        let options = format!("audio-file={}", audio);
        if let Err(e) = ipc.command(cmd::load_file_with(graphics, &options)).await {
            self.disarm_load();
            return Err(e);
        }
        self.apply_af(inner.af, &ipc).await?;
        Ok(id)
    }

    async fn set_vocal_mix(&self, instr: &str, vocal: &str, gain: f64) -> Result<u64, MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;

        let same_pair = inner
            .stems
            .as_ref()
            .is_some_and(|(i, v)| i == instr && v == vocal);
        if same_pair && self.shared.load.lock().kind == LoadKind::Song {
            // Live gain change: filter update only, no reload, no seek.
            inner.af.mix_gain = Some(gain);
            self.apply_af(inner.af, &ipc).await?;
            return Ok(self.shared.load.lock().id);
        }

        let id = self.arm_load(LoadKind::Song);
        let options = format!("audio-file={}", vocal);
        if let Err(e) = ipc.command(cmd::load_file_with(instr, &options)).await {
            self.disarm_load();
            inner.stems = None;
            return Err(e);
        }
        inner.stems = Some((instr.to_string(), vocal.to_string()));
        inner.af = AfState {
            mix_gain: Some(gain),
            pitch_semitones: 0,
        };
        self.apply_af(inner.af, &ipc).await?;
        Ok(id)
    }

    async fn set_pitch(&self, semitones: i8) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        inner.af.pitch_semitones = clamp_semitones(i32::from(semitones));
        self.apply_af(inner.af, &ipc).await
    }

    async fn set_tempo(&self, factor: f64) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        ipc.command(cmd::set_property("speed", json!(clamp_tempo(factor))))
            .await?;
        Ok(())
    }

    async fn set_volume(&self, percent: u8) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        // A manual volume change supersedes any ramp in flight.
        fade::claim(&self.fade_gen);
        inner.volume = percent.min(100);
        ipc.command(cmd::set_property("volume", json!(inner.volume)))
            .await?;
        Ok(())
    }

    async fn pause(&self) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        ipc.command(cmd::set_property("pause", json!(true))).await?;
        Ok(())
    }

    async fn resume(&self) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        ipc.command(cmd::set_property("pause", json!(false)))
            .await?;
        Ok(())
    }

    async fn seek(&self, seconds: f64) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        ipc.command(cmd::seek_absolute(seconds.max(0.0))).await?;
        Ok(())
    }

    async fn load_bgm_over_image(
        &self,
        image: &str,
        url: &str,
        target_volume: u8,
        fade_in: Duration,
    ) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        self.arm_load(LoadKind::Bgm);
        inner.stems = None;
        inner.af = AfState::default();
        self.apply_af(inner.af, &ipc).await?;

        if let Err(e) = ipc.command(cmd::load_file(url)).await {
            self.disarm_load();
            return Err(e);
        }
        // The stream is the playlist entry; the holding image rides along
        // as an external video track so it can be swapped without touching
        // the audio.
        ipc.command(cmd::video_add(image)).await?;
        ipc.command(cmd::set_property("volume", json!(0))).await?;
        inner.bgm_image = Some(image.to_string());

        let token = fade::claim(&self.fade_gen);
        let generation = self.fade_gen.clone();
        let ipc_fade = ipc.clone();
        let target = f64::from(target_volume.min(100));
        tokio::spawn(async move {
            fade::run(&ipc_fade, &generation, token, 0.0, target, fade_in).await;
        });
        Ok(())
    }

    async fn update_bgm_image(&self, image: &str) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        if self.shared.load.lock().kind != LoadKind::Bgm {
            return Err(MediaError::Rejected("bgm is not active".into()));
        }
        ipc.command(cmd::video_remove()).await?;
        ipc.command(cmd::video_add(image)).await?;
        inner.bgm_image = Some(image.to_string());
        Ok(())
    }

    async fn stop_bgm(&self, fade_out: Duration) -> Result<(), MediaError> {
        let mut inner = self.inner.lock().await;
        let Ok(ipc) = self.ipc_of(&inner) else {
            return Ok(());
        };

        let token = fade::claim(&self.fade_gen);
        let image = inner.bgm_image.take();
        let restore_volume = inner.volume;

        if fade_out.is_zero() {
            // No ramp: tear the stream down before returning, so a load
            // issued right after cannot race the cleanup.
            self.disarm_load();
            let _ = ipc.command(cmd::stop()).await;
            let _ = ipc
                .command(cmd::set_property("volume", json!(restore_volume)))
                .await;
            return Ok(());
        }

        // The ramp must not block further commands; it runs detached and
        // bows out if a newer fade or volume change claims the token, or
        // if something else has taken the screen meanwhile.
        let generation = self.fade_gen.clone();
        let shared = self.shared.clone();
        tokio::spawn(async move {
            let from = ipc
                .command(cmd::get_property("volume"))
                .await
                .ok()
                .and_then(|m| m.data.and_then(|d| d.as_f64()))
                .unwrap_or(100.0);
            fade::run(&ipc, &generation, token, from, 0.0, fade_out).await;
            if generation.load(Ordering::SeqCst) != token {
                return;
            }
            if shared.load.lock().kind != LoadKind::Bgm {
                return;
            }
            let _ = ipc.command(cmd::stop()).await;
            {
                let mut load = shared.load.lock();
                load.kind = LoadKind::None;
            }
            if let Some(image) = image {
                {
                    let mut load = shared.load.lock();
                    load.id += 1;
                    load.kind = LoadKind::Image;
                }
                let _ = ipc.command(cmd::load_file(&image)).await;
            }
            let _ = ipc
                .command(cmd::set_property("volume", json!(restore_volume)))
                .await;
        });
        Ok(())
    }

    async fn stop_playback(&self) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        self.disarm_load();
        ipc.command(cmd::stop()).await?;
        Ok(())
    }

    async fn show_ticker(&self, entries: &[String]) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        let text = entries.join("   •   ");
        ipc.command(cmd::set_property("osd-msg1", json!(text)))
            .await?;
        Ok(())
    }

    async fn hide_ticker(&self) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        ipc.command(cmd::set_property("osd-msg1", json!("")))
            .await?;
        Ok(())
    }

    async fn show_overlay(&self, text: &str, duration_ms: u32) -> Result<(), MediaError> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner)?;
        ipc.command(cmd::show_text(text, duration_ms)).await?;
        Ok(())
    }

    async fn position_seconds(&self) -> Option<f64> {
        let inner = self.inner.lock().await;
        let ipc = self.ipc_of(&inner).ok()?;
        ipc.command(cmd::get_property("time-pos"))
            .await
            .ok()
            .and_then(|m| m.data.and_then(|d| d.as_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clamp_semitones_bounds() {
        assert_eq!(clamp_semitones(13), 12);
        assert_eq!(clamp_semitones(-13), -12);
        assert_eq!(clamp_semitones(5), 5);
        assert_eq!(clamp_semitones(0), 0);
    }

    #[test]
    fn test_clamp_tempo_bounds() {
        assert_eq!(clamp_tempo(2.5), 2.0);
        assert_eq!(clamp_tempo(0.1), 0.5);
        assert_eq!(clamp_tempo(1.25), 1.25);
        assert_eq!(clamp_tempo(f64::NAN), 1.0);
    }

    #[test]
    fn test_af_chain_empty_by_default() {
        assert_eq!(af_chain(AfState::default()), "");
    }

    #[test]
    fn test_af_chain_mix_only() {
        let chain = af_chain(AfState {
            mix_gain: Some(0.45),
            pitch_semitones: 0,
        });
        assert_eq!(
            chain,
            "lavfi=[amix=inputs=2:duration=first:weights='1 0.45']"
        );
    }

    #[test]
    fn test_af_chain_combines_mix_and_pitch() {
        let chain = af_chain(AfState {
            mix_gain: Some(0.15),
            pitch_semitones: 12,
        });
        let parts: Vec<&str> = chain.split(',').collect();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("weights='1 0.15'"));
        // +12 semitones is exactly one octave
        assert!(parts[1].starts_with("rubberband=pitch-scale=2.000000"));
    }

    #[test]
    fn test_af_chain_pitch_scale_is_equal_tempered() {
        let chain = af_chain(AfState {
            mix_gain: None,
            pitch_semitones: -12,
        });
        assert_eq!(chain, "rubberband=pitch-scale=0.500000");
    }

    #[test]
    fn test_player_args_display_targeting() {
        let display = DisplaySettings {
            target_display_name: Some("HDMI-1".to_string()),
            screen_index: Some(1),
            auto_fullscreen: true,
        };
        let args = player_args(&display, "/tmp/sock");
        assert!(args.contains(&"--screen=1".to_string()));
        assert!(args.contains(&"--screen-name=HDMI-1".to_string()));
        assert!(args.contains(&"--fullscreen".to_string()));
        assert!(args.contains(&"--input-ipc-server=/tmp/sock".to_string()));
    }

    #[test]
    fn test_player_args_windowed_without_fullscreen() {
        let display = DisplaySettings::default();
        let args = player_args(&display, "/tmp/sock");
        assert!(!args.iter().any(|a| a == "--fullscreen"));
        assert!(args.contains(&"--idle=yes".to_string()));
        assert!(args.contains(&"--image-display-duration=inf".to_string()));
    }
}
