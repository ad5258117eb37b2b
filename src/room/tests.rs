use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use crate::common::errors::MediaError;
use crate::common::types::{ClientId, SessionKey, VocalAssist};
use crate::configs::Config;
use crate::holding::StaticHoldingScreen;
use crate::hub::{ClientHandle, Hub, HubConfig};
use crate::library::{LibraryEntry, MemoryLibrary, test_entry};
use crate::media::{MediaBackend, MediaEvent};
use crate::protocol::PlayerView;
use crate::room::{Coordinator, Phase, RoomEvent};
use crate::session::SessionStore;

/// Media backend that records every call and can be told to fail loads.
struct RecordingBackend {
    calls: parking_lot::Mutex<Vec<String>>,
    failing_paths: parking_lot::Mutex<HashSet<String>>,
    running: AtomicBool,
    next_load: AtomicU64,
}

impl RecordingBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: parking_lot::Mutex::new(Vec::new()),
            failing_paths: parking_lot::Mutex::new(HashSet::new()),
            running: AtomicBool::new(true),
            next_load: AtomicU64::new(0),
        })
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn fail_path(&self, path: &str) {
        self.failing_paths.lock().insert(path.to_string());
    }

    fn next_id(&self) -> u64 {
        self.next_load.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn check(&self, path: &str) -> Result<(), MediaError> {
        if self.failing_paths.lock().contains(path) {
            Err(MediaError::Rejected("load failed".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MediaBackend for RecordingBackend {
    async fn start(&self) -> Result<(), MediaError> {
        self.running.store(true, Ordering::SeqCst);
        self.record("start".into());
        Ok(())
    }
    async fn stop(&self) -> Result<(), MediaError> {
        self.running.store(false, Ordering::SeqCst);
        self.record("stop".into());
        Ok(())
    }
    async fn restart(&self) -> Result<(), MediaError> {
        self.running.store(true, Ordering::SeqCst);
        self.record("restart".into());
        Ok(())
    }
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
    async fn load_file(&self, path: &str) -> Result<u64, MediaError> {
        self.check(path)?;
        self.record(format!("load_file:{}", path));
        Ok(self.next_id())
    }
    async fn load_image(&self, path: &str) -> Result<(), MediaError> {
        self.record(format!("load_image:{}", path));
        Ok(())
    }
    async fn load_cdg(&self, graphics: &str, audio: &str) -> Result<u64, MediaError> {
        self.check(graphics)?;
        self.record(format!("load_cdg:{}:{}", graphics, audio));
        Ok(self.next_id())
    }
    async fn set_vocal_mix(&self, instr: &str, vocal: &str, gain: f64) -> Result<u64, MediaError> {
        self.check(instr)?;
        self.record(format!("set_vocal_mix:{}:{}:{:.2}", instr, vocal, gain));
        Ok(self.next_id())
    }
    async fn set_pitch(&self, semitones: i8) -> Result<(), MediaError> {
        self.record(format!("set_pitch:{}", semitones));
        Ok(())
    }
    async fn set_tempo(&self, factor: f64) -> Result<(), MediaError> {
        self.record(format!("set_tempo:{:.2}", factor));
        Ok(())
    }
    async fn set_volume(&self, percent: u8) -> Result<(), MediaError> {
        self.record(format!("set_volume:{}", percent));
        Ok(())
    }
    async fn pause(&self) -> Result<(), MediaError> {
        self.record("pause".into());
        Ok(())
    }
    async fn resume(&self) -> Result<(), MediaError> {
        self.record("resume".into());
        Ok(())
    }
    async fn seek(&self, seconds: f64) -> Result<(), MediaError> {
        self.record(format!("seek:{:.1}", seconds));
        Ok(())
    }
    async fn load_bgm_over_image(
        &self,
        image: &str,
        url: &str,
        target_volume: u8,
        _fade_in: Duration,
    ) -> Result<(), MediaError> {
        self.record(format!("load_bgm:{}:{}:{}", image, url, target_volume));
        Ok(())
    }
    async fn update_bgm_image(&self, image: &str) -> Result<(), MediaError> {
        self.record(format!("update_bgm_image:{}", image));
        Ok(())
    }
    async fn stop_bgm(&self, fade_out: Duration) -> Result<(), MediaError> {
        self.record(format!("stop_bgm:{}", fade_out.as_secs()));
        Ok(())
    }
    async fn stop_playback(&self) -> Result<(), MediaError> {
        self.record("stop_playback".into());
        Ok(())
    }
    async fn show_ticker(&self, entries: &[String]) -> Result<(), MediaError> {
        self.record(format!("show_ticker:{}", entries.len()));
        Ok(())
    }
    async fn hide_ticker(&self) -> Result<(), MediaError> {
        self.record("hide_ticker".into());
        Ok(())
    }
    async fn show_overlay(&self, text: &str, _duration_ms: u32) -> Result<(), MediaError> {
        self.record(format!("show_overlay:{}", text));
        Ok(())
    }
    async fn position_seconds(&self) -> Option<f64> {
        Some(0.0)
    }
}

struct TestRoom {
    coordinator: Coordinator,
    media: Arc<RecordingBackend>,
    hub: Arc<Hub>,
    next_client: u64,
}

fn entry_with_stems(id: &str) -> LibraryEntry {
    LibraryEntry {
        instrumental_track_path: Some(format!("/media/{}.instr.ogg", id)),
        vocal_track_path: Some(format!("/media/{}.vocal.ogg", id)),
        ..test_entry(id)
    }
}

fn room_with(config: Config, entries: Vec<LibraryEntry>) -> TestRoom {
    let store = Arc::new(SessionStore::open_in_memory().unwrap());
    let media = RecordingBackend::new();
    let (events_tx, events_rx) = flume::unbounded();
    let hub = Hub::new(
        HubConfig {
            admin_pin: String::new(),
            handshake_timeout: Duration::from_secs(10),
            client_buffer: 64,
        },
        events_tx.clone(),
    );
    let coordinator = Coordinator::new(
        config,
        store,
        Arc::new(MemoryLibrary::new(entries)),
        media.clone(),
        Arc::new(StaticHoldingScreen::new("/tmp/holding.png".into())),
        hub.clone(),
        events_tx,
        events_rx,
    );
    TestRoom {
        coordinator,
        media,
        hub,
        next_client: 0,
    }
}

fn room(entries: Vec<LibraryEntry>) -> TestRoom {
    room_with(Config::default(), entries)
}

impl TestRoom {
    async fn connect(
        &mut self,
        session_key: Option<SessionKey>,
        admin: bool,
    ) -> (Arc<ClientHandle>, flume::Receiver<Arc<str>>) {
        self.next_client += 1;
        let (client, rx) = ClientHandle::new(
            ClientId(self.next_client),
            Some("127.0.0.1".into()),
            Some("test-agent".into()),
            admin,
            64,
        );
        self.hub.register(client.clone());
        self.coordinator
            .handle_event(RoomEvent::Connected {
                client: client.clone(),
                session_key,
                display_name: None,
            })
            .await;
        (client, rx)
    }

    async fn send(&mut self, client: &ClientHandle, msg: crate::protocol::ClientMessage) {
        self.coordinator
            .handle_event(RoomEvent::Message {
                client_id: client.id,
                msg,
            })
            .await;
    }

    async fn autostart_now(&mut self) {
        let generation = self.coordinator.state.timer_gen;
        self.coordinator
            .handle_event(RoomEvent::AutoStartDue { generation })
            .await;
    }

    async fn tick(&mut self) {
        let generation = self.coordinator.state.countdown_gen;
        self.coordinator
            .handle_event(RoomEvent::CountdownTick { generation })
            .await;
    }

    async fn end_current_track(&mut self) {
        let load_id = self.coordinator.state.current_load;
        self.coordinator
            .handle_event(RoomEvent::Media(MediaEvent::TrackEnded { load_id }))
            .await;
    }
}

fn frames(rx: &flume::Receiver<Arc<str>>) -> Vec<serde_json::Value> {
    let mut out = Vec::new();
    while let Ok(json) = rx.try_recv() {
        out.push(serde_json::from_str(&json).unwrap());
    }
    out
}

use crate::protocol::ClientMessage as Cm;

#[tokio::test]
async fn test_first_guest_queues_and_autoplay_starts() {
    let mut room = room(vec![test_entry("abc")]);
    let (client, rx) = room.connect(None, false).await;

    let received = frames(&rx);
    assert_eq!(received[0]["type"], "welcome");
    let session = &received[0]["payload"]["session"];
    assert_eq!(session["display_name"].as_str().unwrap().split(' ').count(), 2);
    assert_eq!(received[0]["payload"]["state"]["idle"], true);
    assert_eq!(
        received[0]["payload"]["state"]["queue"]["songs"]
            .as_array()
            .unwrap()
            .len(),
        0
    );

    room.send(
        &client,
        Cm::QueueAdd {
            song_id: "abc".into(),
            vocal_assist: VocalAssist::Med,
        },
    )
    .await;

    let snapshot = room.coordinator.compose_snapshot().await;
    assert_eq!(snapshot.queue.songs.len(), 1);
    assert_eq!(snapshot.queue.position, 0);
    assert!(snapshot.idle);
    assert_eq!(snapshot.queue.songs[0].added_by, client.session_key().unwrap());

    // Nobody has sung yet: the delayed auto-start plays immediately.
    room.autostart_now().await;
    let snapshot = room.coordinator.compose_snapshot().await;
    assert!(matches!(snapshot.player, PlayerView::Playing { .. }));
    assert!(
        room.media
            .calls()
            .contains(&"load_file:/media/abc.mp4".to_string())
    );
}

#[tokio::test]
async fn test_countdown_across_singers_gates_on_approval() {
    let mut room = room(vec![test_entry("song_a"), test_entry("song_b")]);
    let (alice, _rx_a) = room.connect(None, false).await;
    let (bob, _rx_b) = room.connect(None, false).await;
    let (admin, _rx_admin) = room.connect(None, true).await;

    room.send(&alice, Cm::QueueAdd { song_id: "song_a".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&bob, Cm::QueueAdd { song_id: "song_b".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;
    assert!(matches!(room.coordinator.state.phase, Phase::Playing { .. }));

    // song_a ends naturally; song_b belongs to a different singer.
    room.end_current_track().await;
    let snapshot = room.coordinator.compose_snapshot().await;
    let countdown = snapshot.countdown.expect("countdown should be active");
    assert!(countdown.active);
    assert_eq!(countdown.seconds_remaining, 15);
    assert!(countdown.requires_approval);
    assert_eq!(countdown.next_song_id.0, "song_b");
    assert_eq!(countdown.next_singer_key, bob.session_key().unwrap());

    // Run the countdown dry: it must hold at zero, not auto-start.
    for _ in 0..15 {
        room.tick().await;
    }
    let snapshot = room.coordinator.compose_snapshot().await;
    let countdown = snapshot.countdown.expect("countdown still waiting");
    assert_eq!(countdown.seconds_remaining, 0);
    assert!(!matches!(snapshot.player, PlayerView::Playing { .. }));

    // A stale tick after the ticker stopped must change nothing.
    room.tick().await;
    assert!(matches!(room.coordinator.state.phase, Phase::Countdown(_)));

    room.send(&admin, Cm::AdminStartNow).await;
    let snapshot = room.coordinator.compose_snapshot().await;
    match snapshot.player {
        PlayerView::Playing { song_id, .. } => assert_eq!(song_id.0, "song_b"),
        other => panic!("expected playing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_same_singer_autostarts_at_zero() {
    let mut room = room(vec![test_entry("one"), test_entry("two")]);
    let (alice, _rx) = room.connect(None, false).await;
    room.send(&alice, Cm::QueueAdd { song_id: "one".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&alice, Cm::QueueAdd { song_id: "two".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;
    room.end_current_track().await;

    let snapshot = room.coordinator.compose_snapshot().await;
    let countdown = snapshot.countdown.expect("countdown between songs");
    assert!(!countdown.requires_approval);

    for _ in 0..15 {
        room.tick().await;
    }
    let snapshot = room.coordinator.compose_snapshot().await;
    match snapshot.player {
        PlayerView::Playing { song_id, .. } => assert_eq!(song_id.0, "two"),
        other => panic!("expected playing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_block_kicks_removes_songs_and_bars_reconnect() {
    let mut room = room(vec![test_entry("s1"), test_entry("s2")]);
    let (admin, _rx_admin) = room.connect(None, true).await;
    let (guest, _rx_guest) = room.connect(None, false).await;
    let guest_key = guest.session_key().unwrap();

    room.send(&guest, Cm::QueueAdd { song_id: "s1".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;
    assert!(matches!(room.coordinator.state.phase, Phase::Playing { .. }));

    room.send(
        &admin,
        Cm::AdminBlock {
            key: guest_key.clone(),
            duration: Some(60),
            reason: "spam".into(),
        },
    )
    .await;

    // Songs gone, playback stopped, live connection kicked.
    let snapshot = room.coordinator.compose_snapshot().await;
    assert_eq!(snapshot.queue.songs.len(), 0);
    assert!(snapshot.idle);
    assert!(guest.is_kicked());
    assert_eq!(
        guest.kick_reason().as_deref(),
        Some("You have been blocked: spam")
    );
    assert!(room.media.calls().contains(&"stop_playback".to_string()));

    // Reconnect with the blocked key: kicked before any session mutation.
    let (retry, rx_retry) = room.connect(Some(guest_key), false).await;
    assert!(retry.is_kicked());
    assert!(retry.kick_reason().unwrap().contains("blocked"));
    assert!(frames(&rx_retry).is_empty(), "no welcome for blocked keys");
}

#[tokio::test]
async fn test_load_failure_advances_and_retries() {
    let mut room = room(vec![test_entry("broken"), test_entry("fine")]);
    room.media.fail_path("/media/broken.mp4");
    let (guest, _rx) = room.connect(None, false).await;

    room.send(&guest, Cm::QueueAdd { song_id: "broken".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&guest, Cm::QueueAdd { song_id: "fine".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    // The failed load advanced the cursor past "broken".
    assert_eq!(room.coordinator.queue.position(), 1);
    assert!(matches!(room.coordinator.state.phase, Phase::Idle));

    // Guard delay elapses; the retry plays the next song.
    let generation = room.coordinator.state.timer_gen;
    room.coordinator
        .handle_event(RoomEvent::RetryPlayback { generation })
        .await;
    let snapshot = room.coordinator.compose_snapshot().await;
    match snapshot.player {
        PlayerView::Playing { song_id, .. } => assert_eq!(song_id.0, "fine"),
        other => panic!("expected playing, got {:?}", other),
    }
    assert!(
        room.media
            .calls()
            .contains(&"load_file:/media/fine.mp4".to_string())
    );
}

#[tokio::test]
async fn test_bgm_toggle_round_trip() {
    let mut config = Config::default();
    config.bgm.enabled = true;
    config.bgm.url = "http://radio.local/stream".into();
    config.bgm.volume = 35;
    let mut room = room_with(config, vec![]);
    let (admin, _rx) = room.connect(None, true).await;

    room.send(&admin, Cm::AdminToggleBgm).await;
    let snapshot = room.coordinator.compose_snapshot().await;
    assert!(snapshot.bgm_active);
    assert!(snapshot.idle);
    assert!(matches!(snapshot.player, PlayerView::Bgm { .. }));
    assert!(
        room.media
            .calls()
            .iter()
            .any(|c| c.starts_with("load_bgm:") && c.ends_with(":http://radio.local/stream:35"))
    );

    room.send(&admin, Cm::AdminToggleBgm).await;
    let snapshot = room.coordinator.compose_snapshot().await;
    assert!(!snapshot.bgm_active);
    assert!(room.media.calls().contains(&"stop_bgm:2".to_string()));
}

#[tokio::test]
async fn test_afk_bumps_upcoming_songs() {
    let mut room = room(vec![test_entry("a1"), test_entry("a2"), test_entry("b1")]);
    let (alice, _rx_a) = room.connect(None, false).await;
    let (bob, _rx_b) = room.connect(None, false).await;

    room.send(&alice, Cm::QueueAdd { song_id: "a1".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&alice, Cm::QueueAdd { song_id: "a2".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&bob, Cm::QueueAdd { song_id: "b1".into(), vocal_assist: VocalAssist::Off }).await;

    room.send(&alice, Cm::SetAfk(true)).await;
    let ids: Vec<String> = room
        .coordinator
        .queue
        .state()
        .songs
        .iter()
        .map(|s| s.id.0.clone())
        .collect();
    // a1 is current and stays; a2 is demoted behind b1.
    assert_eq!(ids, vec!["a1", "b1", "a2"]);
}

#[tokio::test]
async fn test_non_admin_is_rejected_without_state_change() {
    let mut room = room(vec![test_entry("x")]);
    let (guest, rx) = room.connect(None, false).await;
    room.send(&guest, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    let before = room.coordinator.queue.state().songs.len();

    room.send(&guest, Cm::QueueClear).await;

    assert_eq!(room.coordinator.queue.state().songs.len(), before);
    let received = frames(&rx);
    let error = received
        .iter()
        .find(|f| f["type"] == "error")
        .expect("error frame");
    assert_eq!(error["payload"]["message"], "unauthorized");
}

#[tokio::test]
async fn test_queue_remove_owner_only() {
    let mut room = room(vec![test_entry("mine"), test_entry("theirs")]);
    let (alice, _rx_a) = room.connect(None, false).await;
    let (bob, rx_b) = room.connect(None, false).await;

    room.send(&alice, Cm::QueueAdd { song_id: "mine".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&alice, Cm::QueueAdd { song_id: "theirs".into(), vocal_assist: VocalAssist::Off }).await;

    room.send(&bob, Cm::QueueRemove { song_id: "theirs".into() }).await;
    assert_eq!(room.coordinator.queue.state().songs.len(), 2);
    assert!(frames(&rx_b).iter().any(|f| f["type"] == "error"));

    room.send(&alice, Cm::QueueRemove { song_id: "theirs".into() }).await;
    assert_eq!(room.coordinator.queue.state().songs.len(), 1);
}

#[tokio::test]
async fn test_queue_clear_goes_idle() {
    let mut room = room(vec![test_entry("x"), test_entry("y")]);
    let (admin, _rx) = room.connect(None, true).await;
    room.send(&admin, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&admin, Cm::QueueAdd { song_id: "y".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;
    assert!(matches!(room.coordinator.state.phase, Phase::Playing { .. }));

    room.send(&admin, Cm::QueueClear).await;
    let snapshot = room.coordinator.compose_snapshot().await;
    assert!(snapshot.idle);
    assert_eq!(snapshot.queue.songs.len(), 0);
    assert_eq!(snapshot.queue.position, 0);
    assert!(room.media.calls().contains(&"stop_playback".to_string()));
}

#[tokio::test]
async fn test_vocal_assist_change_keeps_position() {
    let mut room = room(vec![entry_with_stems("duet")]);
    let (alice, _rx) = room.connect(None, false).await;
    room.send(&alice, Cm::QueueAdd { song_id: "duet".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    assert!(
        room.media
            .calls()
            .contains(&"set_vocal_mix:/media/duet.instr.ogg:/media/duet.vocal.ogg:0.00".to_string())
    );

    room.send(&alice, Cm::VocalAssist(VocalAssist::Med)).await;
    assert!(
        room.media
            .calls()
            .contains(&"set_vocal_mix:/media/duet.instr.ogg:/media/duet.vocal.ogg:0.45".to_string())
    );
    // No reload happened: still Playing, song unchanged.
    assert!(matches!(room.coordinator.state.phase, Phase::Playing { .. }));
    assert_eq!(
        room.coordinator.queue.current().unwrap().vocal_assist,
        VocalAssist::Med
    );
}

#[tokio::test]
async fn test_pitch_and_tempo_gated_and_clamped() {
    let mut config = Config::default();
    config.features.pitch_control = true;
    config.features.tempo_control = true;
    let mut room = room_with(config, vec![test_entry("x")]);
    let (admin, _rx) = room.connect(None, true).await;
    room.send(&admin, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    room.send(&admin, Cm::KeyChange(13)).await;
    assert_eq!(room.coordinator.queue.current().unwrap().key_change_semitones, 12);
    assert!(room.media.calls().contains(&"set_pitch:12".to_string()));

    room.send(&admin, Cm::TempoChange(2.5)).await;
    assert_eq!(room.coordinator.queue.current().unwrap().tempo_factor, 2.0);
    assert!(room.media.calls().contains(&"set_tempo:2.00".to_string()));
}

#[tokio::test]
async fn test_pitch_rejected_when_feature_off() {
    let mut room = room(vec![test_entry("x")]);
    let (admin, rx) = room.connect(None, true).await;
    room.send(&admin, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&admin, Cm::KeyChange(2)).await;
    assert_eq!(room.coordinator.queue.current().unwrap().key_change_semitones, 0);
    assert!(
        frames(&rx)
            .iter()
            .any(|f| f["type"] == "error"
                && f["payload"]["message"].as_str().unwrap().contains("disabled"))
    );
}

#[tokio::test]
async fn test_player_exit_surfaces_to_snapshot() {
    let mut room = room(vec![test_entry("x")]);
    let (guest, _rx) = room.connect(None, false).await;
    room.send(&guest, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    room.media.running.store(false, Ordering::SeqCst);
    room.coordinator
        .handle_event(RoomEvent::Media(MediaEvent::PlayerExited))
        .await;

    let snapshot = room.coordinator.compose_snapshot().await;
    assert!(!snapshot.player_running);
    assert!(snapshot.idle);
}

#[tokio::test]
async fn test_stale_track_end_is_ignored() {
    let mut room = room(vec![test_entry("x"), test_entry("y")]);
    let (guest, _rx) = room.connect(None, false).await;
    room.send(&guest, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&guest, Cm::QueueAdd { song_id: "y".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    let stale = room.coordinator.state.current_load + 17;
    room.coordinator
        .handle_event(RoomEvent::Media(MediaEvent::TrackEnded { load_id: stale }))
        .await;

    // Still playing the first song; the queue did not advance.
    assert!(matches!(room.coordinator.state.phase, Phase::Playing { .. }));
    assert_eq!(room.coordinator.queue.position(), 0);
}

#[tokio::test]
async fn test_admin_stop_skips_current_and_goes_idle() {
    let mut room = room(vec![test_entry("x"), test_entry("y")]);
    let (admin, _rx) = room.connect(None, true).await;
    room.send(&admin, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&admin, Cm::QueueAdd { song_id: "y".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    room.send(&admin, Cm::AdminStop).await;
    let snapshot = room.coordinator.compose_snapshot().await;
    assert!(snapshot.idle);
    assert!(snapshot.countdown.is_none());
    // "x" moved to history.
    assert_eq!(room.coordinator.queue.position(), 1);
}

#[tokio::test]
async fn test_admin_play_next_uses_short_countdown() {
    let mut room = room(vec![test_entry("x")]);
    let (admin, _rx) = room.connect(None, true).await;
    room.send(&admin, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;

    room.send(&admin, Cm::AdminPlayNext).await;
    let snapshot = room.coordinator.compose_snapshot().await;
    let countdown = snapshot.countdown.expect("countdown");
    assert_eq!(countdown.seconds_remaining, 10);
    assert!(!countdown.requires_approval);

    for _ in 0..10 {
        room.tick().await;
    }
    assert!(matches!(room.coordinator.state.phase, Phase::Playing { .. }));
}

#[tokio::test]
async fn test_remove_current_while_playing_moves_on() {
    let mut room = room(vec![test_entry("x"), test_entry("y")]);
    let (alice, _rx_a) = room.connect(None, false).await;
    let (bob, _rx_b) = room.connect(None, false).await;
    room.send(&alice, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;
    room.send(&bob, Cm::QueueAdd { song_id: "y".into(), vocal_assist: VocalAssist::Off }).await;
    room.autostart_now().await;

    room.send(&alice, Cm::QueueRemove { song_id: "x".into() }).await;
    assert!(room.media.calls().contains(&"stop_playback".to_string()));
    // Bob's song is next and belongs to a different singer: approval gate.
    let snapshot = room.coordinator.compose_snapshot().await;
    let countdown = snapshot.countdown.expect("countdown toward bob's song");
    assert_eq!(countdown.next_song_id.0, "y");
    assert!(countdown.requires_approval);
}

#[tokio::test]
async fn test_welcome_precedes_broadcasts_for_that_client() {
    let mut room = room(vec![test_entry("x")]);
    let (first, _rx_first) = room.connect(None, false).await;
    room.send(&first, Cm::QueueAdd { song_id: "x".into(), vocal_assist: VocalAssist::Off }).await;

    let (_late, rx_late) = room.connect(None, false).await;
    let received = frames(&rx_late);
    assert_eq!(received[0]["type"], "welcome");
    // Everything after the welcome is a state update for this client.
    for frame in &received[1..] {
        assert_eq!(frame["type"], "state_update");
    }
}
