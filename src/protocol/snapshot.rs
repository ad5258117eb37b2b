use serde::{Deserialize, Serialize};

use crate::common::types::{SessionKey, SongId};
use crate::queue::QueueState;
use crate::session::AvatarConfig;

/// The complete room state pushed to every client after each mutation.
/// Receivers replace their local state wholesale; there are no deltas.
#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub player: PlayerView,
    pub queue: QueueState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<CountdownView>,
    pub active_sessions: Vec<SessionView>,
    pub bgm_active: bool,
    pub bgm_enabled: bool,
    pub idle: bool,
    /// Lets admins see an unexpectedly dead player subprocess.
    pub player_running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_message: Option<String>,
}

/// The playback phase as observers see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PlayerView {
    Idle,
    CountingDown {
        seconds_remaining: u32,
        requires_approval: bool,
        next_song_id: SongId,
        next_singer: SessionKey,
    },
    Playing {
        song_id: SongId,
        position_seconds: f64,
        paused: bool,
    },
    Bgm {
        source_url: String,
        volume: u8,
    },
}

/// Mirror of the coordinator's countdown value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountdownView {
    pub active: bool,
    pub seconds_remaining: u32,
    pub next_song_id: SongId,
    pub next_singer_key: SessionKey,
    pub requires_approval: bool,
}

/// Public slice of a session shown to the whole room.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub key: SessionKey,
    pub display_name: String,
    pub is_admin: bool,
    pub is_afk: bool,
    pub avatar: AvatarConfig,
}

impl From<&crate::session::Session> for SessionView {
    fn from(s: &crate::session::Session) -> Self {
        Self {
            key: s.key.clone(),
            display_name: s.display_name.clone(),
            is_admin: s.is_admin,
            is_afk: s.is_afk,
            avatar: s.avatar.clone(),
        }
    }
}

/// Connection-level details, admin eyes only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub key: SessionKey,
    pub display_name: String,
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub is_admin: bool,
    pub is_afk: bool,
}
