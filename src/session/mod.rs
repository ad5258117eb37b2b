pub mod avatar;
pub mod names;
pub mod store;

pub use avatar::AvatarConfig;
pub use store::SessionStore;

use serde::{Deserialize, Serialize};

use crate::common::types::{SessionKey, SongId};

/// Persistent identity of a guest. Created lazily on first handshake and
/// kept forever (subject to admin flush). `is_online` is derived state and
/// never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub key: SessionKey,
    pub display_name: String,
    pub name_locked: bool,
    pub is_admin: bool,
    pub is_afk: bool,
    pub is_online: bool,
    pub avatar: AvatarConfig,
    pub device: DeviceInfo,
    pub favorites: Vec<SongId>,
    pub last_seen: u64,
}

/// Best-effort device info captured at connect time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
}

/// An active or expired block. Blocks are rows independent of sessions so
/// a key can be blocked before it ever connects.
#[derive(Debug, Clone, Serialize)]
pub struct BlockRecord {
    pub key: SessionKey,
    pub reason: String,
    /// Unix seconds; `None` is permanent.
    pub until: Option<u64>,
}
