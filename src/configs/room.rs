use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RoomConfig {
    /// Whether the queue auto-advances without admin action.
    pub autoplay_default: bool,
    /// Countdown length for admin-initiated `play_next`.
    pub admin_countdown_secs: u32,
    /// Countdown length after a song ends naturally.
    pub natural_countdown_secs: u32,
    /// Delay before the very first song of a session auto-starts, so the
    /// holding screen gets to show the "next up" card.
    pub initial_play_delay_secs: u64,
    /// Guard delay between successive load failures.
    pub load_retry_delay_ms: u64,
    /// Clients must send `handshake` within this window.
    pub handshake_timeout_secs: u64,
    /// Per-client outbound buffer depth; overflow drops the client.
    pub client_buffer: usize,
    pub overlay_duration_ms: u32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            autoplay_default: true,
            admin_countdown_secs: 10,
            natural_countdown_secs: 15,
            initial_play_delay_secs: 2,
            load_retry_delay_ms: 500,
            handshake_timeout_secs: 10,
            client_buffer: 64,
            overlay_duration_ms: 5000,
        }
    }
}
