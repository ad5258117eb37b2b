use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct MediaConfig {
    /// Path or name of the media-player binary.
    pub player: String,
    /// Name of the output the player window should land on.
    pub target_display: Option<String>,
    /// Zero-based screen index, when the display name is not known.
    pub screen_index: Option<u32>,
    pub auto_fullscreen: bool,
    /// Where the IPC socket is created. Defaults next to the data dir.
    pub ipc_socket: Option<String>,
    /// Per-command IPC timeout.
    pub command_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            player: "mpv".to_string(),
            target_display: None,
            screen_index: None,
            auto_fullscreen: true,
            ipc_socket: None,
            command_timeout_secs: 5,
        }
    }
}

impl MediaConfig {
    pub fn display_settings(&self) -> DisplaySettings {
        DisplaySettings {
            target_display_name: self.target_display.clone(),
            screen_index: self.screen_index,
            auto_fullscreen: self.auto_fullscreen,
        }
    }
}

/// Display targeting honored on the next player start/restart.
#[derive(Debug, Clone, Default)]
pub struct DisplaySettings {
    pub target_display_name: Option<String>,
    pub screen_index: Option<u32>,
    pub auto_fullscreen: bool,
}
