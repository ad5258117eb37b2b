use serde::{Deserialize, Serialize};

/// Feature gates. All off by default except the singer overlay.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeatureFlags {
    pub pitch_control: bool,
    pub tempo_control: bool,
    pub fair_rotation: bool,
    pub scrolling_ticker: bool,
    pub singer_name_overlay: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            pitch_control: false,
            tempo_control: false,
            fair_rotation: false,
            scrolling_ticker: false,
            singer_name_overlay: true,
        }
    }
}
