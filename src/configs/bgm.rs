use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct BgmConfig {
    pub enabled: bool,
    pub source: BgmSource,
    pub url: String,
    /// 0..100.
    pub volume: u8,
    pub fade_in_secs: f64,
    pub fade_out_secs: f64,
}

impl Default for BgmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: BgmSource::Icecast,
            url: String::new(),
            volume: 40,
            fade_in_secs: 2.0,
            fade_out_secs: 2.0,
        }
    }
}

impl BgmConfig {
    /// BGM can only run with a source URL to hand to the player.
    pub fn usable(&self) -> bool {
        self.enabled && !self.url.is_empty()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BgmSource {
    Youtube,
    Icecast,
}
