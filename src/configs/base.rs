use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::configs::*;

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub media: MediaConfig,
    pub bgm: BgmConfig,
    pub features: FeatureFlags,
    pub room: RoomConfig,
    pub search: SearchConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filters: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SearchConfig {
    /// Empty disables the external (YouTube) search path; local library
    /// search is always available.
    pub youtube_api_key: String,
}

impl Config {
    /// Reads `config.toml` if present, then applies environment overrides.
    /// Missing file means all defaults.
    pub fn load() -> Result<Self, crate::common::types::AnyError> {
        let mut config: Config = match std::fs::read_to_string("config.toml") {
            Ok(s) => toml::from_str(&s)?,
            Err(_) => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Environment knobs take precedence over config.toml.
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse::<u16>("HTTP_PORT") {
            self.server.http_port = v;
        }
        if let Some(v) = env_parse::<u16>("HTTPS_PORT") {
            self.server.https_port = Some(v);
        }
        if let Ok(v) = env::var("ADMIN_PIN") {
            self.server.admin_pin = v;
        }
        if let Ok(v) = env::var("DATA_DIR") {
            self.server.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("HOLDING_MESSAGE") {
            self.server.holding_message = v;
        }
        if let Ok(v) = env::var("YOUTUBE_API_KEY") {
            self.search.youtube_api_key = v;
        }
        if let Ok(v) = env::var("VIDEO_PLAYER") {
            self.media.player = v;
        }
        if let Ok(v) = env::var("TARGET_DISPLAY") {
            self.media.target_display = Some(v);
        }
        if let Some(v) = env_bool("AUTO_FULLSCREEN") {
            self.media.auto_fullscreen = v;
        }
        if let Some(v) = env_bool("BGM_ENABLED") {
            self.bgm.enabled = v;
        }
        if let Ok(v) = env::var("BGM_SOURCE") {
            match v.to_lowercase().as_str() {
                "youtube" => self.bgm.source = BgmSource::Youtube,
                "icecast" => self.bgm.source = BgmSource::Icecast,
                other => tracing::warn!("Unknown BGM_SOURCE {:?}, keeping default", other),
            }
        }
        if let Ok(v) = env::var("BGM_URL") {
            self.bgm.url = v;
        }
        if let Some(v) = env_parse::<u8>("BGM_VOLUME") {
            self.bgm.volume = v.min(100);
        }
        if let Some(v) = env_bool("PITCH_CONTROL_ENABLED") {
            self.features.pitch_control = v;
        }
        if let Some(v) = env_bool("TEMPO_CONTROL_ENABLED") {
            self.features.tempo_control = v;
        }
        if let Some(v) = env_bool("FAIR_ROTATION_ENABLED") {
            self.features.fair_rotation = v;
        }
        if let Some(v) = env_bool("SCROLLING_TICKER_ENABLED") {
            self.features.scrolling_ticker = v;
        }
        if let Some(v) = env_bool("SINGER_NAME_OVERLAY") {
            self.features.singer_name_overlay = v;
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.http_port, 8090);
        assert!(config.room.autoplay_default);
        assert!(!config.bgm.enabled);
    }

    #[test]
    fn test_sections_parse() {
        let config: Config = toml::from_str(
            r#"
            [server]
            http_port = 9000
            admin_pin = "1234"

            [bgm]
            enabled = true
            source = "icecast"
            url = "http://radio.local/stream"
            volume = 35

            [features]
            fair_rotation = true
            "#,
        )
        .unwrap();
        assert_eq!(config.server.http_port, 9000);
        assert_eq!(config.server.admin_pin, "1234");
        assert!(config.bgm.enabled);
        assert_eq!(config.bgm.source, BgmSource::Icecast);
        assert_eq!(config.bgm.volume, 35);
        assert!(config.features.fair_rotation);
        assert!(!config.features.pitch_control);
    }
}
