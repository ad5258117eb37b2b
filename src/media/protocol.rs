//! Wire types for the player's JSON IPC: one JSON object per line, each
//! request correlated to its reply by `request_id`, events interleaved.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Serialize)]
pub struct IpcRequest {
    pub command: Vec<Value>,
    pub request_id: u64,
}

impl IpcRequest {
    pub fn new(command: Vec<Value>, request_id: u64) -> Self {
        Self {
            command,
            request_id,
        }
    }
}

/// Anything the player writes back: a reply (has `request_id`) or an
/// asynchronous event (has `event`).
#[derive(Debug, Clone, Deserialize)]
pub struct IpcMessage {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub request_id: Option<u64>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    /// Property name on `property-change` events.
    #[serde(default)]
    pub name: Option<String>,
}

impl IpcMessage {
    pub fn is_success(&self) -> bool {
        self.error.as_deref() == Some("success")
    }
}

/// Command constructors. Kept together so the whole external surface of
/// the player is visible in one place.
pub mod cmd {
    use super::*;

    pub fn load_file(path: &str) -> Vec<Value> {
        vec![json!("loadfile"), json!(path), json!("replace")]
    }

    /// `loadfile` with per-file options, e.g. an external audio track for
    /// CDG or stem playback.
    pub fn load_file_with(path: &str, options: &str) -> Vec<Value> {
        vec![
            json!("loadfile"),
            json!(path),
            json!("replace"),
            json!(options),
        ]
    }

    pub fn stop() -> Vec<Value> {
        vec![json!("stop")]
    }

    pub fn quit() -> Vec<Value> {
        vec![json!("quit")]
    }

    pub fn set_property(name: &str, value: Value) -> Vec<Value> {
        vec![json!("set_property"), json!(name), value]
    }

    pub fn get_property(name: &str) -> Vec<Value> {
        vec![json!("get_property"), json!(name)]
    }

    pub fn seek_absolute(seconds: f64) -> Vec<Value> {
        vec![json!("seek"), json!(seconds), json!("absolute")]
    }

    pub fn audio_add(url: &str) -> Vec<Value> {
        vec![json!("audio-add"), json!(url), json!("select")]
    }

    pub fn video_add(path: &str) -> Vec<Value> {
        vec![json!("video-add"), json!(path), json!("select")]
    }

    pub fn video_remove() -> Vec<Value> {
        vec![json!("video-remove")]
    }

    pub fn af_set(chain: &str) -> Vec<Value> {
        vec![json!("af"), json!("set"), json!(chain)]
    }

    pub fn observe_property(id: u64, name: &str) -> Vec<Value> {
        vec![json!("observe_property"), json!(id), json!(name)]
    }

    pub fn show_text(text: &str, duration_ms: u32) -> Vec<Value> {
        vec![json!("show-text"), json!(text), json!(duration_ms)]
    }
}
