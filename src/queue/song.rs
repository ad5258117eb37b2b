use serde::{Deserialize, Serialize};

use crate::common::types::{SessionKey, SongId, VocalAssist};
use crate::library::LibraryEntry;

/// One queue entry. Created at enqueue time from a library entry and
/// immutable afterwards except for vocal assist, key change, tempo, and
/// its place in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub duration_seconds: u32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub primary_media_path: String,
    #[serde(default)]
    pub vocal_track_path: Option<String>,
    #[serde(default)]
    pub instrumental_track_path: Option<String>,
    #[serde(default)]
    pub cdg_graphics_path: Option<String>,
    #[serde(default)]
    pub cdg_audio_path: Option<String>,
    pub vocal_assist: VocalAssist,
    pub added_by: SessionKey,
    /// -12..=12 semitones.
    #[serde(default)]
    pub key_change_semitones: i8,
    /// 0.5..=2.0.
    #[serde(default = "default_tempo")]
    pub tempo_factor: f64,
}

fn default_tempo() -> f64 {
    1.0
}

impl Song {
    pub fn from_entry(entry: LibraryEntry, added_by: SessionKey, assist: VocalAssist) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            artist: entry.artist,
            duration_seconds: entry.duration_seconds,
            thumbnail_url: entry.thumbnail_url,
            primary_media_path: entry.media_path,
            vocal_track_path: entry.vocal_track_path,
            instrumental_track_path: entry.instrumental_track_path,
            cdg_graphics_path: entry.cdg_graphics_path,
            cdg_audio_path: entry.cdg_audio_path,
            vocal_assist: assist,
            added_by,
            key_change_semitones: 0,
            tempo_factor: 1.0,
        }
    }

    pub fn stems(&self) -> Option<(&str, &str)> {
        match (&self.instrumental_track_path, &self.vocal_track_path) {
            (Some(instr), Some(vocal)) => Some((instr, vocal)),
            _ => None,
        }
    }

    pub fn cdg(&self) -> Option<(&str, &str)> {
        match (&self.cdg_graphics_path, &self.cdg_audio_path) {
            (Some(graphics), Some(audio)) => Some((graphics, audio)),
            _ => None,
        }
    }
}
