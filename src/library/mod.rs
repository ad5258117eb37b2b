//! Query interface of the external library scanner. The scanner and its
//! on-disk index live outside this process; the room only ever searches
//! and resolves ids.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::types::{AnyResult, SongId};

/// One indexed song as the scanner reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub duration_seconds: u32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    pub media_path: String,
    /// Stem pair for live vocal mixing, when the library has one.
    #[serde(default)]
    pub vocal_track_path: Option<String>,
    #[serde(default)]
    pub instrumental_track_path: Option<String>,
    /// CDG graphics + audio pair.
    #[serde(default)]
    pub cdg_graphics_path: Option<String>,
    #[serde(default)]
    pub cdg_audio_path: Option<String>,
}

impl LibraryEntry {
    pub fn has_stems(&self) -> bool {
        self.vocal_track_path.is_some() && self.instrumental_track_path.is_some()
    }

    pub fn has_cdg(&self) -> bool {
        self.cdg_graphics_path.is_some() && self.cdg_audio_path.is_some()
    }
}

#[async_trait]
pub trait SongLibrary: Send + Sync {
    async fn search(&self, query: &str) -> AnyResult<Vec<LibraryEntry>>;
    async fn get(&self, id: &SongId) -> AnyResult<Option<LibraryEntry>>;
}

/// In-memory library. Backs tests and deployments where the scanner has
/// not produced an index yet.
#[derive(Default)]
pub struct MemoryLibrary {
    entries: Vec<LibraryEntry>,
}

impl MemoryLibrary {
    pub fn new(entries: Vec<LibraryEntry>) -> Self {
        Self { entries }
    }

    /// Loads the index the external scanner writes: a JSON array of
    /// entries. A missing file is an empty library, not an error.
    pub fn from_index_file(path: &std::path::Path) -> AnyResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(Self {
                entries: serde_json::from_str(&json)?,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SongLibrary for MemoryLibrary {
    async fn search(&self, query: &str) -> AnyResult<Vec<LibraryEntry>> {
        let q = query.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&q) || e.artist.to_lowercase().contains(&q)
            })
            .cloned()
            .collect())
    }

    async fn get(&self, id: &SongId) -> AnyResult<Option<LibraryEntry>> {
        Ok(self.entries.iter().find(|e| &e.id == id).cloned())
    }
}

#[cfg(test)]
pub fn test_entry(id: &str) -> LibraryEntry {
    LibraryEntry {
        id: id.into(),
        title: format!("Song {}", id),
        artist: "Test Artist".to_string(),
        duration_seconds: 180,
        thumbnail_url: None,
        media_path: format!("/media/{}.mp4", id),
        vocal_track_path: None,
        instrumental_track_path: None,
        cdg_graphics_path: None,
        cdg_audio_path: None,
    }
}
