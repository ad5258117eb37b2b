//! The shared song queue: an ordered list with a monotonically advancing
//! play cursor. Entries before the cursor are history, the entry at the
//! cursor is current, everything after is upcoming. Only the room
//! coordinator mutates it; every mutation is persisted before observers
//! are notified.

pub mod song;

pub use song::Song;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::types::{SessionKey, SongId};

/// The persisted shape: entries, cursor, autoplay flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueState {
    pub songs: Vec<Song>,
    pub position: usize,
    pub autoplay: bool,
}

/// Durable sink for the queue journal.
pub trait QueuePersist: Send + Sync {
    fn save_queue(&self, state: &QueueState);
}

/// No-op persister for tests.
pub struct NullPersist;

impl QueuePersist for NullPersist {
    fn save_queue(&self, _state: &QueueState) {}
}

type ChangeCallback = Box<dyn Fn() + Send + Sync>;

pub struct QueueManager {
    state: QueueState,
    fair_rotation: bool,
    persist: std::sync::Arc<dyn QueuePersist>,
    on_change: Option<ChangeCallback>,
}

impl QueueManager {
    pub fn new(state: QueueState, persist: std::sync::Arc<dyn QueuePersist>) -> Self {
        debug_assert!(state.position <= state.songs.len());
        Self {
            state,
            fair_rotation: false,
            persist,
            on_change: None,
        }
    }

    /// Registers the single change callback, invoked after every mutation.
    pub fn set_on_change(&mut self, cb: ChangeCallback) {
        self.on_change = Some(cb);
    }

    pub fn set_fair_rotation(&mut self, enabled: bool) {
        self.fair_rotation = enabled;
    }

    pub fn fair_rotation(&self) -> bool {
        self.fair_rotation
    }

    fn changed(&self) {
        self.persist.save_queue(&self.state);
        if let Some(cb) = &self.on_change {
            cb();
        }
    }

    /// Appends a song, or interleaves it round-robin when fair rotation is
    /// on: the new entry lands at the earliest slot where no singer has
    /// their n-th song queued before every other active singer has their
    /// (n-1)-th.
    pub fn add(&mut self, song: Song) {
        let index = if self.fair_rotation {
            self.fair_slot(&song.added_by)
        } else {
            self.state.songs.len()
        };
        debug!(song = %song.id, index, "queue add");
        self.state.songs.insert(index, song);
        self.changed();
    }

    fn fair_slot(&self, singer: &SessionKey) -> usize {
        let pos = self.state.position;
        let upcoming = &self.state.songs[pos.min(self.state.songs.len())..];

        let new_round = upcoming.iter().filter(|s| &s.added_by == singer).count() + 1;

        let mut rounds: std::collections::HashMap<&SessionKey, usize> =
            std::collections::HashMap::new();
        for (offset, entry) in upcoming.iter().enumerate() {
            let round = rounds.entry(&entry.added_by).or_insert(0);
            *round += 1;
            if *round > new_round {
                return pos + offset;
            }
        }
        self.state.songs.len()
    }

    /// Removes the first entry with the given id. Returns whether the
    /// removed entry was current, and the entry itself. The cursor does
    /// not advance past removed entries.
    pub fn remove(&mut self, id: &SongId) -> (bool, Option<Song>) {
        let Some(index) = self.state.songs.iter().position(|s| &s.id == id) else {
            return (false, None);
        };
        let removed_current = index == self.state.position;
        let song = self.state.songs.remove(index);
        if index < self.state.position {
            self.state.position -= 1;
        }
        self.changed();
        (removed_current, Some(song))
    }

    /// Removes every entry added by the given key. History indices shrink
    /// the cursor so already-played entries stay history.
    pub fn remove_by_user(&mut self, key: &SessionKey) -> bool {
        let mut removed_current = false;
        let mut index = 0;
        let mut removed_any = false;
        while index < self.state.songs.len() {
            if &self.state.songs[index].added_by == key {
                if index == self.state.position {
                    removed_current = true;
                } else if index < self.state.position {
                    self.state.position -= 1;
                }
                self.state.songs.remove(index);
                removed_any = true;
            } else {
                index += 1;
            }
        }
        if removed_any {
            self.changed();
        }
        removed_current
    }

    /// Reorders upcoming entries only. Moves touching the cursor or
    /// history are rejected.
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        let len = self.state.songs.len();
        if from <= self.state.position || to <= self.state.position || from >= len || to >= len {
            return false;
        }
        let song = self.state.songs.remove(from);
        self.state.songs.insert(to, song);
        self.changed();
        true
    }

    /// Random permutation of the upcoming entries; current and history are
    /// untouched.
    pub fn shuffle(&mut self) {
        let start = (self.state.position + 1).min(self.state.songs.len());
        self.state.songs[start..].shuffle(&mut rand::thread_rng());
        self.changed();
    }

    pub fn clear(&mut self) {
        self.state.songs.clear();
        self.state.position = 0;
        self.changed();
    }

    /// Advances the cursor by one; the former current becomes history.
    /// Returns the new current song, if any.
    pub fn skip(&mut self) -> Option<Song> {
        if self.state.position < self.state.songs.len() {
            self.state.position += 1;
        }
        let current = self.current().cloned();
        self.changed();
        current
    }

    /// Like `skip`, but a no-op when nothing follows the current entry.
    pub fn next(&mut self) -> Option<Song> {
        if self.state.position + 1 >= self.state.songs.len() {
            return None;
        }
        self.skip()
    }

    pub fn current(&self) -> Option<&Song> {
        self.state.songs.get(self.state.position)
    }

    pub fn peek_after_current(&self) -> Option<&Song> {
        self.state.songs.get(self.state.position + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.state.songs.is_empty()
    }

    /// True when the cursor has run off the end.
    pub fn exhausted(&self) -> bool {
        self.state.position >= self.state.songs.len()
    }

    pub fn len(&self) -> usize {
        self.state.songs.len()
    }

    pub fn position(&self) -> usize {
        self.state.position
    }

    pub fn autoplay(&self) -> bool {
        self.state.autoplay
    }

    pub fn set_autoplay(&mut self, autoplay: bool) {
        self.state.autoplay = autoplay;
        self.changed();
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    /// Clones a historical entry back into the queue for the assigned
    /// singer. Placement goes through `add` so fair rotation still holds.
    pub fn requeue(&mut self, id: &SongId, assigned_key: SessionKey) -> bool {
        let Some(entry) = self.state.songs[..self.state.position]
            .iter()
            .find(|s| &s.id == id)
        else {
            warn!(song = %id, "requeue: not in history");
            return false;
        };
        let mut clone = entry.clone();
        clone.added_by = assigned_key;
        self.add(clone);
        true
    }

    /// Moves all of the user's upcoming entries to the end, preserving
    /// their relative order. Runs after fair-rotation placement and is the
    /// last word on ordering.
    pub fn bump_user_to_end(&mut self, key: &SessionKey) {
        let start = (self.state.position + 1).min(self.state.songs.len());
        let tail = self.state.songs.split_off(start);
        let (bumped, kept): (Vec<Song>, Vec<Song>) =
            tail.into_iter().partition(|s| &s.added_by == key);
        if bumped.is_empty() {
            self.state.songs.extend(kept);
            return;
        }
        self.state.songs.extend(kept);
        self.state.songs.extend(bumped);
        self.changed();
    }

    /// Vocal assist may change while the song is queued or playing.
    pub fn set_current_vocal_assist(&mut self, assist: crate::common::types::VocalAssist) -> bool {
        let position = self.state.position;
        match self.state.songs.get_mut(position) {
            Some(song) => {
                song.vocal_assist = assist;
                self.changed();
                true
            }
            None => false,
        }
    }

    pub fn set_current_key_change(&mut self, semitones: i8) -> bool {
        let position = self.state.position;
        match self.state.songs.get_mut(position) {
            Some(song) => {
                song.key_change_semitones = semitones;
                self.changed();
                true
            }
            None => false,
        }
    }

    pub fn set_current_tempo(&mut self, factor: f64) -> bool {
        let position = self.state.position;
        match self.state.songs.get_mut(position) {
            Some(song) => {
                song.tempo_factor = factor;
                self.changed();
                true
            }
            None => false,
        }
    }
}
