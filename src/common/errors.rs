use thiserror::Error;

use crate::common::types::SongId;

/// Errors surfaced to a single client as `error{message}` frames. None of
/// these mutate room state.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("your name is locked")]
    NameLocked,

    #[error("unknown song: {0}")]
    UnknownSong(SongId),

    #[error("song is not in the queue: {0}")]
    NotQueued(SongId),

    #[error("invalid queue move: {from} -> {to}")]
    InvalidMove { from: usize, to: usize },

    #[error("{0}")]
    Invalid(String),

    #[error("feature disabled: {0}")]
    FeatureDisabled(&'static str),
}

/// Media controller failures. A single load failure is transient (the
/// coordinator advances the queue); the rest indicate the subprocess or
/// its IPC channel is gone.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("player is not running")]
    NotRunning,

    #[error("failed to spawn player: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("ipc handshake with player failed")]
    Handshake,

    #[error("ipc command timed out")]
    Timeout,

    #[error("ipc channel closed")]
    ChannelClosed,

    #[error("player rejected command: {0}")]
    Rejected(String),
}

/// Durable store failures. These are fatal at startup and logged (the
/// operation rolled back) at runtime.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("cannot access data dir: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt persisted state: {0}")]
    Corrupt(#[from] serde_json::Error),
}
