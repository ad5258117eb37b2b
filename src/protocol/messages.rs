use serde::{Deserialize, Serialize};

use crate::common::types::{SessionKey, SongId, VocalAssist};
use crate::library::LibraryEntry;
use crate::protocol::snapshot::{ClientInfo, RoomSnapshot};
use crate::session::{AvatarConfig, Session};

/// Every frame a client may send. Exhaustive by construction: an unknown
/// `type` fails to parse and is answered with a single `error` frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientMessage {
    Handshake {
        #[serde(default)]
        session_key: Option<SessionKey>,
        #[serde(default)]
        display_name: Option<String>,
    },
    Search {
        query: String,
    },
    QueueAdd {
        song_id: SongId,
        #[serde(default)]
        vocal_assist: VocalAssist,
    },
    QueueRemove {
        song_id: SongId,
    },
    QueueMove {
        from: usize,
        to: usize,
    },
    QueueClear,
    QueueShuffle,
    QueueRequeue {
        song_id: SongId,
        assigned_key: SessionKey,
    },
    Play,
    Pause,
    Skip,
    Seek(f64),
    VocalAssist(VocalAssist),
    Volume(u8),
    KeyChange(i32),
    TempoChange(f64),
    SetDisplayName {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        avatar_id: Option<u64>,
        #[serde(default)]
        avatar_config: Option<AvatarConfig>,
    },
    SetAvatar(AvatarConfig),
    Autoplay(bool),
    SetAfk(bool),
    AddFavorite(SongId),
    RemoveFavorite(SongId),
    AdminSetAdmin {
        key: SessionKey,
        is_admin: bool,
    },
    AdminKick {
        key: SessionKey,
        #[serde(default)]
        reason: Option<String>,
    },
    AdminBlock {
        key: SessionKey,
        /// Seconds; absent means permanent.
        #[serde(default)]
        duration: Option<u64>,
        reason: String,
    },
    AdminUnblock {
        key: SessionKey,
    },
    AdminSetAfk {
        key: SessionKey,
        is_afk: bool,
    },
    AdminSetName {
        key: SessionKey,
        name: String,
    },
    AdminSetNameLock {
        key: SessionKey,
        locked: bool,
    },
    AdminPlayNext,
    AdminStartNow,
    AdminStop,
    AdminToggleBgm,
    AdminSetMessage {
        message: String,
    },
}

/// Every frame the server sends.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        session: Session,
        state: RoomSnapshot,
    },
    StateUpdate(RoomSnapshot),
    /// Admins only.
    ClientList {
        clients: Vec<ClientInfo>,
    },
    SearchResult {
        results: Vec<SongSummary>,
    },
    Error {
        message: String,
    },
    Kicked {
        reason: String,
    },
}

/// What a search hands back: enough to render a result card and enqueue.
#[derive(Debug, Clone, Serialize)]
pub struct SongSummary {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub duration_seconds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    pub has_stems: bool,
    pub has_cdg: bool,
}

impl From<&LibraryEntry> for SongSummary {
    fn from(entry: &LibraryEntry) -> Self {
        Self {
            id: entry.id.clone(),
            title: entry.title.clone(),
            artist: entry.artist.clone(),
            duration_seconds: entry.duration_seconds,
            thumbnail_url: entry.thumbnail_url.clone(),
            has_stems: entry.has_stems(),
            has_cdg: entry.has_cdg(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_parses_with_and_without_fields() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"handshake","payload":{"session_key":"abc","display_name":"Maria"}}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::Handshake {
                session_key,
                display_name,
            } => {
                assert_eq!(session_key.unwrap().0, "abc");
                assert_eq!(display_name.unwrap(), "Maria");
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"handshake","payload":{}}"#).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::Handshake {
                session_key: None,
                display_name: None
            }
        ));
    }

    #[test]
    fn test_null_payload_messages_parse() {
        for raw in [
            r#"{"type":"queue_clear","payload":null}"#,
            r#"{"type":"skip","payload":null}"#,
            r#"{"type":"admin_play_next","payload":null}"#,
            r#"{"type":"admin_toggle_bgm","payload":null}"#,
        ] {
            serde_json::from_str::<ClientMessage>(raw).unwrap();
        }
    }

    #[test]
    fn test_queue_add_defaults_vocal_assist_off() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"queue_add","payload":{"song_id":"abc"}}"#).unwrap();
        match msg {
            ClientMessage::QueueAdd {
                song_id,
                vocal_assist,
            } => {
                assert_eq!(song_id.0, "abc");
                assert_eq!(vocal_assist, VocalAssist::Off);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(
            serde_json::from_str::<ClientMessage>(r#"{"type":"warp_drive","payload":null}"#)
                .is_err()
        );
    }

    #[test]
    fn test_scalar_payloads() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"vocal_assist","payload":"HIGH"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::VocalAssist(VocalAssist::High)));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"key_change","payload":-3}"#).unwrap();
        assert!(matches!(msg, ClientMessage::KeyChange(-3)));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"tempo_change","payload":1.25}"#).unwrap();
        assert!(matches!(msg, ClientMessage::TempoChange(t) if (t - 1.25).abs() < 1e-9));
    }

    #[test]
    fn test_error_frame_shape() {
        let json = serde_json::to_value(ServerMessage::Error {
            message: "unauthorized".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["payload"]["message"], "unauthorized");
    }

    #[test]
    fn test_kicked_frame_shape() {
        let json = serde_json::to_value(ServerMessage::Kicked {
            reason: "connection lagged".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "kicked");
        assert_eq!(json["payload"]["reason"], "connection lagged");
    }
}
