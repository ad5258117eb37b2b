//! Durable identity store over sqlite. One writer at a time, write-through
//! on every mutation; online state is derived and lives beside the
//! connection rather than in it.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{error, info};

use crate::common::errors::StoreError;
use crate::common::types::{SessionKey, SongId, now_secs};
use crate::queue::{QueuePersist, QueueState};
use crate::session::{AvatarConfig, BlockRecord, DeviceInfo, Session, names};

const DB_VERSION: u32 = 1;

const KV_QUEUE: &str = "queue_state";
const KV_HOLDING_MESSAGE: &str = "holding_message";

pub struct SessionStore {
    conn: Arc<Mutex<Connection>>,
    online: Mutex<HashSet<SessionKey>>,
}

impl SessionStore {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let conn = Connection::open(dir.join("songmartyn.db"))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        let user_version: u32 =
            conn.query_row("SELECT user_version FROM pragma_user_version", [], |r| {
                r.get(0)
            })?;
        if DB_VERSION > user_version {
            conn.pragma_update(None, "user_version", DB_VERSION)?;
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions(
                key TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                name_locked INTEGER NOT NULL DEFAULT 0,
                is_admin INTEGER NOT NULL DEFAULT 0,
                is_afk INTEGER NOT NULL DEFAULT 0,
                avatar TEXT NOT NULL DEFAULT '{}',
                device_ip TEXT,
                device_agent TEXT,
                device_name TEXT,
                last_seen INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS favorites(
                session_key TEXT NOT NULL,
                song_id TEXT NOT NULL,
                PRIMARY KEY(session_key, song_id)
            );
            CREATE TABLE IF NOT EXISTS blocks(
                key TEXT PRIMARY KEY,
                reason TEXT NOT NULL,
                until INTEGER
            );
            CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            online: Mutex::new(HashSet::new()),
        })
    }

    /// Loads the session for `key`, or mints a fresh identity when the key
    /// is absent or unknown. The server never adopts a client-supplied key
    /// it has not issued.
    pub fn get_or_create(
        &self,
        key: Option<&SessionKey>,
        suggested_name: Option<&str>,
    ) -> Result<Session, StoreError> {
        if let Some(key) = key {
            if !key.is_empty() {
                if let Some(session) = self.get(key)? {
                    return Ok(session);
                }
            }
        }

        let key = SessionKey::generate();
        let display_name = match suggested_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => names::generate(),
        };
        let avatar = AvatarConfig::default();

        {
            let conn = self.conn.lock();
            conn.execute(
                "INSERT INTO sessions(key, display_name, avatar, last_seen) VALUES (?1, ?2, ?3, ?4)",
                params![
                    key.0,
                    display_name,
                    serde_json::to_string(&avatar)?,
                    now_secs()
                ],
            )?;
        }
        info!(key = %key, name = %display_name, "new session");

        self.get(&key)?.ok_or_else(|| {
            StoreError::Db(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    pub fn get(&self, key: &SessionKey) -> Result<Option<Session>, StoreError> {
        let conn = self.conn.lock();
        let session = conn
            .query_row(
                "SELECT key, display_name, name_locked, is_admin, is_afk, avatar,
                        device_ip, device_agent, device_name, last_seen
                 FROM sessions WHERE key = ?1",
                params![key.0],
                row_to_session,
            )
            .optional()?;

        let Some(mut session) = session else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT song_id FROM favorites WHERE session_key = ?1 ORDER BY song_id")?;
        session.favorites = stmt
            .query_map(params![key.0], |r| r.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .map(SongId::from)
            .collect();

        drop(stmt);
        drop(conn);
        session.is_online = self.online.lock().contains(key);
        Ok(Some(session))
    }

    /// A key is blocked iff a non-expired block row exists. Expired rows
    /// are dropped on the way through.
    pub fn is_blocked(&self, key: &SessionKey) -> Result<Option<String>, StoreError> {
        let conn = self.conn.lock();
        let row: Option<(String, Option<u64>)> = conn
            .query_row(
                "SELECT reason, until FROM blocks WHERE key = ?1",
                params![key.0],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;

        match row {
            Some((reason, until)) => {
                if until.is_some_and(|t| t <= now_secs()) {
                    conn.execute("DELETE FROM blocks WHERE key = ?1", params![key.0])?;
                    Ok(None)
                } else {
                    Ok(Some(reason))
                }
            }
            None => Ok(None),
        }
    }

    pub fn block(
        &self,
        key: &SessionKey,
        duration: Option<Duration>,
        reason: &str,
    ) -> Result<(), StoreError> {
        let until = duration.map(|d| now_secs() + d.as_secs());
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO blocks(key, reason, until) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET reason = ?2, until = ?3",
            params![key.0, reason, until],
        )?;
        Ok(())
    }

    pub fn unblock(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.conn
            .lock()
            .execute("DELETE FROM blocks WHERE key = ?1", params![key.0])?;
        Ok(())
    }

    pub fn list_blocks(&self) -> Result<Vec<BlockRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, reason, until FROM blocks")?;
        let blocks = stmt
            .query_map([], |r| {
                Ok(BlockRecord {
                    key: SessionKey(r.get(0)?),
                    reason: r.get(1)?,
                    until: r.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(blocks)
    }

    pub fn set_admin(&self, key: &SessionKey, is_admin: bool) -> Result<(), StoreError> {
        self.set_flag(key, "is_admin", is_admin)
    }

    pub fn set_afk(&self, key: &SessionKey, is_afk: bool) -> Result<(), StoreError> {
        self.set_flag(key, "is_afk", is_afk)
    }

    pub fn set_name_lock(&self, key: &SessionKey, locked: bool) -> Result<(), StoreError> {
        self.set_flag(key, "name_locked", locked)
    }

    fn set_flag(&self, key: &SessionKey, column: &str, value: bool) -> Result<(), StoreError> {
        self.conn.lock().execute(
            &format!("UPDATE sessions SET {} = ?1 WHERE key = ?2", column),
            params![value, key.0],
        )?;
        Ok(())
    }

    /// Mechanism only: name-lock enforcement is the coordinator's job.
    pub fn set_name(&self, key: &SessionKey, name: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "UPDATE sessions SET display_name = ?1 WHERE key = ?2",
            params![name, key.0],
        )?;
        Ok(())
    }

    pub fn update_avatar(&self, key: &SessionKey, avatar: &AvatarConfig) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "UPDATE sessions SET avatar = ?1 WHERE key = ?2",
            params![serde_json::to_string(avatar)?, key.0],
        )?;
        Ok(())
    }

    pub fn update_device_info(
        &self,
        key: &SessionKey,
        device: &DeviceInfo,
    ) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "UPDATE sessions SET device_ip = ?1, device_agent = ?2, device_name = ?3
             WHERE key = ?4",
            params![device.ip, device.user_agent, device.device_name, key.0],
        )?;
        Ok(())
    }

    pub fn touch(&self, key: &SessionKey) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "UPDATE sessions SET last_seen = ?1 WHERE key = ?2",
            params![now_secs(), key.0],
        )?;
        Ok(())
    }

    pub fn favorites_add(&self, key: &SessionKey, song: &SongId) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO favorites(session_key, song_id) VALUES (?1, ?2)",
            params![key.0, song.0],
        )?;
        Ok(())
    }

    pub fn favorites_remove(&self, key: &SessionKey, song: &SongId) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "DELETE FROM favorites WHERE session_key = ?1 AND song_id = ?2",
            params![key.0, song.0],
        )?;
        Ok(())
    }

    pub fn set_online(&self, key: &SessionKey, online: bool) {
        let mut set = self.online.lock();
        if online {
            set.insert(key.clone());
        } else {
            set.remove(key);
        }
    }

    pub fn list_active(&self) -> Result<Vec<Session>, StoreError> {
        let keys: Vec<SessionKey> = self.online.lock().iter().cloned().collect();
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(session) = self.get(&key)? {
                sessions.push(session);
            }
        }
        sessions.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(sessions)
    }

    pub fn list_all(&self) -> Result<Vec<Session>, StoreError> {
        let keys: Vec<SessionKey> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare("SELECT key FROM sessions ORDER BY display_name")?;
            stmt.query_map([], |r| r.get::<_, String>(0))?
                .filter_map(|r| r.ok())
                .map(SessionKey::from)
                .collect()
        };
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(session) = self.get(&key)? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    pub fn flush_sessions(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch("DELETE FROM sessions; DELETE FROM favorites;")?;
        Ok(())
    }

    pub fn flush_blocks(&self) -> Result<(), StoreError> {
        self.conn.lock().execute("DELETE FROM blocks", [])?;
        Ok(())
    }

    pub fn load_queue(&self) -> Result<Option<QueueState>, StoreError> {
        let value = self.kv_get(KV_QUEUE)?;
        match value {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn set_holding_message(&self, message: &str) -> Result<(), StoreError> {
        self.kv_set(KV_HOLDING_MESSAGE, message)
    }

    pub fn holding_message(&self) -> Result<Option<String>, StoreError> {
        self.kv_get(KV_HOLDING_MESSAGE)
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.lock().execute(
            "INSERT INTO kv(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    fn kv_get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }
}

impl QueuePersist for SessionStore {
    fn save_queue(&self, state: &QueueState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize queue state: {}", e);
                return;
            }
        };
        if let Err(e) = self.kv_set(KV_QUEUE, &json) {
            error!("failed to persist queue state: {}", e);
        }
    }
}

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let avatar_json: String = row.get(5)?;
    Ok(Session {
        key: SessionKey(row.get(0)?),
        display_name: row.get(1)?,
        name_locked: row.get(2)?,
        is_admin: row.get(3)?,
        is_afk: row.get(4)?,
        avatar: serde_json::from_str(&avatar_json).unwrap_or_default(),
        device: DeviceInfo {
            ip: row.get(6)?,
            user_agent: row.get(7)?,
            device_name: row.get(8)?,
        },
        favorites: Vec::new(),
        last_seen: row.get(9)?,
        is_online: false,
    })
}
