// Local persistence: SQLite-backed key/value store and the saved-team vault.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::squad::roster::RosterState;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("no platform data directory available")]
    NoDataDir,

    #[error("failed to create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("failed to encode value for key `{key}`: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("stored value for key `{key}` is corrupt: {detail}")]
    Corrupt { key: String, detail: String },
}

// ---------------------------------------------------------------------------
// Key/value boundary
// ---------------------------------------------------------------------------

/// Async key/value persistence boundary. Values are JSON documents; a
/// missing key is `Ok(None)` while a present-but-undecodable value is
/// `StorageError::Corrupt`, so callers can tell "never saved" from
/// "saved and damaged".
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;
    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path` and prepare the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StorageError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA busy_timeout=5000;
             CREATE TABLE IF NOT EXISTS store (
                 key   TEXT PRIMARY KEY,
                 value TEXT NOT NULL
             );",
        )
        .map_err(|e| StorageError::Open {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(path = %path.display(), "store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(":memory:")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("store mutex poisoned")
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let raw: Option<String> = self
            .conn()
            .query_row("SELECT value FROM store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;

        match raw {
            Some(text) => {
                let value = serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    detail: e.to_string(),
                })?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        let text = serde_json::to_string(value).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            source: e,
        })?;
        self.conn().execute(
            "INSERT OR REPLACE INTO store (key, value) VALUES (?1, ?2)",
            params![key, text],
        )?;
        debug!(key, "store write");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.conn()
            .execute("DELETE FROM store WHERE key = ?1", [key])?;
        debug!(key, "store delete");
        Ok(())
    }
}

/// Where the SQLite file lives: an explicit configured path wins, otherwise
/// the platform data directory for this application. Parent directories are
/// created so a first run works on a clean machine.
pub fn resolve_db_path(configured: Option<&Path>) -> Result<PathBuf, StorageError> {
    if let Some(path) = configured {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::CreateDir {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }
        return Ok(path.to_path_buf());
    }

    let dirs =
        directories::ProjectDirs::from("", "", "teamsheet").ok_or(StorageError::NoDataDir)?;
    let data_dir = dirs.data_dir();
    std::fs::create_dir_all(data_dir).map_err(|e| StorageError::CreateDir {
        path: data_dir.to_path_buf(),
        source: e,
    })?;
    Ok(data_dir.join("teamsheet.db"))
}

// ---------------------------------------------------------------------------
// Team vault
// ---------------------------------------------------------------------------

/// Saved-team storage on top of any [`KeyValueStore`], one entry per user
/// and match.
pub struct TeamVault<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: KeyValueStore + ?Sized> TeamVault<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Storage key for one user's team in one match.
    fn key(user: &str, match_id: &str) -> String {
        format!("team:{user}:{match_id}")
    }

    pub async fn load(
        &self,
        user: &str,
        match_id: &str,
    ) -> Result<Option<RosterState>, StorageError> {
        let key = Self::key(user, match_id);
        let Some(value) = self.store.get(&key).await? else {
            return Ok(None);
        };

        let roster: RosterState =
            serde_json::from_value(value).map_err(|e| StorageError::Corrupt {
                key: key.clone(),
                detail: e.to_string(),
            })?;

        if let Some(id) = roster.duplicate_id() {
            return Err(StorageError::Corrupt {
                key,
                detail: format!("player {id} appears more than once"),
            });
        }

        Ok(Some(roster))
    }

    pub async fn save(
        &self,
        user: &str,
        match_id: &str,
        roster: &RosterState,
    ) -> Result<(), StorageError> {
        let key = Self::key(user, match_id);
        let value = serde_json::to_value(roster).map_err(|e| StorageError::Encode {
            key: key.clone(),
            source: e,
        })?;
        self.store.save(&key, &value).await
    }

    pub async fn remove(&self, user: &str, match_id: &str) -> Result<(), StorageError> {
        self.store.remove(&Self::key(user, match_id)).await
    }

    pub async fn exists(&self, user: &str, match_id: &str) -> Result<bool, StorageError> {
        Ok(self.store.get(&Self::key(user, match_id)).await?.is_some())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
