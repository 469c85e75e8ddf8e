//! Key-value configuration storage backed by SQLite.
//!
//! Shares a database with [`AuthStorage`](crate::auth::AuthStorage) and
//! [`SqliteCache`](crate::cache::sqlite::SqliteCache); pass the same
//! path to all three.

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use std::sync::Mutex;

/// Keys the `config` subcommand accepts.
pub const KNOWN_KEYS: &[&str] = &[TEXT_MODEL, IMAGE_MODEL];

/// Gemini model used to place illustration markers.
pub const TEXT_MODEL: &str = "text_model";

/// Stability service used to render illustrations.
pub const IMAGE_MODEL: &str = "image_model";

/// Persistent key-value configuration store.
pub struct Config {
    conn: Mutex<Connection>,
}

impl Config {
    /// Open or create the config table in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open config database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS config (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
        )
        .context("failed to create config table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get a config value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT value FROM config WHERE key = ?1")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    /// Set a config value (upsert). Unknown keys are rejected.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        if !KNOWN_KEYS.contains(&key) {
            bail!(
                "unknown config key: {key} (expected one of: {})",
                KNOWN_KEYS.join(", ")
            );
        }
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    /// Remove a config key.
    pub fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM config WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Flag value if given, else the stored value, else the default.
    pub fn resolve(&self, key: &str, flag: Option<String>, default: &str) -> Result<String> {
        if let Some(value) = flag {
            return Ok(value);
        }
        Ok(self.get(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("config database lock poisoned"))
    }
}
