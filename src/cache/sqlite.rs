use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Mutex;

use super::ImageCache;
use crate::painter::{ImageFormat, Painting};

/// SQLite-backed image cache. One row per content key.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open image cache")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS images (
                key       TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL DEFAULT (datetime('now')),
                format    TEXT NOT NULL,
                data      BLOB NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("image cache lock poisoned"))
    }
}

#[async_trait]
impl ImageCache for SqliteCache {
    async fn get(&self, key: &str) -> Result<Option<Painting>> {
        let conn = self.lock()?;
        let row: Option<(String, Vec<u8>)> = conn
            .query_row(
                "SELECT format, data FROM images WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((format, data)) = row else {
            return Ok(None);
        };
        // Rows written by a newer build with a format we don't know are misses.
        Ok(ImageFormat::from_extension(&format).map(|format| Painting { data, format }))
    }

    async fn put(&self, key: &str, painting: &Painting) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO images (key, format, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
                format = excluded.format,
                data = excluded.data,
                timestamp = excluded.timestamp",
            params![key, painting.format.extension(), painting.data],
        )?;
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    async fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM images", [])?;
        Ok(())
    }
}
