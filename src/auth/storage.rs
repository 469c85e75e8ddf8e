use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::Connection;

use super::Provider;

/// Credential types stored per provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Credential {
    #[serde(rename = "api_key")]
    ApiKey { key: String },
}

/// Manages credential storage in SQLite.
///
/// Shares a database with the image cache and config; pass the same
/// path used for `SqliteCache`.
pub struct AuthStorage {
    conn: Mutex<Connection>,
}

impl AuthStorage {
    /// Open or create a credentials table in the given database path.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open auth database")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credentials (
                provider TEXT PRIMARY KEY,
                data     TEXT NOT NULL
            )",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get credential for a provider.
    pub fn get(&self, provider: Provider) -> Result<Option<Credential>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT data FROM credentials WHERE provider = ?1")?;
        let mut rows = stmt.query([provider.as_str()])?;
        match rows.next()? {
            Some(row) => {
                let json: String = row.get(0)?;
                let cred: Credential = serde_json::from_str(&json)?;
                Ok(Some(cred))
            }
            None => Ok(None),
        }
    }

    /// Store credential for a provider (upsert).
    pub fn set(&self, provider: Provider, credential: Credential) -> Result<()> {
        let json = serde_json::to_string(&credential)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO credentials (provider, data) VALUES (?1, ?2)
             ON CONFLICT(provider) DO UPDATE SET data = excluded.data",
            [provider.as_str(), &json],
        )?;
        Ok(())
    }

    /// Remove credential for a provider.
    pub fn remove(&self, provider: Provider) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM credentials WHERE provider = ?1",
            [provider.as_str()],
        )?;
        Ok(())
    }

    /// Get the API key for a provider.
    /// Priority: stored API key → environment variable.
    pub fn get_api_key(&self, provider: Provider) -> Result<Option<String>> {
        if let Some(Credential::ApiKey { key }) = self.get(provider)? {
            return Ok(Some(key));
        }

        if let Ok(key) = std::env::var(provider.env_var())
            && !key.is_empty()
        {
            return Ok(Some(key));
        }

        Ok(None)
    }

    /// Human-readable credential source, for the banner.
    pub fn status(&self, provider: Provider) -> Result<&'static str> {
        if self.get(provider)?.is_some() {
            return Ok("API key ✓");
        }
        let from_env = std::env::var(provider.env_var())
            .map(|k| !k.is_empty())
            .unwrap_or(false);
        Ok(if from_env {
            "API key (env) ✓"
        } else {
            "not authenticated"
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow::anyhow!("auth database lock poisoned"))
    }
}
