pub mod storage;

pub use storage::AuthStorage;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use storage::Credential;

use crate::consts::{GOOGLE_API_KEY_ENV, STABILITY_API_KEY_ENV};
use crate::error::ApiError;

/// The two services a run talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Google AI Studio (Gemini text model).
    Google,
    /// Stability AI (image model).
    Stability,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Stability => "stability",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            Self::Google => GOOGLE_API_KEY_ENV,
            Self::Stability => STABILITY_API_KEY_ENV,
        }
    }

    /// Where a user creates a key for this provider.
    pub fn key_page(&self) -> &'static str {
        match self {
            Self::Google => "https://aistudio.google.com/apikey",
            Self::Stability => "https://platform.stability.ai/account/keys",
        }
    }
}

/// Resolve the key for `provider` or fail with a hint on how to provide one.
pub fn require_api_key(storage: &AuthStorage, provider: Provider) -> Result<String> {
    storage.get_api_key(provider)?.ok_or_else(|| {
        ApiError::MissingCredentials {
            provider: provider.as_str(),
            env_var: provider.env_var(),
        }
        .into()
    })
}

/// Save an API key for a provider.
///
/// This is the shared logic behind the `login` subcommand.
pub fn login(db_path: &str, provider: Provider, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        bail!("no API key provided");
    }
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .set(
            provider,
            Credential::ApiKey {
                key: key.to_string(),
            },
        )
        .context("failed to save credentials")?;
    Ok(())
}

/// Remove stored credentials for a provider.
pub fn logout(db_path: &str, provider: Provider) -> Result<()> {
    let storage = AuthStorage::open(db_path).context("failed to open auth storage")?;
    storage
        .remove(provider)
        .context("failed to remove credentials")?;
    Ok(())
}
