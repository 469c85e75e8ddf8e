//! Already-generated images, keyed by what was asked for.

pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::painter::Painting;

/// Content key for an illustration: the same description rendered by the
/// same image model is the same picture.
pub fn cache_key(image_model: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image_model.as_bytes());
    hasher.update(b"\n");
    hasher.update(description.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Where rendered images are kept between runs.
#[async_trait]
pub trait ImageCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Painting>>;
    async fn put(&self, key: &str, painting: &Painting) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    async fn clear(&self) -> Result<()>;
}

/// A cache that never remembers anything (`--no-cache`).
pub struct NoCache;

#[async_trait]
impl ImageCache for NoCache {
    async fn get(&self, _key: &str) -> Result<Option<Painting>> {
        Ok(None)
    }

    async fn put(&self, _key: &str, _painting: &Painting) -> Result<()> {
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(0)
    }

    async fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_hex_sha256() {
        let key = cache_key("core", "a lighthouse at dusk");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn key_is_stable() {
        assert_eq!(
            cache_key("core", "a lighthouse at dusk"),
            cache_key("core", "a lighthouse at dusk")
        );
    }

    #[test]
    fn key_ignores_surrounding_whitespace() {
        assert_eq!(
            cache_key("core", "  a lighthouse at dusk "),
            cache_key("core", "a lighthouse at dusk")
        );
    }

    #[test]
    fn key_depends_on_model() {
        assert_ne!(
            cache_key("core", "a lighthouse at dusk"),
            cache_key("ultra", "a lighthouse at dusk")
        );
    }

    #[tokio::test]
    async fn no_cache_never_hits() {
        let cache = NoCache;
        let painting = Painting::png(vec![1, 2, 3]);
        cache.put("k", &painting).await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
        assert_eq!(cache.len().await.unwrap(), 0);
    }
}
