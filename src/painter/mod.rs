pub mod mock;
pub mod stability;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Encodings an image service can hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::WebP => "webp",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }
}

/// A rendered illustration.
#[derive(Debug, Clone, PartialEq)]
pub struct Painting {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

impl Painting {
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            data,
            format: ImageFormat::Png,
        }
    }
}

/// Turns a one-sentence description into an image.
#[async_trait]
pub trait Painter: Send + Sync {
    /// Model identifier, part of the cache key.
    fn model(&self) -> &str;

    async fn paint(&self, prompt: &str) -> Result<Painting>;
}

#[async_trait]
impl<T: Painter + ?Sized> Painter for Arc<T> {
    fn model(&self) -> &str {
        (**self).model()
    }

    async fn paint(&self, prompt: &str) -> Result<Painting> {
        (**self).paint(prompt).await
    }
}
