pub mod illustrate;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::consts::{DEFAULT_MAX_RETRIES, DEFAULT_MIN_CHARS, DEFAULT_RETRY_DELAY};
use crate::planner::TokenUsage;

/// The outermost boundary. main.rs only knows this trait.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Illustrate the book at `input` and write the result to `output`.
    async fn run(&mut self, input: &Path, output: &Path) -> Result<RunReport>;
}

pub struct IllustrateConfig {
    /// Only look at the first N spine items. `None` or `Some(0)` means all.
    pub max_files: Option<usize>,
    /// Chapters shorter than this many characters are skipped.
    pub min_chars: usize,
    /// Attempts per chapter when the text model is overloaded.
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Show a spinner on stderr while waiting for a model.
    pub show_progress: bool,
}

impl Default for IllustrateConfig {
    fn default() -> Self {
        Self {
            max_files: None,
            min_chars: DEFAULT_MIN_CHARS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            show_progress: false,
        }
    }
}

/// What a run did, for the closing summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Spine items considered (after `max_files`).
    pub chapters: usize,
    /// Too short or unreadable.
    pub chapters_skipped: usize,
    /// The text model gave no usable answer.
    pub chapters_failed: usize,
    /// At least one image placed.
    pub chapters_illustrated: usize,
    /// Fresh images from the image model.
    pub images_generated: usize,
    /// Images served from the cache.
    pub images_cached: usize,
    /// Markers left in place because no image could be made.
    pub images_failed: usize,
    pub usage: TokenUsage,
}

impl RunReport {
    pub fn images_placed(&self) -> usize {
        self.images_generated + self.images_cached
    }
}
