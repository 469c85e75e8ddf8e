use anyhow::{Result, bail};
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Painter, Painting};

/// A deterministic painter for tests. The "image" is the prompt's bytes.
pub struct MockPainter {
    model: String,
    fail_on: Vec<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockPainter {
    pub fn new() -> Self {
        Self {
            model: "mock".to_string(),
            fail_on: Vec::new(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fail every prompt containing `needle`.
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on.push(needle.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Default for MockPainter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Painter for MockPainter {
    fn model(&self) -> &str {
        &self.model
    }

    async fn paint(&self, prompt: &str) -> Result<Painting> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if self.fail_on.iter().any(|needle| prompt.contains(needle)) {
            bail!("MockPainter: refusing to paint {prompt:?}");
        }
        Ok(Painting::png(prompt.as_bytes().to_vec()))
    }
}
