pub mod gemini;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One chapter handed to the text model.
#[derive(Debug, Clone)]
pub struct ChapterRequest {
    /// File name of the book, for context (`moby.epub`).
    pub book_name: String,
    /// Path of the chapter inside the book (`OEBPS/ch01.xhtml`).
    pub chapter_name: String,
    /// Chapter markup as read from disk.
    pub content: String,
}

/// Token usage from a single LLM call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Accumulate another usage into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    /// Total tokens (input + output).
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// What the planner produces for a chapter: the markup with
/// `<!-- illustration: ... -->` markers placed, plus optional token usage.
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Decides where a chapter gets pictures and what they show.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, request: &ChapterRequest) -> Result<PlanResult>;
}

#[async_trait]
impl<T: Planner + ?Sized> Planner for Arc<T> {
    async fn plan(&self, request: &ChapterRequest) -> Result<PlanResult> {
        (**self).plan(request).await
    }
}
