use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ChapterRequest, PlanResult, Planner};

/// A scripted planner for tests. Returns pre-defined results in order.
pub struct MockPlanner {
    results: Mutex<Vec<Result<PlanResult>>>,
    index: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl MockPlanner {
    pub fn new(results: Vec<Result<PlanResult>>) -> Self {
        Self {
            results: Mutex::new(results.into_iter().rev().collect()),
            index: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: every call succeeds with the given content, in order.
    pub fn with_contents<I, S>(contents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            contents
                .into_iter()
                .map(|c| {
                    Ok(PlanResult {
                        content: c.into(),
                        usage: None,
                    })
                })
                .collect(),
        )
    }

    /// Number of times `plan` was called.
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    /// Chapter names in the order they were planned.
    pub fn chapters_seen(&self) -> Vec<String> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Planner for MockPlanner {
    async fn plan(&self, request: &ChapterRequest) -> Result<PlanResult> {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request.chapter_name.clone());
        }
        let next = self
            .results
            .lock()
            .map_err(|_| anyhow::anyhow!("MockPlanner: lock poisoned"))?
            .pop();
        next.unwrap_or_else(|| {
            Err(anyhow::anyhow!(
                "MockPlanner: no more results (called {} times)",
                i + 1
            ))
        })
    }
}
