use anyhow::{Context, Result};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::{Engine, IllustrateConfig, RunReport};
use crate::cache::{ImageCache, cache_key};
use crate::consts::IMAGES_DIR;
use crate::epub::Book;
use crate::error::is_retryable;
use crate::markup::{extract_illustrations, image_tag, relative_dir, replace_marker};
use crate::painter::{Painter, Painting};
use crate::planner::{ChapterRequest, PlanResult, Planner};
use crate::spinner::Spinner;

/// Where an image came from.
enum Source {
    Cache,
    Painter,
}

/// The per-chapter loop. Wires together a Planner, a Painter, and an ImageCache.
pub struct IllustrateEngine {
    planner: Box<dyn Planner>,
    painter: Box<dyn Painter>,
    cache: Box<dyn ImageCache>,
    config: IllustrateConfig,
    /// Run-global image counter; names `illustration_{n}`.
    next_image: usize,
}

impl IllustrateEngine {
    pub fn new(
        planner: Box<dyn Planner>,
        painter: Box<dyn Painter>,
        cache: Box<dyn ImageCache>,
        config: IllustrateConfig,
    ) -> Self {
        Self {
            planner,
            painter,
            cache,
            config,
            next_image: 0,
        }
    }

    /// Ask the planner, retrying while the service reports it is overloaded.
    /// `None` means give up on this chapter.
    async fn plan_with_retry(&self, request: &ChapterRequest) -> Option<PlanResult> {
        let attempts = self.config.max_retries.max(1);
        for attempt in 1..=attempts {
            let spinner = self
                .config
                .show_progress
                .then(|| Spinner::start(&format!("planning {}", request.chapter_name)));
            let result = self.planner.plan(request).await;
            if let Some(spinner) = spinner {
                spinner.stop().await;
            }

            match result {
                Ok(plan) => return Some(plan),
                Err(e) if is_retryable(&e) && attempt < attempts => {
                    warn!(
                        chapter = %request.chapter_name,
                        attempt,
                        attempts,
                        delay_secs = self.config.retry_delay.as_secs(),
                        "text model overloaded, retrying: {e:#}"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => {
                    warn!(chapter = %request.chapter_name, "text model failed: {e:#}");
                    return None;
                }
            }
        }
        None
    }

    /// Cached bytes for `description`, or a fresh painting stored for next time.
    async fn obtain_image(&self, description: &str) -> Result<(Painting, Source)> {
        let key = cache_key(self.painter.model(), description);

        match self.cache.get(&key).await {
            Ok(Some(painting)) => return Ok((painting, Source::Cache)),
            Ok(None) => {}
            Err(e) => warn!("image cache read failed: {e:#}"),
        }

        let spinner = self
            .config
            .show_progress
            .then(|| Spinner::start("painting"));
        let result = self.painter.paint(description).await;
        if let Some(spinner) = spinner {
            spinner.stop().await;
        }
        let painting = result?;

        if let Err(e) = self.cache.put(&key, &painting).await {
            warn!("image cache write failed: {e:#}");
        }
        Ok((painting, Source::Painter))
    }

    /// Next `illustration_{n}` name that is neither a file in the images dir
    /// nor an id in the manifest.
    fn claim_name(&mut self, book: &Book, images_dir: &Path, ext: &str) -> (String, PathBuf) {
        loop {
            let n = self.next_image;
            self.next_image += 1;
            let stem = format!("illustration_{n}");
            let path = images_dir.join(format!("{stem}.{ext}"));
            if !path.exists() && !book.has_manifest_id(&stem) {
                return (stem, path);
            }
        }
    }

    /// Illustrate one spine item in place.
    async fn illustrate_chapter(
        &mut self,
        book: &mut Book,
        book_name: &str,
        chapter: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        let chapter_name = book.display_name(chapter);

        let bytes = match fs::read(chapter) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(chapter = %chapter_name, "cannot read spine item, skipping: {e}");
                report.chapters_skipped += 1;
                return Ok(());
            }
        };
        let content = String::from_utf8_lossy(&bytes).into_owned();

        let chars = content.chars().count();
        if chars < self.config.min_chars {
            info!(chapter = %chapter_name, chars, "skipping short chapter");
            report.chapters_skipped += 1;
            return Ok(());
        }

        info!(chapter = %chapter_name, "processing chapter");
        let request = ChapterRequest {
            book_name: book_name.to_string(),
            chapter_name: chapter_name.clone(),
            content,
        };

        let Some(plan) = self.plan_with_retry(&request).await else {
            report.chapters_failed += 1;
            return Ok(());
        };
        if let Some(usage) = plan.usage {
            report.usage.add(usage);
        }
        if plan.content.trim().is_empty() {
            warn!(chapter = %chapter_name, "text model returned no content, keeping original");
            return Ok(());
        }

        let markers = extract_illustrations(&plan.content);
        if markers.is_empty() {
            info!(chapter = %chapter_name, "no illustrations proposed");
            return Ok(());
        }

        let images_dir = book.images_dir();
        fs::create_dir_all(&images_dir).context("failed to create images directory")?;
        let img_rel = relative_dir(chapter, &images_dir);

        let mut illustrated = plan.content;
        let mut placed = 0;
        for marker in &markers {
            info!(chapter = %chapter_name, description = %marker.description, "illustrating");

            let (painting, source) = match self.obtain_image(&marker.description).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(description = %marker.description, "no image, leaving marker: {e:#}");
                    report.images_failed += 1;
                    continue;
                }
            };

            let ext = painting.format.extension();
            let media_type = painting.format.media_type();
            let (stem, path, href) = loop {
                let (stem, path) = self.claim_name(book, &images_dir, ext);
                let href = format!("{IMAGES_DIR}/{stem}.{ext}");
                if book.add_manifest_item(&stem, &href, media_type)? {
                    break (stem, path, href);
                }
                debug!(id = %stem, "manifest id taken, trying the next name");
            };
            fs::write(&path, &painting.data)
                .with_context(|| format!("failed to write {}", path.display()))?;

            let tag = image_tag(&format!("{img_rel}/{stem}.{ext}"), &marker.description);
            illustrated = replace_marker(&illustrated, marker, &tag);
            placed += 1;

            match source {
                Source::Cache => {
                    info!(file = %href, "reused cached illustration");
                    report.images_cached += 1;
                }
                Source::Painter => {
                    info!(file = %href, "generated illustration");
                    report.images_generated += 1;
                }
            }
        }

        fs::write(chapter, illustrated)
            .with_context(|| format!("failed to write {chapter_name}"))?;
        if placed > 0 {
            report.chapters_illustrated += 1;
        }
        info!(chapter = %chapter_name, images = placed, "updated chapter");
        Ok(())
    }
}

#[async_trait]
impl Engine for IllustrateEngine {
    async fn run(&mut self, input: &Path, output: &Path) -> Result<RunReport> {
        let book_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        info!(epub = %input.display(), "extracting EPUB");
        let mut book = Book::unpack(input)?;
        info!(items = book.spine().len(), "found spine items");

        let mut spine: Vec<PathBuf> = book.spine().to_vec();
        if let Some(max) = self.config.max_files.filter(|&m| m > 0) {
            spine.truncate(max);
            info!(max, "processing only the first files");
        }

        let mut report = RunReport {
            chapters: spine.len(),
            ..RunReport::default()
        };

        for chapter in &spine {
            self.illustrate_chapter(&mut book, &book_name, chapter, &mut report)
                .await?;
        }

        book.repack(output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        info!(output = %output.display(), "created illustrated EPUB");

        Ok(report)
    }
}
