//! Project-wide constants.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const HOMEPAGE: &str = env!("CARGO_PKG_HOMEPAGE");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Default Gemini model used to place illustration markers.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-pro-preview-05-06";

/// Default Stability stable-image service.
pub const DEFAULT_IMAGE_MODEL: &str = "core";

/// Chapters shorter than this (in characters) are left alone.
pub const DEFAULT_MIN_CHARS: usize = 400;

/// How many times an overloaded text model is retried per chapter.
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Pause between text model retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Directory, next to the package document, that receives generated images.
pub const IMAGES_DIR: &str = "Images";

/// Suffix appended to the input stem when no output path is given.
pub const OUTPUT_SUFFIX: &str = "_illustrated";

/// Environment variable holding the Google AI Studio key.
pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Environment variable holding the Stability AI key.
pub const STABILITY_API_KEY_ENV: &str = "STABILITY_API_KEY";

/// Default database path: `~/.epub-illustrator/illustrator.db`.
/// Single DB for image cache, credentials, and config.
pub fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".epub-illustrator").join("illustrator.db"))
}

/// `book.epub` → `book_illustrated.epub`, in the same directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "book".to_string());
    input.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.epub"))
}

/// Format a number with comma separators (e.g. 1,234,567).
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i).is_multiple_of(3) {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consts_are_non_empty() {
        assert!(!AUTHOR.is_empty());
        assert!(!HOMEPAGE.is_empty());
        assert!(!REPO.is_empty());
        assert!(!DEFAULT_TEXT_MODEL.is_empty());
        assert!(!DEFAULT_IMAGE_MODEL.is_empty());
    }

    #[test]
    fn consts_from_cargo_toml() {
        assert!(AUTHOR.contains("Assaf Sapir"));
        assert!(REPO.contains("epub-illustrator"));
    }

    #[test]
    fn output_path_appends_suffix() {
        let out = default_output_path(Path::new("/books/moby.epub"));
        assert_eq!(out, PathBuf::from("/books/moby_illustrated.epub"));
    }

    #[test]
    fn output_path_relative_input() {
        let out = default_output_path(Path::new("moby.epub"));
        assert_eq!(out, PathBuf::from("moby_illustrated.epub"));
    }

    #[test]
    fn format_number_zero() {
        assert_eq!(format_number(0), "0");
    }

    #[test]
    fn format_number_small() {
        assert_eq!(format_number(42), "42");
        assert_eq!(format_number(999), "999");
    }

    #[test]
    fn format_number_thousands() {
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(12_345), "12,345");
        assert_eq!(format_number(123_456), "123,456");
    }

    #[test]
    fn format_number_millions() {
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
