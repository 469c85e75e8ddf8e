//! An EPUB unpacked into a scratch directory.

pub mod archive;
pub mod package;

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use ::epub::doc::EpubDoc;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::consts::IMAGES_DIR;
use package::ManifestItem;

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// An unpacked book. The scratch directory is removed on drop.
pub struct Book {
    dir: TempDir,
    opf_path: PathBuf,
    spine: Vec<PathBuf>,
    /// Ids declared in the manifest, including ones added since unpacking.
    manifest_ids: HashSet<String>,
}

impl Book {
    /// Extract `epub` and read its reading order.
    pub fn unpack(epub: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("epub_extract_")
            .tempdir()
            .context("failed to create scratch directory")?;
        archive::extract(epub, dir.path())?;

        if !dir.path().join(CONTAINER_PATH).is_file() {
            bail!("{} has no {CONTAINER_PATH}", epub.display());
        }

        let mut doc = EpubDoc::new(epub)
            .with_context(|| format!("failed to read package of {}", epub.display()))?;
        let opf_path = normalize(&dir.path().join(&doc.root_file));
        let manifest_ids = doc.resources.keys().cloned().collect();

        let mut spine = Vec::new();
        if !doc.spine.is_empty() {
            let mut index = 0;
            loop {
                match doc.get_current_path() {
                    Some(path) => spine.push(normalize(&dir.path().join(path))),
                    None => warn!(index, "spine references an unknown manifest item"),
                }
                index += 1;
                if !doc.go_next() {
                    break;
                }
            }
        }

        debug!(opf = %opf_path.display(), items = spine.len(), "located package document");

        Ok(Self {
            dir,
            opf_path,
            spine,
            manifest_ids,
        })
    }

    /// Root of the unpacked book.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of the package document.
    pub fn opf_path(&self) -> &Path {
        &self.opf_path
    }

    /// Absolute paths of the spine items, in reading order.
    pub fn spine(&self) -> &[PathBuf] {
        &self.spine
    }

    /// Path of `file` relative to the book root, forward slashes.
    pub fn display_name(&self, file: &Path) -> String {
        let relative = file.strip_prefix(self.root()).unwrap_or(file);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Directory next to the package document that receives generated images.
    pub fn images_dir(&self) -> PathBuf {
        self.opf_path
            .parent()
            .unwrap_or(self.root())
            .join(IMAGES_DIR)
    }

    /// Whether the manifest already declares `id`.
    pub fn has_manifest_id(&self, id: &str) -> bool {
        self.manifest_ids.contains(id)
    }

    /// Register a resource in the manifest. `href` is relative to the
    /// package document. Returns `false` if the id was already there.
    pub fn add_manifest_item(&mut self, id: &str, href: &str, media_type: &str) -> Result<bool> {
        if self.has_manifest_id(id) {
            return Ok(false);
        }
        let opf = fs::read_to_string(&self.opf_path)?;
        let item = ManifestItem {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
        };
        let Some(updated) = package::insert_manifest_item(&opf, &item) else {
            bail!("package document has no closing manifest tag");
        };
        fs::write(&self.opf_path, updated).context("failed to update package document")?;
        self.manifest_ids.insert(item.id);
        Ok(true)
    }

    /// Zip the (possibly modified) book into `output`.
    pub fn repack(&self, output: &Path) -> Result<()> {
        archive::repack(self.root(), output)
    }
}

/// Resolve `.` and `..` lexically.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_parent_dirs() {
        assert_eq!(
            normalize(Path::new("/tmp/book/OEBPS/../Text/./ch1.xhtml")),
            PathBuf::from("/tmp/book/Text/ch1.xhtml")
        );
    }

    #[test]
    fn normalize_plain_path_unchanged() {
        assert_eq!(
            normalize(Path::new("/tmp/book/ch1.xhtml")),
            PathBuf::from("/tmp/book/ch1.xhtml")
        );
    }
}
