//! Zip in, zip out.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the entry that must come first, stored uncompressed.
pub const MIMETYPE: &str = "mimetype";

/// Extract every entry of `epub` into `dest`. Returns the number of files written.
pub fn extract(epub: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(epub).with_context(|| format!("failed to open {}", epub.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a zip archive", epub.display()))?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping entry outside the archive root");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)
            .with_context(|| format!("failed to create {}", target.display()))?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    debug!(files = written, dest = %dest.display(), "extracted EPUB");
    Ok(written)
}

/// Zip the contents of `root` into an EPUB at `output`.
///
/// `mimetype` goes first and uncompressed; everything else is deflated in
/// sorted path order.
pub fn repack(root: &Path, output: &Path) -> Result<()> {
    let file =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut zip = ZipWriter::new(file);

    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mimetype = root.join(MIMETYPE);
    if mimetype.is_file() {
        zip.start_file(MIMETYPE, stored)?;
        zip.write_all(&fs::read(&mimetype)?)?;
    } else {
        warn!("book has no mimetype file; readers may reject the output");
    }

    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();

    for path in files {
        let name = entry_name(root, &path)?;
        if name == MIMETYPE {
            continue;
        }
        zip.start_file(name, deflated)?;
        zip.write_all(&fs::read(&path)?)?;
    }

    zip.finish().context("failed to finish EPUB archive")?;
    Ok(())
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Forward-slash path of `path` relative to `root`.
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .with_context(|| format!("{} is outside {}", path.display(), root.display()))?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
