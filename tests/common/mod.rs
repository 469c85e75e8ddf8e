#![allow(dead_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CONTAINER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>
"#;

/// A chapter long enough to be worth illustrating.
pub fn long_chapter(title: &str) -> String {
    let body = "<p>The sea was calm and the ship drifted under a pale moon.</p>\n".repeat(10);
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\">\n<head><title>{title}</title></head>\n<body>\n<h1>{title}</h1>\n{body}</body>\n</html>\n"
    )
}

/// Package document listing `chapters` under `Text/`, with `extra_manifest`
/// spliced into the manifest and `spine` as the literal spine body.
pub fn package_opf(chapters: &[(&str, &str)], extra_manifest: &str, spine: &str) -> String {
    let mut manifest = String::new();
    for (i, (file, _)) in chapters.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"ch{i}\" href=\"Text/{file}\" media-type=\"application/xhtml+xml\"/>\n"
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="bookid">urn:uuid:6a1c9a8e-2f43-4a4f-9b7e-3c9d2b1f0e55</dc:identifier>
    <dc:title>Test Book</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
{manifest}{extra_manifest}  </manifest>
  <spine>
{spine}  </spine>
</package>
"#
    )
}

/// Spine body with one `itemref` per chapter, in order.
pub fn linear_spine(chapters: &[(&str, &str)]) -> String {
    (0..chapters.len())
        .map(|i| format!("    <itemref idref=\"ch{i}\"/>\n"))
        .collect()
}

/// Build a minimal EPUB at `dir/name` whose spine lists `chapters` (file
/// name, markup) under `OEBPS/Text/`.
pub fn build_epub(dir: &Path, name: &str, chapters: &[(&str, &str)]) -> PathBuf {
    let opf = package_opf(chapters, "", &linear_spine(chapters));
    build_epub_with_opf(dir, name, &opf, chapters)
}

/// Like [`build_epub`] but with a caller-supplied package document.
pub fn build_epub_with_opf(
    dir: &Path,
    name: &str,
    opf: &str,
    chapters: &[(&str, &str)],
) -> PathBuf {
    let path = dir.join(name);
    let mut zip = ZipWriter::new(File::create(&path).unwrap());
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();
    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(CONTAINER.as_bytes()).unwrap();
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();
    for (file, content) in chapters {
        zip.start_file(format!("OEBPS/Text/{file}"), deflated).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// A zip whose entries are written verbatim, names unchecked.
pub fn build_raw_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, deflated).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

pub fn read_entry(epub: &Path, name: &str) -> Option<Vec<u8>> {
    let mut archive = ZipArchive::new(File::open(epub).unwrap()).unwrap();
    let mut entry = archive.by_name(name).ok()?;
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    Some(bytes)
}

pub fn read_text(epub: &Path, name: &str) -> String {
    String::from_utf8(read_entry(epub, name).unwrap_or_else(|| panic!("missing {name}"))).unwrap()
}

pub fn entry_names(epub: &Path) -> Vec<String> {
    let mut archive = ZipArchive::new(File::open(epub).unwrap()).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}
