//! Text-level edits to the package document. Reading is left to the `epub`
//! crate; the document is never rebuilt, only spliced.

use std::sync::LazyLock;

use regex::Regex;

static MANIFEST_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</((?:[\w-]+:)?)manifest\s*>").expect("manifest close regex is valid")
});

/// One `<item>` of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,
    pub href: String,
    pub media_type: String,
}

/// Add an `<item>` before the closing manifest tag, reusing its namespace
/// prefix. Returns `None` when the document has no manifest.
///
/// Callers check id uniqueness; see [`Book`](super::Book).
pub fn insert_manifest_item(xml: &str, item: &ManifestItem) -> Option<String> {
    let close = MANIFEST_CLOSE_RE.captures(xml)?;
    let whole = close.get(0)?;
    let prefix = close.get(1).map_or("", |m| m.as_str());

    let element = format!(
        "  <{prefix}item id=\"{}\" href=\"{}\" media-type=\"{}\"/>\n  ",
        escape_attr(&item.id),
        escape_attr(&item.href),
        escape_attr(&item.media_type),
    );

    let mut out = String::with_capacity(xml.len() + element.len());
    out.push_str(&xml[..whole.start()]);
    out.push_str(&element);
    out.push_str(&xml[whole.start()..]);
    Some(out)
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('"', "&quot;")
}
