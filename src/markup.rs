//! Illustration markers and the image tags that replace them.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

/// Opening of a marker comment as the text model is told to write it.
pub const MARKER_PREFIX: &str = "<!-- illustration:";

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--\s*illustration:(.*?)-->").expect("marker regex is valid")
});

/// A marker found in chapter markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    /// The full comment, exactly as it appears in the markup.
    pub raw: String,
    /// What the picture should show.
    pub description: String,
}

/// Every marker in document order. Markers with an empty description are skipped.
///
/// The description is trimmed and runs of whitespace inside it collapse to a
/// single space, so a marker wrapped over several lines reads as one sentence.
pub fn extract_illustrations(content: &str) -> Vec<Marker> {
    MARKER_RE
        .captures_iter(content)
        .filter_map(|caps| {
            let raw = caps.get(0)?.as_str().to_string();
            let description = caps
                .get(1)?
                .as_str()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            (!description.is_empty()).then_some(Marker { raw, description })
        })
        .collect()
}

/// Replace the first occurrence of `marker.raw` with `replacement`.
pub fn replace_marker(content: &str, marker: &Marker, replacement: &str) -> String {
    content.replacen(&marker.raw, replacement, 1)
}

/// The paragraph that takes a marker's place.
pub fn image_tag(src: &str, description: &str) -> String {
    format!(
        "<p><img src='{}' alt='{}' /></p>",
        escape_html(src),
        escape_html(description)
    )
}

/// Escape text for use inside an attribute or element body.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Relative path, with forward slashes, from the directory holding
/// `from_file` to `to_dir`. Both paths must be absolute and normalised.
pub fn relative_dir(from_file: &Path, to_dir: &Path) -> String {
    let from: Vec<Component> = from_file
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let to: Vec<Component> = to_dir.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<String> = Vec::new();
    parts.extend(std::iter::repeat_n("..".to_string(), from.len() - common));
    parts.extend(
        to[common..]
            .iter()
            .map(|c| c.as_os_str().to_string_lossy().into_owned()),
    );

    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn extracts_markers_in_order() {
        let content = "<p>a</p>\n<!-- illustration: A white whale breaching. -->\n<p>b</p>\n<!-- illustration: A harpoon. -->";
        let markers = extract_illustrations(content);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0].description, "A white whale breaching.");
        assert_eq!(markers[1].description, "A harpoon.");
        assert_eq!(markers[1].raw, "<!-- illustration: A harpoon. -->");
    }

    #[test]
    fn extracts_several_markers_on_one_line() {
        let content = "<!-- illustration: one --><p>x</p><!-- illustration: two -->";
        let markers = extract_illustrations(content);
        let descriptions: Vec<_> = markers.iter().map(|m| m.description.as_str()).collect();
        assert_eq!(descriptions, ["one", "two"]);
    }

    #[test]
    fn marker_spanning_lines_is_collapsed() {
        let content = "<!-- illustration: a ship\n   in a storm -->";
        let markers = extract_illustrations(content);
        assert_eq!(markers[0].description, "a ship in a storm");
    }

    #[test]
    fn ignores_other_comments_and_empty_markers() {
        let content = "<!-- chapter start --><!-- illustration:   --><p>x</p>";
        assert!(extract_illustrations(content).is_empty());
    }

    #[test]
    fn no_markers() {
        assert!(extract_illustrations("<p>plain</p>").is_empty());
    }

    #[test]
    fn replace_only_first_occurrence() {
        let marker = Marker {
            raw: "<!-- illustration: x -->".to_string(),
            description: "x".to_string(),
        };
        let content = "A<!-- illustration: x -->B<!-- illustration: x -->";
        assert_eq!(
            replace_marker(content, &marker, "[1]"),
            "A[1]B<!-- illustration: x -->"
        );
    }

    #[test]
    fn image_tag_escapes_alt() {
        let tag = image_tag("../Images/illustration_0.png", "Ahab's \"white\" <whale> & crew");
        assert_eq!(
            tag,
            "<p><img src='../Images/illustration_0.png' alt='Ahab&#x27;s &quot;white&quot; &lt;whale&gt; &amp; crew' /></p>"
        );
    }

    #[test]
    fn relative_dir_sibling() {
        let rel = relative_dir(
            &PathBuf::from("/tmp/book/OEBPS/Text/ch01.xhtml"),
            &PathBuf::from("/tmp/book/OEBPS/Images"),
        );
        assert_eq!(rel, "../Images");
    }

    #[test]
    fn relative_dir_child() {
        let rel = relative_dir(
            &PathBuf::from("/tmp/book/OEBPS/ch01.xhtml"),
            &PathBuf::from("/tmp/book/OEBPS/Images"),
        );
        assert_eq!(rel, "Images");
    }

    #[test]
    fn relative_dir_same() {
        let rel = relative_dir(
            &PathBuf::from("/tmp/book/Images/page.xhtml"),
            &PathBuf::from("/tmp/book/Images"),
        );
        assert_eq!(rel, ".");
    }

    #[test]
    fn escape_plain_text_untouched() {
        assert_eq!(escape_html("a calm sea"), "a calm sea");
    }
}
