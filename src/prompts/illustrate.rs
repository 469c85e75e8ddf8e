use crate::markup::MARKER_PREFIX;

const RULES: &[&str] = &[
    "Describe each illustration in vivid language in exactly one sentence.",
    "Illustrations should be helpful for the reader and provide valuable insight into the subject.",
    "Return the complete chapter markup with the markers inserted. Do not change anything else.",
    "Never place a marker inside a tag, an attribute, or another comment.",
];

/// Instruction sent alongside a chapter's markup.
pub fn build_illustrate_prompt(chapter_name: &str, book_name: &str) -> String {
    let rules = RULES
        .iter()
        .map(|rule| format!("- {}", rule))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Given a content from an epub file {chapter_name} for a book {book_name} \
         find best places to insert illustrations. Illustrations should be inserted as \
         {MARKER_PREFIX} string -->\n\n{rules}\n"
    )
}
