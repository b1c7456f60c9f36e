//! Syntax highlighting for code blocks in read-only output.
//!
//! The live editor hands highlighting to the embedded code surface; this is
//! only used when a document is exported as static HTML.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Prefix for every highlighting class so export CSS can't collide with app styles.
pub const CSS_PREFIX: &str = "jt-";

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// The shared default syntax set.
pub fn syntax_set() -> &'static SyntaxSet {
    &SYNTAX_SET
}

#[derive(Debug, thiserror::Error)]
#[error("highlighting failed: {0}")]
pub struct HighlightError(#[from] syntect::Error);

/// Highlighted spans for `code`, without the surrounding `<pre><code>`.
///
/// Unknown or missing languages highlight as plain text.
pub fn highlight_spans(
    syntax_set: &SyntaxSet,
    lang: Option<&str>,
    code: &str,
) -> Result<String, HighlightError> {
    let syntax = lang
        .and_then(|l| syntax_set.find_syntax_by_token(l))
        .unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut generator = ClassedHTMLGenerator::new_with_class_style(
        syntax,
        syntax_set,
        ClassStyle::SpacedPrefixed { prefix: CSS_PREFIX },
    );
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_known_language() {
        let spans = highlight_spans(syntax_set(), Some("rust"), "fn main() {}\n").unwrap();
        assert!(spans.contains("<span class=\"jt-"));
        assert!(spans.contains("main"));
    }

    #[test]
    fn unknown_language_is_plain_text() {
        let spans = highlight_spans(syntax_set(), Some("klingon"), "a < b\n").unwrap();
        assert!(spans.contains("a &lt; b"));
        assert_eq!(
            spans,
            highlight_spans(syntax_set(), None, "a < b\n").unwrap()
        );
    }
}
