//! LaTeX math rendering via pulldown-latex → MathML

use std::panic::{AssertUnwindSafe, catch_unwind};

use html_escape::{encode_double_quoted_attribute, encode_text};
use pulldown_latex::{
    Parser, Storage, config::DisplayMode, config::RenderConfig, mathml::push_mathml,
};

/// Result of attempting to render LaTeX math
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MathResult {
    /// Successfully rendered MathML
    Success(String),
    /// Rendering failed - contains fallback HTML showing the literal source
    Error { html: String, message: String },
}

impl MathResult {
    /// HTML to place in the node's slot, whichever way rendering went.
    pub fn html(&self) -> &str {
        match self {
            MathResult::Success(mathml) => mathml,
            MathResult::Error { html, .. } => html,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, MathResult::Error { .. })
    }
}

/// Render LaTeX math to MathML
///
/// # Arguments
/// * `latex` - The LaTeX source string (without delimiters like $$ or $$$)
/// * `display_mode` - If true, render as display math (block); if false, inline
///
/// Never panics: a panic inside the typesetter is caught and reported as an
/// error result with the literal fallback.
pub fn render_math(latex: &str, display_mode: bool) -> MathResult {
    match catch_unwind(AssertUnwindSafe(|| typeset(latex, display_mode))) {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(target: "jotter::math", latex, "typesetter panicked");
            let message = "typesetter panicked".to_string();
            MathResult::Error {
                html: format_error_html(latex, &message, display_mode),
                message,
            }
        }
    }
}

fn typeset(latex: &str, display_mode: bool) -> MathResult {
    if latex.trim().is_empty() {
        let message = "empty expression".to_string();
        return MathResult::Error {
            html: format_error_html(latex, &message, display_mode),
            message,
        };
    }

    let storage = Storage::new();
    let parser = Parser::new(latex, &storage);
    let config = RenderConfig {
        display_mode: if display_mode {
            DisplayMode::Block
        } else {
            DisplayMode::Inline
        },
        ..Default::default()
    };

    let mut mathml = String::new();

    // Collect events, tracking any errors
    let events: Vec<_> = parser.collect();
    let errors: Vec<String> = events
        .iter()
        .filter_map(|e| e.as_ref().err().map(|err| err.to_string()))
        .collect();

    if errors.is_empty() {
        if let Err(e) = push_mathml(&mut mathml, events.into_iter(), config) {
            return MathResult::Error {
                html: format_error_html(latex, &e.to_string(), display_mode),
                message: e.to_string(),
            };
        }
        MathResult::Success(mathml)
    } else {
        let error_msg = errors.join("; ");
        MathResult::Error {
            html: format_error_html(latex, &error_msg, display_mode),
            message: error_msg,
        }
    }
}

fn format_error_html(latex: &str, error: &str, display_mode: bool) -> String {
    let mode_class = if display_mode {
        "math-display"
    } else {
        "math-inline"
    };
    let escaped_latex = encode_text(latex);
    let escaped_error = encode_double_quoted_attribute(error);
    format!(
        r#"<span class="math math-error {mode_class}" title="{escaped_error}"><code>{escaped_latex}</code></span>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_inline_math() {
        let result = render_math("x^2", false);
        assert!(matches!(result, MathResult::Success(_)));
        if let MathResult::Success(mathml) = result {
            assert!(mathml.contains("<math"));
            assert!(mathml.contains("</math>"));
        }
    }

    #[test]
    fn renders_display_math() {
        let result = render_math(r"\frac{a}{b}", true);
        assert!(matches!(result, MathResult::Success(_)));
        if let MathResult::Success(mathml) = result {
            assert!(mathml.contains("<mfrac"));
        }
    }

    #[test]
    fn handles_invalid_latex() {
        // Unclosed brace
        let result = render_math(r"\frac{a", false);
        assert!(result.is_error());
        if let MathResult::Error { html, message } = result {
            assert!(html.contains("math-error"));
            assert!(html.contains(r"<code>\frac{a</code>"));
            assert!(!message.is_empty());
        }
    }

    #[test]
    fn empty_expression_falls_back() {
        let result = render_math("   ", true);
        assert!(result.is_error());
        assert!(result.html().contains("math-display"));
    }

    #[test]
    fn fallback_escapes_markup() {
        let html = format_error_html("a<b & c", "bad \"input\"", false);
        insta::assert_snapshot!(html, @r#"<span class="math math-error math-inline" title="bad &quot;input&quot;"><code>a&lt;b &amp; c</code></span>"#);
    }
}
