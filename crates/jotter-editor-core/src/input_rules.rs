//! Text patterns rewritten as you type.
//!
//! `$$expr$$` right before the caret becomes a `math_inline` atom at the match,
//! `$$$expr$$$` becomes a `math_block` after the caret block. Each rewrite is a
//! single transaction.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::document::EditorDocument;
use crate::error::TreeError;
use crate::node::{Inline, Node};
use crate::schema::NodeKind;
use crate::transaction::{AppliedTransaction, SelectionAfter, Transaction, TxOrigin};
use crate::types::Caret;

static BLOCK_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\$\$([^$\x{FFFC}]+)\$\$\$$").unwrap());

static INLINE_MATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^$])(\$\$([^$\x{FFFC}]+)\$\$)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathRule {
    Inline,
    Block,
}

/// A rule hit in the text before the caret. `range` is in inline units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule: MathRule,
    pub range: Range<usize>,
    pub tex: String,
}

/// Match the math rules against the text that ends at the caret.
pub fn find_math_rule(before: &str) -> Option<RuleMatch> {
    let to_units = |byte: usize| before[..byte].chars().count();

    if let Some(caps) = BLOCK_MATH_RE.captures(before) {
        let whole = caps.get(0)?;
        let tex = caps.get(1)?.as_str().trim();
        if !tex.is_empty() {
            return Some(RuleMatch {
                rule: MathRule::Block,
                range: to_units(whole.start())..to_units(whole.end()),
                tex: tex.to_string(),
            });
        }
    }

    let caps = INLINE_MATH_RE.captures(before)?;
    let whole = caps.get(1)?;
    let tex = caps.get(2)?.as_str().trim();
    if tex.is_empty() {
        return None;
    }
    Some(RuleMatch {
        rule: MathRule::Inline,
        range: to_units(whole.start())..to_units(whole.end()),
        tex: tex.to_string(),
    })
}

/// Run the math rules at the caret. Returns the rewrite, if one fired.
pub fn apply_math_rules<D: EditorDocument + ?Sized>(
    editor: &mut D,
) -> Result<Option<AppliedTransaction>, TreeError> {
    let Some(caret) = editor.caret() else {
        return Ok(None);
    };
    let Some(before) = editor.text_before_caret() else {
        return Ok(None);
    };
    let Some(hit) = find_math_rule(&before) else {
        return Ok(None);
    };

    let tx = match hit.rule {
        MathRule::Inline => Transaction::new(TxOrigin::InputRule)
            .replace_inline(
                caret.block,
                hit.range.clone(),
                vec![Inline::Node(Node::math_inline(&hit.tex))],
            )
            .with_selection(SelectionAfter::Caret(Caret::new(
                caret.block,
                hit.range.start + 1,
            ))),
        MathRule::Block => {
            let doc = editor.document();
            let Some((parent, index)) = doc.parent_of(caret.block) else {
                return Ok(None);
            };
            let len = doc.node(caret.block).map_or(0, Node::inline_len);
            if hit.range.start == 0 && hit.range.end == len {
                // Nothing else in the block: the math takes its place.
                Transaction::new(TxOrigin::InputRule)
                    .replace_block(caret.block, Node::math_block(&hit.tex))
                    .insert_block(parent, index + 1, Node::new(NodeKind::Paragraph))
                    .with_selection(SelectionAfter::FirstInsertedTextblock)
            } else {
                Transaction::new(TxOrigin::InputRule)
                    .delete(caret.block, hit.range.clone())
                    .insert_block(parent, index + 1, Node::math_block(&hit.tex))
            }
        }
    };

    tracing::debug!(target: "jotter::math", rule = ?hit.rule, tex = %hit.tex, "math input rule");
    editor.dispatch(tx).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainEditor;
    use crate::tree::Document;

    fn typed(text: &str) -> PlainEditor {
        let mut ed = PlainEditor::new(Document::empty());
        ed.insert_text(text).unwrap();
        ed
    }

    #[test]
    fn matches() {
        let hit = find_math_rule("area $$x^2$$").unwrap();
        assert_eq!(hit.rule, MathRule::Inline);
        assert_eq!(hit.range, 5..12);
        assert_eq!(hit.tex, "x^2");

        let hit = find_math_rule("$$$ \\sum_i i $$$").unwrap();
        assert_eq!(hit.rule, MathRule::Block);
        assert_eq!(hit.range, 0..16);
        assert_eq!(hit.tex, "\\sum_i i");

        // Unit offsets, not bytes.
        let hit = find_math_rule("π ≈ $$\\pi$$").unwrap();
        assert_eq!(hit.range, 4..11);
    }

    #[test]
    fn non_matches() {
        assert_eq!(find_math_rule("$$x$"), None);
        assert_eq!(find_math_rule("$$  $$"), None);
        // Still typing a block delimiter.
        assert_eq!(find_math_rule("$$$x$$"), None);
        assert_eq!(find_math_rule("$$x$$ more"), None);
        assert_eq!(find_math_rule("$$a\u{FFFC}b$$"), None);
    }

    #[test]
    fn inline_rule_inserts_atom() {
        let mut ed = typed("area $$\\pi r^2$$");
        let applied = apply_math_rules(&mut ed).unwrap().unwrap();
        assert_eq!(applied.origin, TxOrigin::InputRule);

        let block = ed.caret_block().unwrap();
        assert_eq!(block.inline_text(), "area \u{FFFC}");
        let math = ed.document().nodes_of_kind(NodeKind::MathInline)[0];
        assert_eq!(math.attr("tex"), Some("\\pi r^2"));
        assert_eq!(ed.caret().unwrap().offset, 6);
    }

    #[test]
    fn block_rule_replaces_empty_paragraph() {
        let mut ed = typed("$$$E = mc^2$$$");
        apply_math_rules(&mut ed).unwrap().unwrap();

        let blocks = ed.document().blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind(), NodeKind::MathBlock);
        assert_eq!(blocks[0].attr("tex"), Some("E = mc^2"));
        assert_eq!(blocks[1].kind(), NodeKind::Paragraph);
        assert_eq!(ed.caret(), Some(Caret::new(blocks[1].id(), 0)));
    }

    #[test]
    fn block_rule_keeps_surrounding_text() {
        let mut ed = typed("Euler: $$$e^{i\\pi}+1=0$$$");
        apply_math_rules(&mut ed).unwrap().unwrap();

        let blocks = ed.document().blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].inline_text(), "Euler: ");
        assert_eq!(blocks[1].attr("tex"), Some("e^{i\\pi}+1=0"));
        assert_eq!(ed.caret(), Some(Caret::new(blocks[0].id(), 7)));
    }

    #[test]
    fn plain_text_is_left_alone() {
        let mut ed = typed("costs $5");
        assert!(apply_math_rules(&mut ed).unwrap().is_none());
        assert_eq!(ed.caret_block().unwrap().inline_text(), "costs $5");
    }
}
