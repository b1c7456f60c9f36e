use std::ops::Range;

use crate::config::SuggestionConfig;
use crate::node::ATOM_CHAR;
use crate::tree::Document;
use crate::types::{Caret, NodeId};

/// An open trigger context: the trigger char through the caret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    pub block: NodeId,
    /// Trigger char plus query, in inline units.
    pub range: Range<usize>,
    pub query: String,
}

/// Look for an open trigger context ending at the caret.
///
/// The nearest trigger char before the caret opens a context when it starts
/// the block or follows whitespace, and the query after it has no line
/// break, no inline atom, and does not start with whitespace. Spaces inside
/// the query close the context unless `allow_spaces` is set.
pub fn find_trigger(doc: &Document, caret: Caret, config: &SuggestionConfig) -> Option<TriggerMatch> {
    let block = doc.node(caret.block)?;
    if !block.kind().is_textblock() {
        return None;
    }
    let units: Vec<char> = block.inline_text().chars().take(caret.offset).collect();

    let mut start = None;
    for (i, c) in units.iter().enumerate().rev() {
        if *c == config.trigger {
            start = Some(i);
            break;
        }
        if *c == '\n' || *c == ATOM_CHAR {
            return None;
        }
        if c.is_whitespace() && !config.allow_spaces {
            return None;
        }
    }
    let start = start?;

    if start > 0 && !units[start - 1].is_whitespace() {
        return None;
    }
    let query: String = units[start + 1..].iter().collect();
    if query.starts_with(char::is_whitespace) {
        return None;
    }
    Some(TriggerMatch {
        block: caret.block,
        range: start..units.len(),
        query,
    })
}
