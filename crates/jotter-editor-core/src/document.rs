//! Core editor document trait and implementations.
//!
//! Defines the `EditorDocument` trait for abstracting editor state storage,
//! allowing different strategies (plain fields vs reactive signals) while
//! sharing the caret bookkeeping and default editing logic.

use std::ops::Range;

use crate::error::TreeError;
use crate::node::{Inline, Node};
use crate::schema::NodeKind;
use crate::transaction::{AppliedTransaction, SelectionAfter, Step, Transaction, TxOrigin};
use crate::tree::Document;
use crate::types::{Caret, NodeId};

/// Core trait for editor documents.
///
/// Implementors provide storage for the tree and the caret. Everything else,
/// dispatching transactions with caret mapping included, is provided.
pub trait EditorDocument {
    // === Required: state access ===

    fn document(&self) -> &Document;

    fn document_mut(&mut self) -> &mut Document;

    /// Current caret, if the editor has focus in a textblock.
    fn caret(&self) -> Option<Caret>;

    fn set_caret(&mut self, caret: Option<Caret>);

    // === Provided: convenience accessors ===

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.document().node(id)
    }

    /// The textblock holding the caret.
    fn caret_block(&self) -> Option<&Node> {
        self.caret().and_then(|c| self.node(c.block))
    }

    /// Inline text of the caret block up to the caret, atoms as U+FFFC.
    fn text_before_caret(&self) -> Option<String> {
        let caret = self.caret()?;
        let block = self.node(caret.block)?;
        Some(block.inline_text().chars().take(caret.offset).collect())
    }

    // === Provided: dispatch ===

    /// Apply a transaction and move the caret along with it.
    fn dispatch(&mut self, tx: Transaction) -> Result<AppliedTransaction, TreeError> {
        let edits: Vec<(NodeId, Range<usize>, usize)> = tx
            .steps()
            .iter()
            .filter_map(|step| match step {
                Step::ReplaceInline {
                    block,
                    range,
                    content,
                } => Some((*block, range.clone(), content.iter().map(Inline::len).sum())),
                _ => None,
            })
            .collect();
        let before = self.caret();
        let applied = self.document_mut().apply(tx)?;

        let mapped = before.map(|caret| map_caret(caret, &edits));
        let next = resolve_caret(self.document(), mapped, &applied);
        self.set_caret(next);
        Ok(applied)
    }

    // === Provided: default editing ===

    /// Insert plain text at the caret.
    fn insert_text(&mut self, text: &str) -> Result<Option<AppliedTransaction>, TreeError> {
        let Some(caret) = self.caret() else {
            return Ok(None);
        };
        if text.is_empty() {
            return Ok(None);
        }
        let tx = Transaction::new(TxOrigin::User).insert_text(caret.block, caret.offset, text);
        self.dispatch(tx).map(Some)
    }

    /// Backspace: delete the unit before the caret, or join with the previous textblock.
    fn delete_backward(&mut self) -> Result<Option<AppliedTransaction>, TreeError> {
        let Some(caret) = self.caret() else {
            return Ok(None);
        };
        if caret.offset > 0 {
            let tx = Transaction::new(TxOrigin::User)
                .delete(caret.block, caret.offset - 1..caret.offset);
            return self.dispatch(tx).map(Some);
        }

        let doc = self.document();
        let Some((parent, index)) = doc.parent_of(caret.block) else {
            return Ok(None);
        };
        let Some(prev) = index
            .checked_sub(1)
            .and_then(|i| doc.node(parent).and_then(|p| p.children().get(i)))
        else {
            return Ok(None);
        };
        let Some(block) = doc.node(caret.block) else {
            return Ok(None);
        };

        let tx = if prev.kind().is_atom() || prev.kind() == NodeKind::CodeBlock {
            // Code and math blocks are removed as a unit.
            Transaction::new(TxOrigin::User)
                .remove_block(prev.id())
                .with_selection(SelectionAfter::Caret(caret))
        } else {
            // Join into the previous textblock, the last one inside a list.
            let Some(target) = prev.last_textblock() else {
                return Ok(None);
            };
            let join_at = target.inline_len();
            let content = block.inline().to_vec();
            Transaction::new(TxOrigin::User)
                .replace_inline(target.id(), join_at..join_at, content)
                .remove_block(caret.block)
                .with_selection(SelectionAfter::Caret(Caret::new(target.id(), join_at)))
        };
        self.dispatch(tx).map(Some)
    }

    /// Enter: split the caret block, moving the rest into a new paragraph after it.
    fn split_block(&mut self) -> Result<Option<AppliedTransaction>, TreeError> {
        let Some(caret) = self.caret() else {
            return Ok(None);
        };
        let doc = self.document();
        let (Some(block), Some((parent, index))) =
            (doc.node(caret.block), doc.parent_of(caret.block))
        else {
            return Ok(None);
        };
        let len = block.inline_len();
        let rest = block.slice_inline(caret.offset..len);
        let tx = Transaction::new(TxOrigin::User)
            .delete(caret.block, caret.offset..len)
            .insert_block(
                parent,
                index + 1,
                Node::new(NodeKind::Paragraph).with_inline(rest),
            )
            .with_selection(SelectionAfter::FirstInsertedTextblock);
        self.dispatch(tx).map(Some)
    }

    /// Move the caret within its block by `delta` units, clamped.
    fn move_caret(&mut self, delta: isize) {
        let Some(caret) = self.caret() else {
            return;
        };
        let len = self.node(caret.block).map_or(0, Node::inline_len);
        let offset = caret.offset.saturating_add_signed(delta).min(len);
        self.set_caret(Some(Caret::new(caret.block, offset)));
    }
}

/// Shift a caret through the inline edits of a transaction.
fn map_caret(mut caret: Caret, edits: &[(NodeId, Range<usize>, usize)]) -> Caret {
    for (block, range, inserted) in edits {
        if *block != caret.block {
            continue;
        }
        if caret.offset >= range.end {
            caret.offset = caret.offset - (range.end - range.start) + inserted;
        } else if caret.offset > range.start {
            caret.offset = range.start + inserted;
        }
    }
    caret
}

/// Settle the caret after a transaction, keeping it inside a live textblock.
fn resolve_caret(
    doc: &Document,
    mapped: Option<Caret>,
    applied: &AppliedTransaction,
) -> Option<Caret> {
    let clamp = |caret: Caret| -> Option<Caret> {
        let block = doc.node(caret.block)?;
        block
            .kind()
            .is_textblock()
            .then(|| Caret::new(caret.block, caret.offset.min(block.inline_len())))
    };

    match applied.selection {
        Some(SelectionAfter::Caret(caret)) => {
            if let Some(caret) = clamp(caret) {
                return Some(caret);
            }
        }
        Some(SelectionAfter::FirstInsertedTextblock) => {
            let inserted = applied
                .inserted
                .iter()
                .filter_map(|id| doc.node(*id))
                .find(|n| n.kind().is_textblock());
            if let Some(block) = inserted {
                return Some(Caret::new(block.id(), 0));
            }
        }
        None => {}
    }

    let caret = mapped?;
    if let Some(caret) = clamp(caret) {
        return Some(caret);
    }
    // The caret block became something else or went away.
    if doc.contains(caret.block) {
        let inside = doc.node(caret.block).and_then(Node::first_textblock);
        if let Some(block) = inside.or_else(|| doc.textblock_after(caret.block)) {
            return Some(Caret::new(block.id(), 0));
        }
    }
    doc.first_textblock().map(|b| Caret::new(b.id(), 0))
}

/// Simple field-based implementation of EditorDocument.
#[derive(Clone, Debug, Default)]
pub struct PlainEditor {
    doc: Document,
    caret: Option<Caret>,
}

impl PlainEditor {
    /// Wrap a document with the caret at the start of its first textblock.
    pub fn new(doc: Document) -> Self {
        let caret = doc.first_textblock().map(|b| Caret::new(b.id(), 0));
        Self { doc, caret }
    }

    pub fn into_document(self) -> Document {
        self.doc
    }
}

impl EditorDocument for PlainEditor {
    fn document(&self) -> &Document {
        &self.doc
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    fn caret(&self) -> Option<Caret> {
        self.caret
    }

    fn set_caret(&mut self, caret: Option<Caret>) {
        self.caret = caret;
    }
}
