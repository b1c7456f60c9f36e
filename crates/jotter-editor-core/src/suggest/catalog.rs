//! The command catalog and the context commands run in.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use smol_str::SmolStr;

use crate::error::CommandError;
use crate::node::{Attrs, Inline, Node, normalize_inline};
use crate::schema::NodeKind;
use crate::transaction::{SelectionAfter, Step, Transaction};
use crate::tree::Document;
use crate::types::NodeId;

/// Command body. Adds its edits to the commit transaction through the context.
pub type ApplyFn = Arc<dyn Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync>;

/// One entry in the suggestion popup.
#[derive(Clone)]
pub struct CommandEntry {
    title: SmolStr,
    category: SmolStr,
    keywords: Vec<SmolStr>,
    apply: ApplyFn,
}

impl CommandEntry {
    pub fn new<F>(title: impl Into<SmolStr>, category: impl Into<SmolStr>, apply: F) -> Self
    where
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        Self {
            title: title.into(),
            category: category.into(),
            keywords: Vec::new(),
            apply: Arc::new(apply),
        }
    }

    pub fn with_keywords<I, K>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SmolStr>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn keywords(&self) -> &[SmolStr] {
        &self.keywords
    }

    /// Case-insensitive substring match on title, category or any keyword.
    /// `query` must already be lowercase.
    pub fn matches(&self, query: &str) -> bool {
        self.title.to_lowercase().contains(query)
            || self.category.to_lowercase().contains(query)
            || self
                .keywords
                .iter()
                .any(|k| k.to_lowercase().contains(query))
    }

    pub fn apply(&self, cx: &mut CommandContext<'_>) -> Result<(), CommandError> {
        (self.apply)(cx)
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("title", &self.title)
            .field("category", &self.category)
            .field("keywords", &self.keywords)
            .finish_non_exhaustive()
    }
}

/// Immutable set of commands, shared across sessions.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CommandEntry>,
    categories: Vec<SmolStr>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn entries(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CommandEntry> {
        self.entries.get(index)
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> &[SmolStr] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Declares a catalog data-side.
///
/// ```ignore
/// let catalog = Catalog::builder()
///     .category("Basic blocks")
///     .command("Heading 1", ["h1", "title"], |cx| cx.set_heading(1))
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    catalog: Catalog,
    current: Option<SmolStr>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a category. Later `command` calls land in it.
    pub fn category(mut self, name: impl Into<SmolStr>) -> Self {
        let name = name.into();
        self.declare(&name);
        self.current = Some(name);
        self
    }

    /// Add a command to the current category (or "General" before any).
    pub fn command<I, K, F>(self, title: impl Into<SmolStr>, keywords: I, apply: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<SmolStr>,
        F: Fn(&mut CommandContext<'_>) -> Result<(), CommandError> + Send + Sync + 'static,
    {
        let category = self
            .current
            .clone()
            .unwrap_or_else(|| SmolStr::new_static("General"));
        self.entry(CommandEntry::new(title, category, apply).with_keywords(keywords))
    }

    pub fn entry(mut self, entry: CommandEntry) -> Self {
        self.declare(&entry.category);
        self.catalog.entries.push(entry);
        self
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }

    fn declare(&mut self, category: &SmolStr) {
        if !self.catalog.categories.contains(category) {
            self.catalog.categories.push(category.clone());
        }
    }
}

/// What a command sees when it runs.
///
/// The trigger text is already queued for deletion; `position` is where it
/// started, which is where the command's own edits go. Everything a command
/// does is collected into the same transaction.
pub struct CommandContext<'a> {
    doc: &'a Document,
    block: &'a Node,
    trigger: Range<usize>,
    position: usize,
    code_language: &'a str,
    tx: Transaction,
}

impl<'a> CommandContext<'a> {
    pub(crate) fn new(
        doc: &'a Document,
        block: &'a Node,
        trigger: Range<usize>,
        code_language: &'a str,
        tx: Transaction,
    ) -> Self {
        Self {
            doc,
            block,
            position: trigger.start,
            trigger,
            code_language,
            tx,
        }
    }

    /// The document as it was before the commit.
    pub fn document(&self) -> &Document {
        self.doc
    }

    /// The textblock the trigger was typed in, before the commit.
    pub fn block(&self) -> &Node {
        self.block
    }

    pub fn block_id(&self) -> NodeId {
        self.block.id()
    }

    /// Insertion point in the block, after the trigger text is gone.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn default_code_language(&self) -> &str {
        self.code_language
    }

    /// Block content without the trigger text.
    pub fn remaining_inline(&self) -> Vec<Inline> {
        let len = self.block.inline_len();
        let mut items = self.block.slice_inline(0..self.trigger.start);
        items.extend(self.block.slice_inline(self.trigger.end..len));
        normalize_inline(items)
    }

    /// Whether the block holds nothing but the trigger text.
    pub fn is_block_empty(&self) -> bool {
        self.block.inline_len() == self.trigger.len()
    }

    pub fn insert_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.tx.push(Step::ReplaceInline {
            block: self.block.id(),
            range: self.position..self.position,
            content: vec![Inline::Text(text.to_string())],
        });
        self.position += text.chars().count();
    }

    /// Insert an inline atom at the insertion point.
    pub fn insert_inline(&mut self, node: Node) -> Result<(), CommandError> {
        if !node.kind().is_inline() {
            return Err(CommandError::Failed(format!(
                "{} is not an inline node",
                node.kind().name()
            )));
        }
        self.tx.push(Step::ReplaceInline {
            block: self.block.id(),
            range: self.position..self.position,
            content: vec![Inline::Node(node)],
        });
        self.position += 1;
        Ok(())
    }

    /// Turn the block into another textblock kind, keeping its content.
    pub fn set_block_kind(&mut self, kind: NodeKind, attrs: Attrs) -> Result<(), CommandError> {
        if !kind.is_textblock() {
            return Err(CommandError::Failed(format!(
                "{} is not a textblock",
                kind.name()
            )));
        }
        self.tx.push(Step::SetKind {
            node: self.block.id(),
            kind,
            attrs,
        });
        Ok(())
    }

    pub fn set_heading(&mut self, level: u8) -> Result<(), CommandError> {
        let attrs: Attrs = [("level", level.to_string())].into_iter().collect();
        self.set_block_kind(NodeKind::Heading, attrs)
    }

    /// Swap the whole block for `node`. The caret lands in its first textblock.
    pub fn replace_block(&mut self, node: Node) {
        self.tx.push(Step::ReplaceBlock {
            node: self.block.id(),
            with: node,
        });
        self.tx.set_selection(SelectionAfter::FirstInsertedTextblock);
    }

    /// Put blocks in place of an otherwise empty block, or after it.
    ///
    /// When nothing typeable would follow, an empty paragraph is appended so
    /// writing can continue below.
    pub fn insert_blocks(&mut self, mut nodes: Vec<Node>) -> Result<(), CommandError> {
        let (parent, index) = self
            .doc
            .parent_of(self.block.id())
            .ok_or_else(|| CommandError::Failed(format!("{} has no parent", self.block.id())))?;
        if nodes.is_empty() {
            return Ok(());
        }
        let siblings = self.doc.node(parent).map_or(0, |p| p.children().len());
        let is_last = index + 1 == siblings;
        let has_textblock = nodes.iter().any(|n| n.first_textblock().is_some());
        if is_last && nodes.last().is_some_and(|n| n.first_textblock().is_none()) {
            nodes.push(Node::new(NodeKind::Paragraph));
        }

        let mut at = index + 1;
        let mut nodes = nodes.into_iter();
        if self.is_block_empty() {
            if let Some(first) = nodes.next() {
                self.tx.push(Step::ReplaceBlock {
                    node: self.block.id(),
                    with: first,
                });
            }
        }
        for node in nodes {
            self.tx.push(Step::InsertBlock { parent, index: at, node });
            at += 1;
        }
        if has_textblock || is_last {
            self.tx.set_selection(SelectionAfter::FirstInsertedTextblock);
        }
        Ok(())
    }

    pub fn set_selection(&mut self, selection: SelectionAfter) {
        self.tx.set_selection(selection);
    }

    pub(crate) fn into_transaction(self) -> Transaction {
        self.tx
    }
}

impl fmt::Debug for CommandContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("block", &self.block.id())
            .field("trigger", &self.trigger)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut CommandContext<'_>) -> Result<(), CommandError> {
        Ok(())
    }

    #[test]
    fn categories_keep_declaration_order() {
        let catalog = Catalog::builder()
            .category("Templates")
            .command("Daily reflection", ["journal"], noop)
            .category("Basic blocks")
            .command("Paragraph", ["text"], noop)
            .category("Templates")
            .command("Gratitude list", ["thanks"], noop)
            .build();
        assert_eq!(catalog.categories(), ["Templates", "Basic blocks"]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.entries()[2].category(), "Templates");
    }

    #[test]
    fn matching_covers_title_category_keywords() {
        let entry = CommandEntry::new("Heading 1", "Basic blocks", noop).with_keywords(["h1", "Title"]);
        assert!(entry.matches("head"));
        assert!(entry.matches("basic"));
        assert!(entry.matches("title"));
        assert!(!entry.matches("code"));
    }

    #[test]
    fn remaining_inline_drops_trigger() {
        let doc = Document::new(vec![Node::paragraph("see /code here")]).unwrap();
        let block = &doc.blocks()[0];
        let cx = CommandContext::new(&doc, block, 4..9, "plaintext", Transaction::default());
        assert_eq!(cx.remaining_inline(), vec![Inline::Text("see  here".into())]);
        assert!(!cx.is_block_empty());
        assert_eq!(cx.position(), 4);
    }
}
