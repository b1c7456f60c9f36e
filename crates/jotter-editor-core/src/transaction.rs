//! Transactions: the only way the document tree changes.
//!
//! A [`Transaction`] is an ordered list of [`Step`]s applied atomically. Every
//! step has an exact inverse, so applying a transaction yields the transaction
//! that undoes it; hosts keep their own history stack out of those.

use std::collections::BTreeSet;
use std::ops::Range;

use smol_str::SmolStr;

use crate::error::TreeError;
use crate::node::{Attrs, Inline, Node};
use crate::schema::{self, NodeKind};
use crate::tree::Document;
use crate::types::{Caret, NodeId};

/// One primitive tree edit.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Replace inline units `range` of a textblock with `content`.
    ReplaceInline {
        block: NodeId,
        range: Range<usize>,
        content: Vec<Inline>,
    },
    SetAttr {
        node: NodeId,
        name: SmolStr,
        value: String,
    },
    /// Replace the plain text of a code block.
    SetText { node: NodeId, text: String },
    /// Change a block's kind and attributes, keeping its id and content.
    SetKind {
        node: NodeId,
        kind: NodeKind,
        attrs: Attrs,
    },
    InsertBlock {
        parent: NodeId,
        index: usize,
        node: Node,
    },
    RemoveBlock { node: NodeId },
    /// Swap a block for another, keeping the id. Descendants of the old block go away.
    ReplaceBlock { node: NodeId, with: Node },
}

/// Who started a transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TxOrigin {
    /// Direct typing or default key handling.
    #[default]
    User,
    /// Debounced commit from an embedded code surface.
    Surface(NodeId),
    /// A committed suggestion command.
    Suggestion,
    /// A text pattern rewritten as you type.
    InputRule,
    /// Undo or redo in the host's history.
    History,
    Programmatic,
}

/// Where the caret should go once a transaction lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionAfter {
    Caret(Caret),
    /// Start of the first textblock the transaction inserted.
    FirstInsertedTextblock,
}

/// An atomic batch of steps.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transaction {
    steps: Vec<Step>,
    origin: TxOrigin,
    selection: Option<SelectionAfter>,
}

impl Transaction {
    pub fn new(origin: TxOrigin) -> Self {
        Self {
            steps: Vec::new(),
            origin,
            selection: None,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn insert_text(self, block: NodeId, offset: usize, text: impl Into<String>) -> Self {
        self.replace_inline(block, offset..offset, vec![Inline::Text(text.into())])
    }

    pub fn delete(self, block: NodeId, range: Range<usize>) -> Self {
        self.replace_inline(block, range, Vec::new())
    }

    pub fn replace_inline(self, block: NodeId, range: Range<usize>, content: Vec<Inline>) -> Self {
        self.step(Step::ReplaceInline {
            block,
            range,
            content,
        })
    }

    pub fn set_attr(self, node: NodeId, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.step(Step::SetAttr {
            node,
            name: name.into(),
            value: value.into(),
        })
    }

    pub fn set_text(self, node: NodeId, text: impl Into<String>) -> Self {
        self.step(Step::SetText {
            node,
            text: text.into(),
        })
    }

    pub fn set_kind(self, node: NodeId, kind: NodeKind, attrs: Attrs) -> Self {
        self.step(Step::SetKind { node, kind, attrs })
    }

    pub fn insert_block(self, parent: NodeId, index: usize, node: Node) -> Self {
        self.step(Step::InsertBlock {
            parent,
            index,
            node,
        })
    }

    pub fn remove_block(self, node: NodeId) -> Self {
        self.step(Step::RemoveBlock { node })
    }

    pub fn replace_block(self, node: NodeId, with: Node) -> Self {
        self.step(Step::ReplaceBlock { node, with })
    }

    pub fn with_selection(mut self, selection: SelectionAfter) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn set_selection(&mut self, selection: SelectionAfter) {
        self.selection = Some(selection);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn origin(&self) -> TxOrigin {
        self.origin
    }

    pub fn selection(&self) -> Option<SelectionAfter> {
        self.selection
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// The outcome of a successfully applied transaction.
#[derive(Clone, Debug, PartialEq)]
pub struct AppliedTransaction {
    pub origin: TxOrigin,
    /// Applying this restores the document as it was before.
    pub inverse: Transaction,
    /// Nodes that still exist but whose kind, attributes or content changed.
    pub changed: BTreeSet<NodeId>,
    /// Nodes newly added to the tree, descendants included.
    pub inserted: Vec<NodeId>,
    /// Nodes no longer in the tree, descendants included.
    pub removed: Vec<NodeId>,
    pub selection: Option<SelectionAfter>,
}

impl AppliedTransaction {
    /// Whether `id` was touched in any way.
    pub fn touches(&self, id: NodeId) -> bool {
        self.changed.contains(&id) || self.inserted.contains(&id) || self.removed.contains(&id)
    }
}

#[derive(Default)]
struct StepEffect {
    changed: Vec<NodeId>,
    inserted: Vec<NodeId>,
    removed: Vec<NodeId>,
}

impl Document {
    /// Apply a transaction atomically.
    ///
    /// Either every step lands or the document is left exactly as it was.
    pub fn apply(&mut self, tx: Transaction) -> Result<AppliedTransaction, TreeError> {
        let Transaction {
            steps,
            origin,
            selection,
        } = tx;
        let mut inverses: Vec<Step> = Vec::with_capacity(steps.len());
        let mut changed = BTreeSet::new();
        let mut inserted = Vec::new();
        let mut removed = Vec::new();

        for step in steps {
            match self.apply_step(step) {
                Ok((inverse, effect)) => {
                    inverses.push(inverse);
                    changed.extend(effect.changed);
                    inserted.extend(effect.inserted);
                    removed.extend(effect.removed);
                }
                Err(err) => {
                    for inverse in inverses.into_iter().rev() {
                        if let Err(rollback) = self.apply_step(inverse) {
                            tracing::error!(
                                target: "jotter::tree",
                                error = %rollback,
                                "rollback step failed"
                            );
                        }
                    }
                    tracing::debug!(target: "jotter::tree", error = %err, ?origin, "transaction rejected");
                    return Err(err);
                }
            }
        }

        // A node inserted then removed in the same transaction was never observable.
        inserted.retain(|id| self.contains(*id));
        removed.retain(|id| !self.contains(*id));
        changed.retain(|id| self.contains(*id) && !inserted.contains(id));

        inverses.reverse();
        let inverse = Transaction {
            steps: inverses,
            origin: TxOrigin::History,
            selection: None,
        };
        tracing::trace!(
            target: "jotter::tree",
            ?origin,
            changed = changed.len(),
            inserted = inserted.len(),
            removed = removed.len(),
            "applied transaction"
        );
        Ok(AppliedTransaction {
            origin,
            inverse,
            changed,
            inserted,
            removed,
            selection,
        })
    }

    fn apply_step(&mut self, step: Step) -> Result<(Step, StepEffect), TreeError> {
        let mut effect = StepEffect::default();
        let inverse = match step {
            Step::ReplaceInline {
                block,
                range,
                mut content,
            } => {
                for item in content.iter_mut() {
                    if let Inline::Node(atom) = item {
                        if !atom.kind().is_inline() {
                            return Err(TreeError::InvalidChild {
                                parent: "inline content",
                                child: atom.kind().name(),
                            });
                        }
                        schema::check(atom)?;
                    }
                }
                for item in content.iter_mut() {
                    if let Inline::Node(atom) = item {
                        self.adopt(atom)?;
                        effect.inserted.extend(atom.ids());
                    }
                }
                let inserted_len: usize = content.iter().map(Inline::len).sum();
                let node = self
                    .node_mut(block)
                    .ok_or(TreeError::NodeNotFound(block))?;
                let start = range.start;
                let removed = node.replace_inline_raw(range, content)?;
                for item in &removed {
                    if let Inline::Node(atom) = item {
                        effect.removed.extend(atom.ids());
                    }
                }
                effect.changed.push(block);
                Step::ReplaceInline {
                    block,
                    range: start..start + inserted_len,
                    content: removed,
                }
            }
            Step::SetAttr { node, name, value } => {
                let target = self.node_mut(node).ok_or(TreeError::NodeNotFound(node))?;
                schema::check_attr(target.kind(), &name, &value)?;
                // A code block's text content always mirrors its `code` attribute.
                if target.kind() == NodeKind::CodeBlock && name == "code" {
                    target.set_text_raw(value.clone())?;
                }
                let old = target.set_attr_raw(name.clone(), value).unwrap_or_else(|| {
                    target.kind().attr_default(&name).unwrap_or_default().to_string()
                });
                effect.changed.push(node);
                Step::SetAttr {
                    node,
                    name,
                    value: old,
                }
            }
            Step::SetText { node, text } => {
                let target = self.node_mut(node).ok_or(TreeError::NodeNotFound(node))?;
                let old = target.set_text_raw(text.clone())?;
                if target.kind() == NodeKind::CodeBlock {
                    target.set_attr_raw(SmolStr::new_static("code"), text);
                }
                effect.changed.push(node);
                Step::SetText { node, text: old }
            }
            Step::SetKind { node, kind, attrs } => {
                let current = self.node(node).ok_or(TreeError::NodeNotFound(node))?.kind();
                // Content is kept, so only kinds sharing a content rule can swap.
                if current.content_rule() != kind.content_rule() || kind == NodeKind::Doc {
                    return Err(TreeError::ContentMismatch {
                        kind: kind.name(),
                        expected: current.name(),
                    });
                }
                if let Some((parent, _)) = self.parent_of(node) {
                    self.check_parent_allows(parent, kind)?;
                }
                let mut full = Attrs::defaults(kind);
                for (name, value) in attrs.iter() {
                    schema::check_attr(kind, name, value)?;
                    full.set(name, value);
                }
                let target = self.node_mut(node).ok_or(TreeError::NodeNotFound(node))?;
                let (old_kind, old_attrs) = target.set_kind_raw(kind, full);
                effect.changed.push(node);
                Step::SetKind {
                    node,
                    kind: old_kind,
                    attrs: old_attrs,
                }
            }
            Step::InsertBlock {
                parent,
                index,
                mut node,
            } => {
                schema::check(&node)?;
                self.check_parent_allows(parent, node.kind())?;
                self.adopt(&mut node)?;
                let id = node.id();
                let ids = node.ids();
                let container = self
                    .node_mut(parent)
                    .and_then(Node::children_mut)
                    .ok_or(TreeError::NodeNotFound(parent))?;
                if index > container.len() {
                    return Err(TreeError::OutOfBounds {
                        node: parent,
                        start: index,
                        end: index,
                        len: container.len(),
                    });
                }
                container.insert(index, node);
                effect.inserted.extend(ids);
                Step::RemoveBlock { node: id }
            }
            Step::RemoveBlock { node } => {
                if node == self.root_id() {
                    return Err(TreeError::RootImmutable);
                }
                let (parent, index) = self.parent_of(node).ok_or_else(|| {
                    if self.contains(node) {
                        TreeError::NotABlock(node)
                    } else {
                        TreeError::NodeNotFound(node)
                    }
                })?;
                let container = self
                    .node_mut(parent)
                    .and_then(Node::children_mut)
                    .ok_or(TreeError::NodeNotFound(parent))?;
                let old = container.remove(index);
                effect.removed.extend(old.ids());
                Step::InsertBlock {
                    parent,
                    index,
                    node: old,
                }
            }
            Step::ReplaceBlock { node, mut with } => {
                if node == self.root_id() {
                    return Err(TreeError::RootImmutable);
                }
                schema::check(&with)?;
                let (parent, index) = self.parent_of(node).ok_or_else(|| {
                    if self.contains(node) {
                        TreeError::NotABlock(node)
                    } else {
                        TreeError::NodeNotFound(node)
                    }
                })?;
                self.check_parent_allows(parent, with.kind())?;
                let container = self
                    .node_mut(parent)
                    .and_then(Node::children_mut)
                    .ok_or(TreeError::NodeNotFound(parent))?;
                // Take the old subtree out first so its ids are free for reuse.
                let old = std::mem::replace(&mut container[index], Node::new(NodeKind::Paragraph));
                with.id = node;
                let adopted = self.adopt(&mut with);
                let container = self
                    .node_mut(parent)
                    .and_then(Node::children_mut)
                    .ok_or(TreeError::NodeNotFound(parent))?;
                if let Err(err) = adopted {
                    container[index] = old;
                    return Err(err);
                }
                effect.removed.extend(old.ids().into_iter().filter(|id| *id != node));
                effect.inserted.extend(with.ids().into_iter().filter(|id| *id != node));
                effect.changed.push(node);
                container[index] = with;
                Step::ReplaceBlock { node, with: old }
            }
        };
        Ok((inverse, effect))
    }

    fn check_parent_allows(&self, parent: NodeId, kind: NodeKind) -> Result<(), TreeError> {
        let parent_node = self.node(parent).ok_or(TreeError::NodeNotFound(parent))?;
        if parent_node.kind().allows_child(kind) {
            Ok(())
        } else {
            Err(TreeError::InvalidChild {
                parent: parent_node.kind().name(),
                child: kind.name(),
            })
        }
    }
}
