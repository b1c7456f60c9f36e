//! The document tree: a `doc` root node plus id allocation and lookup.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TreeError;
use crate::node::Node;
use crate::schema::{self, NodeKind};
use crate::types::NodeId;

/// A schema-valid document whose every node carries a unique [`NodeId`].
///
/// The tree is only mutated through [`Document::apply`](crate::transaction),
/// so the schema holds between transactions.
#[derive(Clone, Debug)]
pub struct Document {
    root: Node,
    next_id: u64,
}

impl Document {
    /// Build a document from its top-level blocks.
    pub fn new(blocks: Vec<Node>) -> Result<Self, TreeError> {
        Self::from_root(Node::doc(blocks))
    }

    /// Build a document from a `doc` node, validating and assigning ids.
    pub fn from_root(root: Node) -> Result<Self, TreeError> {
        if root.kind() != NodeKind::Doc {
            return Err(TreeError::InvalidChild {
                parent: "document root",
                child: root.kind().name(),
            });
        }
        schema::check(&root)?;
        let mut doc = Self {
            root: root.detached(),
            next_id: 1,
        };
        let mut next = doc.next_id;
        doc.root.assign_ids(&mut || {
            let id = NodeId(next);
            next += 1;
            id
        });
        doc.next_id = next;
        Ok(doc)
    }

    /// A document holding one empty paragraph.
    pub fn empty() -> Self {
        let mut root = Node::doc(vec![Node::paragraph("")]);
        let mut next = 1;
        root.assign_ids(&mut || {
            let id = NodeId(next);
            next += 1;
            id
        });
        Self {
            root,
            next_id: next,
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_id(&self) -> NodeId {
        self.root.id()
    }

    /// Top-level blocks.
    pub fn blocks(&self) -> &[Node] {
        self.root.children()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.root.find(id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.root.find_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Parent id and index of a block-level node. `None` for the root and for inline atoms.
    pub fn parent_of(&self, id: NodeId) -> Option<(NodeId, usize)> {
        fn search(node: &Node, id: NodeId) -> Option<(NodeId, usize)> {
            for (index, child) in node.children().iter().enumerate() {
                if child.id() == id {
                    return Some((node.id(), index));
                }
                if let Some(found) = search(child, id) {
                    return Some(found);
                }
            }
            None
        }
        search(&self.root, id)
    }

    /// Textblock containing an inline atom.
    pub fn textblock_of_atom(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let mut found = None;
        self.root.walk(&mut |node| {
            if found.is_some() || !node.kind().is_textblock() {
                return;
            }
            let mut offset = 0;
            for item in node.inline() {
                if let crate::node::Inline::Node(atom) = item {
                    if atom.id() == id {
                        found = Some((node.id(), offset));
                        return;
                    }
                }
                offset += item.len();
            }
        });
        found
    }

    /// Every node in document order, root first.
    pub fn descendants(&self) -> Vec<&Node> {
        let mut nodes = Vec::new();
        self.root.walk(&mut |n| nodes.push(n));
        nodes
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&Node> {
        let mut nodes = Vec::new();
        self.root.walk(&mut |n| {
            if n.kind() == kind {
                nodes.push(n);
            }
        });
        nodes
    }

    /// First textblock in document order.
    pub fn first_textblock(&self) -> Option<&Node> {
        let mut found = None;
        self.root.walk(&mut |n| {
            if found.is_none() && n.kind().is_textblock() {
                found = Some(n);
            }
        });
        found
    }

    /// First textblock after `id`'s subtree in document order.
    pub fn textblock_after(&self, id: NodeId) -> Option<&Node> {
        let inside: Vec<NodeId> = self.node(id)?.ids();
        let mut passed = false;
        let mut found = None;
        self.root.walk(&mut |n| {
            if found.is_some() {
                return;
            }
            if inside.contains(&n.id()) {
                passed = true;
            } else if passed && n.kind().is_textblock() {
                found = Some(n);
            }
        });
        found
    }

    /// Allocate ids for the unassigned nodes of a subtree about to be inserted.
    pub(crate) fn adopt(&mut self, node: &mut Node) -> Result<(), TreeError> {
        let mut clash = None;
        node.walk(&mut |n| {
            if clash.is_none() && n.id().is_assigned() && self.root.find(n.id()).is_some() {
                clash = Some(n.id());
            }
        });
        if let Some(id) = clash {
            return Err(TreeError::DuplicateId(id));
        }
        let mut next = self.next_id;
        node.assign_ids(&mut || {
            let id = NodeId(next);
            next += 1;
            id
        });
        // Keep the counter ahead of ids restored by inverse steps.
        node.walk(&mut |n| next = next.max(n.id().0 + 1));
        self.next_id = next;
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let root = Node::deserialize(deserializer)?;
        Document::from_root(root).map_err(serde::de::Error::custom)
    }
}
