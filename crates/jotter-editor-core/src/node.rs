//! Node values: kind, attributes and content.
//!
//! A [`Node`] is plain data. Identity ([`NodeId`]) is assigned by the
//! [`Document`](crate::tree::Document) on insertion, is not persisted, and is
//! ignored by equality so that round-tripped trees compare equal.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::TreeError;
use crate::schema::{self, ContentRule, NodeKind};
use crate::types::NodeId;

/// Stand-in character for an inline atom when a textblock is read as a string.
pub const ATOM_CHAR: char = '\u{FFFC}';

/// Node attributes. Declared attributes are always present, filled with defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attrs(BTreeMap<SmolStr, String>);

impl Attrs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declared attributes of `kind` at their default values.
    pub fn defaults(kind: NodeKind) -> Self {
        Self(
            kind.spec()
                .attrs
                .iter()
                .map(|a| (SmolStr::new_static(a.name), a.default.to_string()))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Set an attribute, returning the previous value.
    pub fn set(&mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.into(), value.into())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<SmolStr>, V: Into<String>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Node content, shaped by the kind's [`ContentRule`].
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Content {
    #[default]
    Empty,
    /// Plain text, for code blocks.
    Text(String),
    /// Text runs and inline atoms, for textblocks.
    Inline(Vec<Inline>),
    /// Child blocks, for containers.
    Blocks(Vec<Node>),
}

/// One piece of a textblock's content.
#[derive(Clone, Debug, PartialEq)]
pub enum Inline {
    Text(String),
    /// An atomic inline node, counted as a single unit.
    Node(Node),
}

impl Inline {
    /// Length in inline units.
    pub fn len(&self) -> usize {
        match self {
            Inline::Text(text) => text.chars().count(),
            Inline::Node(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A document tree node.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "RawNode", try_from = "RawNode")]
pub struct Node {
    pub(crate) id: NodeId,
    kind: NodeKind,
    attrs: Attrs,
    content: Content,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.attrs == other.attrs && self.content == other.content
    }
}

impl Node {
    /// An empty node of `kind` with default attributes.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::UNASSIGNED,
            kind,
            attrs: Attrs::defaults(kind),
            content: kind.empty_content(),
        }
    }

    pub fn doc(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Doc).with_children(children)
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Paragraph).with_inline(vec![Inline::Text(text.into())])
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(NodeKind::Heading)
            .with_attr("level", level.to_string())
            .with_inline(vec![Inline::Text(text.into())])
    }

    pub fn bullet_list(items: Vec<Node>) -> Self {
        Self::new(NodeKind::BulletList).with_children(items)
    }

    pub fn list_item(children: Vec<Node>) -> Self {
        Self::new(NodeKind::ListItem).with_children(children)
    }

    /// A code block whose `code` attribute and text content are both `code`.
    pub fn code_block(language: impl Into<String>, code: impl Into<String>) -> Self {
        let code = code.into();
        let mut node = Self::new(NodeKind::CodeBlock).with_attr("language", language);
        node.attrs.set("code", code.clone());
        node.content = Content::Text(code);
        node
    }

    pub fn math_inline(tex: impl Into<String>) -> Self {
        Self::new(NodeKind::MathInline).with_attr("tex", tex)
    }

    pub fn math_block(tex: impl Into<String>) -> Self {
        Self::new(NodeKind::MathBlock).with_attr("tex", tex)
    }

    pub fn with_attr(mut self, name: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.content = Content::Blocks(children);
        self
    }

    pub fn with_inline(mut self, items: Vec<Inline>) -> Self {
        self.content = Content::Inline(normalize_inline(items));
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attrs(&self) -> &Attrs {
        &self.attrs
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name)
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Child blocks. Empty for anything that isn't a container.
    pub fn children(&self) -> &[Node] {
        match &self.content {
            Content::Blocks(children) => children,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.content {
            Content::Blocks(children) => Some(children),
            _ => None,
        }
    }

    /// Inline content. Empty for anything that isn't a textblock.
    pub fn inline(&self) -> &[Inline] {
        match &self.content {
            Content::Inline(items) => items,
            _ => &[],
        }
    }

    /// Plain text content of a code block.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Length of a textblock in inline units.
    pub fn inline_len(&self) -> usize {
        self.inline().iter().map(Inline::len).sum()
    }

    /// Textblock content as a string, atoms shown as [`ATOM_CHAR`].
    pub fn inline_text(&self) -> String {
        let mut out = String::new();
        for item in self.inline() {
            match item {
                Inline::Text(text) => out.push_str(text),
                Inline::Node(_) => out.push(ATOM_CHAR),
            }
        }
        out
    }

    /// Copy of the inline content in `range`.
    pub fn slice_inline(&self, range: Range<usize>) -> Vec<Inline> {
        let units = to_units(self.inline().to_vec());
        let end = range.end.min(units.len());
        let start = range.start.min(end);
        from_units(units[start..end].to_vec())
    }

    /// Depth-first search for `id`, this node included.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        match &self.content {
            Content::Blocks(children) => children.iter().find_map(|c| c.find(id)),
            Content::Inline(items) => items.iter().find_map(|item| match item {
                Inline::Node(atom) => atom.find(id),
                Inline::Text(_) => None,
            }),
            _ => None,
        }
    }

    pub(crate) fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        match &mut self.content {
            Content::Blocks(children) => children.iter_mut().find_map(|c| c.find_mut(id)),
            Content::Inline(items) => items.iter_mut().find_map(|item| match item {
                Inline::Node(atom) => atom.find_mut(id),
                Inline::Text(_) => None,
            }),
            _ => None,
        }
    }

    /// Visit this node and every descendant in document order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        match &self.content {
            Content::Blocks(children) => children.iter().for_each(|c| c.walk(f)),
            Content::Inline(items) => {
                for item in items {
                    if let Inline::Node(atom) = item {
                        atom.walk(f);
                    }
                }
            }
            _ => {}
        }
    }

    /// Ids of this node and all descendants.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.walk(&mut |n| ids.push(n.id));
        ids
    }

    /// First textblock at or below this node.
    pub fn first_textblock(&self) -> Option<&Node> {
        if self.kind.is_textblock() {
            return Some(self);
        }
        self.children().iter().find_map(Node::first_textblock)
    }

    /// Last textblock at or below this node.
    pub fn last_textblock(&self) -> Option<&Node> {
        if self.kind.is_textblock() {
            return Some(self);
        }
        self.children().iter().rev().find_map(Node::last_textblock)
    }

    /// Give every unassigned node in this subtree a fresh id.
    pub(crate) fn assign_ids(&mut self, next: &mut impl FnMut() -> NodeId) {
        if !self.id.is_assigned() {
            self.id = next();
        }
        match &mut self.content {
            Content::Blocks(children) => children.iter_mut().for_each(|c| c.assign_ids(next)),
            Content::Inline(items) => {
                for item in items {
                    if let Inline::Node(atom) = item {
                        atom.assign_ids(next);
                    }
                }
            }
            _ => {}
        }
    }

    /// Copy with every id in the subtree cleared.
    pub fn detached(&self) -> Node {
        let mut node = self.clone();
        node.clear_ids();
        node
    }

    fn clear_ids(&mut self) {
        self.id = NodeId::UNASSIGNED;
        match &mut self.content {
            Content::Blocks(children) => children.iter_mut().for_each(Node::clear_ids),
            Content::Inline(items) => {
                for item in items {
                    if let Inline::Node(atom) = item {
                        atom.clear_ids();
                    }
                }
            }
            _ => {}
        }
    }

    pub(crate) fn set_attr_raw(&mut self, name: SmolStr, value: String) -> Option<String> {
        self.attrs.set(name, value)
    }

    pub(crate) fn set_kind_raw(&mut self, kind: NodeKind, attrs: Attrs) -> (NodeKind, Attrs) {
        let old_kind = std::mem::replace(&mut self.kind, kind);
        let old_attrs = std::mem::replace(&mut self.attrs, attrs);
        (old_kind, old_attrs)
    }

    /// Replace the text content of a code block, returning the old text.
    pub(crate) fn set_text_raw(&mut self, text: String) -> Result<String, TreeError> {
        match &mut self.content {
            Content::Text(old) => Ok(std::mem::replace(old, text)),
            _ if self.kind.content_rule() == ContentRule::Text => {
                self.content = Content::Text(text);
                Ok(String::new())
            }
            _ => Err(TreeError::NotTextBearing(self.id)),
        }
    }

    /// Splice inline content, returning what was removed.
    pub(crate) fn replace_inline_raw(
        &mut self,
        range: Range<usize>,
        with: Vec<Inline>,
    ) -> Result<Vec<Inline>, TreeError> {
        if !self.kind.is_textblock() {
            return Err(TreeError::NotATextblock(self.id));
        }
        let items = match std::mem::take(&mut self.content) {
            Content::Inline(items) => items,
            _ => Vec::new(),
        };
        let mut units = to_units(items);
        if range.start > range.end || range.end > units.len() {
            let len = units.len();
            self.content = Content::Inline(from_units(units));
            return Err(TreeError::OutOfBounds {
                node: self.id,
                start: range.start,
                end: range.end,
                len,
            });
        }
        let removed: Vec<Unit> = units.splice(range, to_units(with)).collect();
        self.content = Content::Inline(from_units(units));
        Ok(from_units(removed))
    }
}

#[derive(Clone)]
enum Unit {
    Char(char),
    Atom(Node),
}

fn to_units(items: Vec<Inline>) -> Vec<Unit> {
    let mut units = Vec::new();
    for item in items {
        match item {
            Inline::Text(text) => units.extend(text.chars().map(Unit::Char)),
            Inline::Node(atom) => units.push(Unit::Atom(atom)),
        }
    }
    units
}

fn from_units(units: Vec<Unit>) -> Vec<Inline> {
    let mut items = Vec::new();
    let mut run = String::new();
    for unit in units {
        match unit {
            Unit::Char(c) => run.push(c),
            Unit::Atom(atom) => {
                if !run.is_empty() {
                    items.push(Inline::Text(std::mem::take(&mut run)));
                }
                items.push(Inline::Node(atom));
            }
        }
    }
    if !run.is_empty() {
        items.push(Inline::Text(run));
    }
    items
}

/// Merge adjacent text runs and drop empty ones.
pub fn normalize_inline(items: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Inline::Text(text) if text.is_empty() => {}
            Inline::Text(text) => match out.last_mut() {
                Some(Inline::Text(prev)) => prev.push_str(&text),
                _ => out.push(Inline::Text(text)),
            },
            atom => out.push(atom),
        }
    }
    out
}

// === Persisted shape ===

/// On-disk node: `{"type": .., "attrs": {..}, "text": .., "content": [..]}`.
#[doc(hidden)]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    content: Vec<RawItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum RawItem {
    Node(RawNode),
    Text { text: String },
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let attrs = node
            .attrs
            .0
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let (text, content) = match node.content {
            Content::Empty => (None, Vec::new()),
            Content::Text(text) => (Some(text), Vec::new()),
            Content::Inline(items) => (
                None,
                items
                    .into_iter()
                    .map(|item| match item {
                        Inline::Text(text) => RawItem::Text { text },
                        Inline::Node(atom) => RawItem::Node(atom.into()),
                    })
                    .collect(),
            ),
            Content::Blocks(children) => (
                None,
                children
                    .into_iter()
                    .map(|c| RawItem::Node(c.into()))
                    .collect(),
            ),
        };
        RawNode {
            kind: node.kind,
            attrs,
            text,
            content,
        }
    }
}

impl TryFrom<RawNode> for Node {
    type Error = TreeError;

    fn try_from(raw: RawNode) -> Result<Self, TreeError> {
        let kind = raw.kind;
        let mut node = Node::new(kind);
        for (name, value) in raw.attrs {
            schema::check_attr(kind, &name, &value)?;
            node.attrs.set(name, value);
        }

        let mismatch = || TreeError::ContentMismatch {
            kind: kind.name(),
            expected: match kind.content_rule() {
                ContentRule::Inline => "inline",
                ContentRule::Text => "plain text",
                ContentRule::Atomic => "no",
                _ => "block",
            },
        };

        match kind.content_rule() {
            ContentRule::Blocks | ContentRule::ListItems => {
                let mut children = Vec::with_capacity(raw.content.len());
                for item in raw.content {
                    match item {
                        RawItem::Node(child) => children.push(Node::try_from(child)?),
                        RawItem::Text { .. } => return Err(mismatch()),
                    }
                }
                node.content = Content::Blocks(children);
            }
            ContentRule::Inline => {
                let mut items = Vec::with_capacity(raw.content.len());
                for item in raw.content {
                    match item {
                        RawItem::Text { text } => items.push(Inline::Text(text)),
                        RawItem::Node(atom) => items.push(Inline::Node(Node::try_from(atom)?)),
                    }
                }
                node.content = Content::Inline(normalize_inline(items));
            }
            ContentRule::Text => {
                // The attribute is the record; text content mirrors it. Legacy
                // documents carried only the text.
                let text = raw.text.unwrap_or_default();
                let code = node.attrs.get("code").map(str::to_string);
                match code {
                    Some(code) if !code.is_empty() || text.is_empty() => {
                        node.content = Content::Text(code);
                    }
                    _ => {
                        node.attrs.set("code", text.clone());
                        node.content = Content::Text(text);
                    }
                }
            }
            ContentRule::Atomic => {
                if !raw.content.is_empty() {
                    return Err(mismatch());
                }
                if let Some(legacy) = raw.text {
                    if node.attr("tex").is_none_or(str::is_empty) {
                        node.attrs.set("tex", legacy);
                    }
                }
            }
        }

        schema::check(&node)?;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn para_with_math() -> Node {
        Node::new(NodeKind::Paragraph).with_inline(vec![
            Inline::Text("a ".into()),
            Inline::Node(Node::math_inline("x^2")),
            Inline::Text(" b".into()),
        ])
    }

    #[test]
    fn inline_units_count_atoms_once() {
        let p = para_with_math();
        assert_eq!(p.inline_len(), 5);
        assert_eq!(p.inline_text(), "a \u{FFFC} b");
    }

    #[test]
    fn replace_inline_splices_and_merges() {
        let mut p = Node::paragraph("hello world");
        let removed = p.replace_inline_raw(5..11, vec![Inline::Text("!".into())]).unwrap();
        assert_eq!(removed, vec![Inline::Text(" world".into())]);
        assert_eq!(p.inline(), &[Inline::Text("hello!".into())]);
    }

    #[test]
    fn replace_inline_can_remove_atoms() {
        let mut p = para_with_math();
        let removed = p.replace_inline_raw(2..3, vec![]).unwrap();
        assert!(matches!(&removed[..], [Inline::Node(n)] if n.kind() == NodeKind::MathInline));
        assert_eq!(p.inline(), &[Inline::Text("a  b".into())]);
    }

    #[test]
    fn replace_inline_out_of_bounds_leaves_content() {
        let mut p = Node::paragraph("abc");
        let err = p.replace_inline_raw(2..9, vec![]).unwrap_err();
        assert!(matches!(err, TreeError::OutOfBounds { len: 3, .. }));
        assert_eq!(p.inline_text(), "abc");
    }

    #[test]
    fn code_block_mirrors_code() {
        let code = Node::code_block("rust", "fn main() {}");
        assert_eq!(code.attr("language"), Some("rust"));
        assert_eq!(code.attr("code"), Some("fn main() {}"));
        assert_eq!(code.text(), Some("fn main() {}"));
    }

    #[test]
    fn equality_ignores_ids() {
        let mut a = Node::paragraph("x");
        let b = Node::paragraph("x");
        a.id = NodeId(42);
        assert_eq!(a, b);
    }

    #[test]
    fn persisted_shape() {
        let doc = Node::doc(vec![para_with_math(), Node::code_block("rust", "let x = 1;")]);
        let json = serde_json::to_value(&doc).unwrap();
        insta::assert_json_snapshot!(json, @r###"
        {
          "type": "doc",
          "content": [
            {
              "type": "paragraph",
              "content": [
                {
                  "text": "a "
                },
                {
                  "type": "math_inline",
                  "attrs": {
                    "tex": "x^2"
                  }
                },
                {
                  "text": " b"
                }
              ]
            },
            {
              "type": "code_block",
              "attrs": {
                "code": "let x = 1;",
                "language": "rust"
              },
              "text": "let x = 1;"
            }
          ]
        }
        "###);
    }

    #[test]
    fn legacy_code_block_text_fills_attr() {
        let node: Node = serde_json::from_str(
            r#"{"type":"code_block","attrs":{"language":"go"},"text":"func main() {}"}"#,
        )
        .unwrap();
        assert_eq!(node.attr("code"), Some("func main() {}"));
        assert_eq!(node.attr("language"), Some("go"));
    }

    #[test]
    fn code_attr_wins_over_stale_text() {
        let node: Node = serde_json::from_str(
            r#"{"type":"code_block","attrs":{"code":"new"},"text":"old"}"#,
        )
        .unwrap();
        assert_eq!(node.text(), Some("new"));
        assert_eq!(node.attr("language"), Some("plaintext"));
    }

    #[test]
    fn legacy_math_text_becomes_tex() {
        let node: Node =
            serde_json::from_str(r#"{"type":"math_block","text":"\\sum_i x_i"}"#).unwrap();
        assert_eq!(node.attr("tex"), Some(r"\sum_i x_i"));
    }

    #[test]
    fn rejects_unknown_attrs() {
        let err = serde_json::from_str::<Node>(r#"{"type":"paragraph","attrs":{"level":"2"}}"#);
        assert!(err.is_err());
    }
}
