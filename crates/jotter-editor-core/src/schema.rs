//! Node schema: the fixed set of node kinds, their content rules and attributes.
//!
//! | kind          | content              | attrs                                   |
//! |---------------|----------------------|-----------------------------------------|
//! | `doc`         | blocks               |                                         |
//! | `paragraph`   | inline               |                                         |
//! | `heading`     | inline               | `level` (1-6)                           |
//! | `bullet_list` | `list_item` only     |                                         |
//! | `list_item`   | blocks               |                                         |
//! | `code_block`  | plain text           | `language` (`plaintext`), `code` (`""`) |
//! | `math_inline` | atomic, inline group | `tex`                                   |
//! | `math_block`  | atomic, block group  | `tex`                                   |

use serde::{Deserialize, Serialize};

use crate::error::TreeError;
use crate::node::{Content, Inline, Node};

/// Every node kind the editor knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    ListItem,
    CodeBlock,
    MathInline,
    MathBlock,
}

/// What a node may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentRule {
    /// Zero or more block-group nodes.
    Blocks,
    /// Only `list_item` children.
    ListItems,
    /// Text runs and inline atoms.
    Inline,
    /// A single plain text string, no marks, no children.
    Text,
    /// Nothing. The node is edited as a unit.
    Atomic,
}

impl ContentRule {
    fn describe(self) -> &'static str {
        match self {
            ContentRule::Blocks => "block",
            ContentRule::ListItems => "list item",
            ContentRule::Inline => "inline",
            ContentRule::Text => "plain text",
            ContentRule::Atomic => "no",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Group {
    Root,
    Block,
    /// Only valid inside a bullet list.
    ListItem,
    Inline,
}

/// Declared attribute with its default value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttrSpec {
    pub name: &'static str,
    pub default: &'static str,
}

/// Static description of one node kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub content: ContentRule,
    pub group: Group,
    pub attrs: &'static [AttrSpec],
}

/// Default language for new code blocks.
pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

const HEADING_ATTRS: &[AttrSpec] = &[AttrSpec {
    name: "level",
    default: "1",
}];

const CODE_ATTRS: &[AttrSpec] = &[
    AttrSpec {
        name: "language",
        default: DEFAULT_CODE_LANGUAGE,
    },
    AttrSpec {
        name: "code",
        default: "",
    },
];

const MATH_ATTRS: &[AttrSpec] = &[AttrSpec {
    name: "tex",
    default: "",
}];

static SPECS: [NodeSpec; 8] = [
    NodeSpec {
        kind: NodeKind::Doc,
        content: ContentRule::Blocks,
        group: Group::Root,
        attrs: &[],
    },
    NodeSpec {
        kind: NodeKind::Paragraph,
        content: ContentRule::Inline,
        group: Group::Block,
        attrs: &[],
    },
    NodeSpec {
        kind: NodeKind::Heading,
        content: ContentRule::Inline,
        group: Group::Block,
        attrs: HEADING_ATTRS,
    },
    NodeSpec {
        kind: NodeKind::BulletList,
        content: ContentRule::ListItems,
        group: Group::Block,
        attrs: &[],
    },
    NodeSpec {
        kind: NodeKind::ListItem,
        content: ContentRule::Blocks,
        group: Group::ListItem,
        attrs: &[],
    },
    NodeSpec {
        kind: NodeKind::CodeBlock,
        content: ContentRule::Text,
        group: Group::Block,
        attrs: CODE_ATTRS,
    },
    NodeSpec {
        kind: NodeKind::MathInline,
        content: ContentRule::Atomic,
        group: Group::Inline,
        attrs: MATH_ATTRS,
    },
    NodeSpec {
        kind: NodeKind::MathBlock,
        content: ContentRule::Atomic,
        group: Group::Block,
        attrs: MATH_ATTRS,
    },
];

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Doc,
        NodeKind::Paragraph,
        NodeKind::Heading,
        NodeKind::BulletList,
        NodeKind::ListItem,
        NodeKind::CodeBlock,
        NodeKind::MathInline,
        NodeKind::MathBlock,
    ];

    pub fn spec(self) -> &'static NodeSpec {
        &SPECS[self as usize]
    }

    /// Name used in the persisted format and in `data-type` attributes.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::BulletList => "bullet_list",
            NodeKind::ListItem => "list_item",
            NodeKind::CodeBlock => "code_block",
            NodeKind::MathInline => "math_inline",
            NodeKind::MathBlock => "math_block",
        }
    }

    pub fn content_rule(self) -> ContentRule {
        self.spec().content
    }

    /// Paragraphs and headings: blocks whose content is inline.
    pub fn is_textblock(self) -> bool {
        self.content_rule() == ContentRule::Inline
    }

    pub fn is_atom(self) -> bool {
        self.content_rule() == ContentRule::Atomic
    }

    pub fn is_inline(self) -> bool {
        self.spec().group == Group::Inline
    }

    /// Anything that sits in a block container, list items included.
    pub fn is_block(self) -> bool {
        matches!(self.spec().group, Group::Block | Group::ListItem)
    }

    /// Whether a node of kind `child` may appear directly inside this kind.
    pub fn allows_child(self, child: NodeKind) -> bool {
        match self.content_rule() {
            ContentRule::Blocks => child.spec().group == Group::Block,
            ContentRule::ListItems => child == NodeKind::ListItem,
            ContentRule::Inline => child.is_inline(),
            ContentRule::Text | ContentRule::Atomic => false,
        }
    }

    /// Default value for a declared attribute, `None` if the kind doesn't declare it.
    pub fn attr_default(self, name: &str) -> Option<&'static str> {
        self.spec()
            .attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.default)
    }

    /// Content an empty node of this kind starts with.
    pub fn empty_content(self) -> Content {
        match self.content_rule() {
            ContentRule::Blocks | ContentRule::ListItems => Content::Blocks(Vec::new()),
            ContentRule::Inline => Content::Inline(Vec::new()),
            ContentRule::Text => Content::Text(String::new()),
            ContentRule::Atomic => Content::Empty,
        }
    }
}

/// Check that an attribute value is acceptable for `kind`.
pub fn check_attr(kind: NodeKind, name: &str, value: &str) -> Result<(), TreeError> {
    let invalid = || TreeError::InvalidAttr {
        kind: kind.name(),
        name: name.to_string(),
        value: value.to_string(),
    };
    if kind.attr_default(name).is_none() {
        return Err(invalid());
    }
    if kind == NodeKind::Heading && name == "level" {
        match value.parse::<u8>() {
            Ok(1..=6) => {}
            _ => return Err(invalid()),
        }
    }
    Ok(())
}

/// Validate a node and everything below it against the schema.
pub fn check(node: &Node) -> Result<(), TreeError> {
    let kind = node.kind();
    for (name, value) in node.attrs().iter() {
        check_attr(kind, name, value)?;
    }

    let mismatch = || TreeError::ContentMismatch {
        kind: kind.name(),
        expected: kind.content_rule().describe(),
    };
    match (kind.content_rule(), node.content()) {
        (ContentRule::Blocks | ContentRule::ListItems, Content::Blocks(children)) => {
            for child in children {
                if !kind.allows_child(child.kind()) {
                    return Err(TreeError::InvalidChild {
                        parent: kind.name(),
                        child: child.kind().name(),
                    });
                }
                check(child)?;
            }
        }
        (ContentRule::Inline, Content::Inline(items)) => {
            for item in items {
                if let Inline::Node(atom) = item {
                    if !kind.allows_child(atom.kind()) {
                        return Err(TreeError::InvalidChild {
                            parent: kind.name(),
                            child: atom.kind().name(),
                        });
                    }
                    check(atom)?;
                }
            }
        }
        (ContentRule::Text, Content::Text(_)) | (ContentRule::Atomic, Content::Empty) => {}
        // An empty node of any non-atomic kind is fine too.
        (ContentRule::Blocks | ContentRule::ListItems | ContentRule::Inline, Content::Empty) => {}
        (ContentRule::Text, Content::Empty) => {}
        _ => return Err(mismatch()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_table_is_indexed_by_kind() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.spec().kind, kind);
        }
    }

    #[test]
    fn content_rules() {
        assert!(NodeKind::Doc.allows_child(NodeKind::CodeBlock));
        assert!(NodeKind::BulletList.allows_child(NodeKind::ListItem));
        assert!(!NodeKind::BulletList.allows_child(NodeKind::Paragraph));
        assert!(NodeKind::Paragraph.allows_child(NodeKind::MathInline));
        assert!(!NodeKind::Paragraph.allows_child(NodeKind::MathBlock));
        assert!(!NodeKind::Doc.allows_child(NodeKind::MathInline));
        assert!(!NodeKind::Doc.allows_child(NodeKind::ListItem));
        assert!(!NodeKind::CodeBlock.allows_child(NodeKind::Paragraph));
    }

    #[test]
    fn code_block_defaults() {
        assert_eq!(
            NodeKind::CodeBlock.attr_default("language"),
            Some(DEFAULT_CODE_LANGUAGE)
        );
        assert_eq!(NodeKind::CodeBlock.attr_default("code"), Some(""));
        assert_eq!(NodeKind::Paragraph.attr_default("code"), None);
    }

    #[test]
    fn heading_level_is_bounded() {
        assert!(check_attr(NodeKind::Heading, "level", "3").is_ok());
        assert!(check_attr(NodeKind::Heading, "level", "0").is_err());
        assert!(check_attr(NodeKind::Heading, "level", "7").is_err());
        assert!(check_attr(NodeKind::Heading, "level", "two").is_err());
        assert!(check_attr(NodeKind::Paragraph, "level", "1").is_err());
    }

    #[test]
    fn rejects_misplaced_children() {
        let list = Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("x")])]);
        assert!(check(&Node::doc(vec![list])).is_ok());

        let doc = Node::doc(vec![Node::list_item(vec![Node::paragraph("x")])]);
        assert!(check(&doc).is_err());

        let list = Node::bullet_list(vec![]).with_children(vec![Node::paragraph("x")]);
        assert_eq!(
            check(&list),
            Err(TreeError::InvalidChild {
                parent: "bullet_list",
                child: "paragraph",
            })
        );
    }
}
