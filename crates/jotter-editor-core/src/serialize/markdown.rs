//! Plain markdown export.
//!
//! Math uses the editor's own delimiters, `$$tex$$` inline and `$$$tex$$$`
//! for blocks, so pasting the output back in re-runs the input rules.
//! Empty paragraphs are dropped.

use crate::node::{Inline, Node};
use crate::schema::{DEFAULT_CODE_LANGUAGE, NodeKind};
use crate::tree::Document;

pub fn to_markdown(doc: &Document) -> String {
    join_blocks(doc.blocks(), "\n\n")
}

fn join_blocks(blocks: &[Node], sep: &str) -> String {
    blocks
        .iter()
        .filter_map(block_markdown)
        .collect::<Vec<_>>()
        .join(sep)
}

fn block_markdown(node: &Node) -> Option<String> {
    match node.kind() {
        NodeKind::Paragraph => {
            let text = inline_markdown(node);
            (!text.is_empty()).then_some(text)
        }
        NodeKind::Heading => {
            let level = node
                .attr("level")
                .and_then(|l| l.parse::<usize>().ok())
                .unwrap_or(1);
            Some(format!("{} {}", "#".repeat(level), inline_markdown(node)))
        }
        NodeKind::BulletList => {
            let items: Vec<String> = node.children().iter().map(list_item).collect();
            Some(items.join("\n"))
        }
        NodeKind::ListItem => Some(list_item(node)),
        NodeKind::CodeBlock => Some(code_fence(
            node.attr("language").unwrap_or(DEFAULT_CODE_LANGUAGE),
            node.attr("code").unwrap_or_default(),
        )),
        NodeKind::MathBlock => Some(format!("$$${}$$$", node.attr("tex").unwrap_or_default())),
        NodeKind::MathInline | NodeKind::Doc => None,
    }
}

/// `- ` before the first line, two-space continuation for the rest.
fn list_item(item: &Node) -> String {
    let body = join_blocks(item.children(), "\n");
    let mut out = String::from("-");
    for (i, line) in body.lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str("  ");
            }
        } else if !line.is_empty() {
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

fn inline_markdown(node: &Node) -> String {
    let mut out = String::new();
    for item in node.inline() {
        match item {
            Inline::Text(text) => out.push_str(text),
            Inline::Node(atom) => {
                out.push_str("$$");
                out.push_str(atom.attr("tex").unwrap_or_default());
                out.push_str("$$");
            }
        }
    }
    out
}

/// The fence is one backtick longer than any run inside the code, and never shorter than three.
fn code_fence(language: &str, code: &str) -> String {
    let longest = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest + 1).max(3));
    let mut out = format!("{fence}{language}\n{code}");
    if !code.is_empty() && !code.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_page() {
        let doc = Document::new(vec![
            Node::heading(2, "Gratitude"),
            Node::paragraph(""),
            Node::new(NodeKind::Paragraph).with_inline(vec![
                Inline::Text("Area is ".into()),
                Inline::Node(Node::math_inline(r"\pi r^2")),
            ]),
            Node::bullet_list(vec![
                Node::list_item(vec![Node::paragraph("sunshine")]),
                Node::list_item(vec![
                    Node::paragraph("friends"),
                    Node::bullet_list(vec![Node::list_item(vec![Node::paragraph("old")])]),
                ]),
            ]),
            Node::code_block("rust", "let x = 1;"),
            Node::math_block("e^{i\\pi} + 1 = 0"),
        ])
        .unwrap();
        insta::assert_snapshot!(to_markdown(&doc), @r#"
        ## Gratitude

        Area is $$\pi r^2$$

        - sunshine
        - friends
          - old

        ```rust
        let x = 1;
        ```

        $$$e^{i\pi} + 1 = 0$$$
        "#);
    }

    #[test]
    fn fence_outgrows_backticks_in_code() {
        assert_eq!(code_fence("md", "```\nhi\n```\n"), "````md\n```\nhi\n```\n````");
        assert_eq!(code_fence("sh", "echo `date`"), "```sh\necho `date`\n```");
        assert_eq!(code_fence("plaintext", ""), "```plaintext\n```");
    }

    #[test]
    fn empty_list_item_keeps_its_marker() {
        let doc = Document::new(vec![Node::bullet_list(vec![
            Node::list_item(vec![Node::paragraph("")]),
            Node::list_item(vec![Node::paragraph("b")]),
        ])])
        .unwrap();
        assert_eq!(to_markdown(&doc), "-\n- b");
    }
}
