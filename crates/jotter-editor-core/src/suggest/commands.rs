//! The stock command set.

use crate::node::{Attrs, Node};
use crate::schema::NodeKind;

use super::catalog::{Catalog, CommandContext};
use crate::error::CommandError;

pub const SAMPLE_INLINE_TEX: &str = "a^2 + b^2 = c^2";
pub const SAMPLE_BLOCK_TEX: &str = r"\int_a^b f(x)\,dx";

/// Block types, code, math and journaling templates.
pub fn default_catalog() -> Catalog {
    Catalog::builder()
        .category("Basic blocks")
        .command("Paragraph", ["text", "plain", "p"], |cx| {
            cx.set_block_kind(NodeKind::Paragraph, Attrs::new())
        })
        .command("Heading 1", ["h1", "title"], |cx| cx.set_heading(1))
        .command("Heading 2", ["h2", "subtitle"], |cx| cx.set_heading(2))
        .command("Heading 3", ["h3", "section"], |cx| cx.set_heading(3))
        .command("Bullet list", ["ul", "unordered", "list", "-"], bullet_list)
        .category("Code")
        .command("Code block", ["code", "snippet", "pre", "```"], |cx| {
            let language = cx.default_code_language().to_string();
            cx.insert_blocks(vec![Node::code_block(language, "")])
        })
        .category("Math")
        .command("Inline math", ["formula", "latex", "tex", "$$"], |cx| {
            cx.insert_inline(Node::math_inline(SAMPLE_INLINE_TEX))
        })
        .command("Math block", ["equation", "display", "latex", "$$$"], |cx| {
            cx.insert_blocks(vec![Node::math_block(SAMPLE_BLOCK_TEX)])
        })
        .category("Templates")
        .command("Daily reflection", ["journal", "today", "prompt"], |cx| {
            cx.insert_blocks(daily_reflection())
        })
        .command("Gratitude list", ["thanks", "grateful", "journal"], |cx| {
            cx.insert_blocks(gratitude_list())
        })
        .build()
}

/// Wrap the block's remaining content in a single-item bullet list.
fn bullet_list(cx: &mut CommandContext<'_>) -> Result<(), CommandError> {
    if cx.block().kind() != NodeKind::Paragraph {
        return Err(CommandError::NotApplicable {
            title: "Bullet list".into(),
            reason: format!("cannot wrap a {}", cx.block().kind().name()),
        });
    }
    let paragraph = Node::new(NodeKind::Paragraph).with_inline(cx.remaining_inline());
    cx.replace_block(Node::bullet_list(vec![Node::list_item(vec![paragraph])]));
    Ok(())
}

fn daily_reflection() -> Vec<Node> {
    vec![
        Node::heading(2, "Daily reflection"),
        Node::heading(3, "What went well today?"),
        Node::paragraph(""),
        Node::heading(3, "What could have gone better?"),
        Node::paragraph(""),
        Node::heading(3, "What am I looking forward to tomorrow?"),
        Node::paragraph(""),
    ]
}

fn gratitude_list() -> Vec<Node> {
    let item = || Node::list_item(vec![Node::paragraph("")]);
    vec![
        Node::heading(2, "Gratitude"),
        Node::paragraph("Three things I'm grateful for today:"),
        Node::bullet_list(vec![item(), item(), item()]),
    ]
}
