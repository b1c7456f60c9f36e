//! HTML export and the DOM parse rules that read it back.
//!
//! Code and math nodes carry their source in `data-*` attributes so a
//! round-trip never depends on rendered output:
//!
//! - `<pre data-type="code-block" data-language=".." data-code="..">`
//! - `<span data-type="math-inline" data-tex="..">`
//! - `<div data-type="math-block" data-tex="..">`

use html_escape::{encode_double_quoted_attribute, encode_text};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use jotter_renderer::code_pretty::{highlight_spans, syntax_set};
use jotter_renderer::render_math;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use crate::error::TreeError;
use crate::node::{Inline, Node, normalize_inline};
use crate::schema::{DEFAULT_CODE_LANGUAGE, NodeKind};
use crate::tree::Document;

/// Export switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HtmlOptions {
    /// Syntax-highlight code bodies. Off leaves them as escaped text.
    pub highlight_code: bool,
    /// Typeset math. Off leaves the escaped source.
    pub render_math: bool,
}

impl HtmlOptions {
    /// Everything on, for read-only pages.
    pub fn rendered() -> Self {
        Self {
            highlight_code: true,
            render_math: true,
        }
    }
}

pub fn to_html(doc: &Document, options: &HtmlOptions) -> String {
    let mut out = String::new();
    for (i, block) in doc.blocks().iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_block(block, options, &mut out);
    }
    out
}

fn write_block(node: &Node, options: &HtmlOptions, out: &mut String) {
    match node.kind() {
        NodeKind::Paragraph => {
            out.push_str("<p>");
            write_inline(node, options, out);
            out.push_str("</p>");
        }
        NodeKind::Heading => {
            let level = node.attr("level").unwrap_or("1");
            out.push_str(&format!("<h{level}>"));
            write_inline(node, options, out);
            out.push_str(&format!("</h{level}>"));
        }
        NodeKind::BulletList => {
            out.push_str("<ul>");
            for item in node.children() {
                write_block(item, options, out);
            }
            out.push_str("</ul>");
        }
        NodeKind::ListItem => {
            out.push_str("<li>");
            for child in node.children() {
                write_block(child, options, out);
            }
            out.push_str("</li>");
        }
        NodeKind::CodeBlock => write_code(node, options, out),
        NodeKind::MathBlock => {
            let tex = node.attr("tex").unwrap_or_default();
            out.push_str(&format!(
                "<div data-type=\"math-block\" data-tex=\"{}\">",
                encode_double_quoted_attribute(tex)
            ));
            write_math(tex, true, options, out);
            out.push_str("</div>");
        }
        NodeKind::MathInline | NodeKind::Doc => {
            tracing::warn!(target: "jotter::tree", kind = node.kind().name(), "not a block, skipped in export");
        }
    }
}

fn write_code(node: &Node, options: &HtmlOptions, out: &mut String) {
    let language = node.attr("language").unwrap_or(DEFAULT_CODE_LANGUAGE);
    let code = node.attr("code").unwrap_or_default();
    let language_attr = encode_double_quoted_attribute(language);
    out.push_str(&format!(
        "<pre data-type=\"code-block\" data-language=\"{language_attr}\" data-code=\"{}\"><code class=\"language-{language_attr}\">",
        encode_double_quoted_attribute(code)
    ));
    let highlighted = options
        .highlight_code
        .then(|| highlight_spans(syntax_set(), Some(language), code))
        .and_then(|result| {
            result
                .inspect_err(|error| {
                    tracing::warn!(target: "jotter::tree", node = %node.id(), %error, "highlighting failed, exporting plain code");
                })
                .ok()
        });
    match highlighted {
        Some(spans) => out.push_str(&spans),
        None => out.push_str(&encode_text(code)),
    }
    out.push_str("</code></pre>");
}

fn write_inline(node: &Node, options: &HtmlOptions, out: &mut String) {
    for item in node.inline() {
        match item {
            Inline::Text(text) => out.push_str(&encode_text(text)),
            Inline::Node(atom) => {
                let tex = atom.attr("tex").unwrap_or_default();
                out.push_str(&format!(
                    "<span data-type=\"math-inline\" data-tex=\"{}\">",
                    encode_double_quoted_attribute(tex)
                ));
                write_math(tex, false, options, out);
                out.push_str("</span>");
            }
        }
    }
}

fn write_math(tex: &str, display: bool, options: &HtmlOptions, out: &mut String) {
    if options.render_math {
        out.push_str(render_math(tex, display).html());
    } else {
        out.push_str(&encode_text(tex));
    }
}

// === Parse rules ===

/// Rebuild a document from HTML.
///
/// Paragraphs, `h1`-`h6`, `ul`/`ol` lists, code and math nodes are kept;
/// other containers are flattened into their children and inline markup is
/// reduced to its text. Loose inline content becomes a paragraph.
pub fn from_html(html: &str) -> Result<Document, TreeError> {
    let dom = parse_document(RcDom::default(), Default::default()).one(html);
    let blocks = match find_element(&dom.document, "body") {
        Some(body) => blocks_from(&body.children.borrow()),
        None => Vec::new(),
    };
    if blocks.is_empty() {
        return Ok(Document::empty());
    }
    Document::new(blocks)
}

fn blocks_from(children: &[Handle]) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut loose: Vec<Inline> = Vec::new();

    for child in children {
        let Some(tag) = tag_name(child) else {
            if let NodeData::Text { contents } = &child.data {
                loose.push(Inline::Text(contents.borrow().to_string()));
            }
            continue;
        };
        let block = match tag.as_str() {
            "p" => Some(Node::new(NodeKind::Paragraph).with_inline(inline_from(&child.children.borrow()))),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<u8>().unwrap_or(1);
                Some(
                    Node::new(NodeKind::Heading)
                        .with_attr("level", level.to_string())
                        .with_inline(inline_from(&child.children.borrow())),
                )
            }
            "ul" | "ol" => Some(list_from(child)),
            "pre" => Some(code_from(child)),
            _ if data_type(child).as_deref() == Some("math-block") => {
                Some(Node::math_block(tex_from(child)))
            }
            _ if data_type(child).as_deref() == Some("math-inline") => {
                loose.push(Inline::Node(Node::math_inline(tex_from(child))));
                None
            }
            "br" => {
                loose.push(Inline::Text("\n".into()));
                None
            }
            "div" | "section" | "article" | "blockquote" | "main" | "header" | "footer" | "li" => {
                flush(&mut loose, &mut blocks);
                blocks.extend(blocks_from(&child.children.borrow()));
                None
            }
            "script" | "style" | "template" => None,
            _ => {
                loose.extend(inline_from(&child.children.borrow()));
                None
            }
        };
        if let Some(block) = block {
            flush(&mut loose, &mut blocks);
            blocks.push(block);
        }
    }
    flush(&mut loose, &mut blocks);
    blocks
}

/// Turn pending loose inline content into a paragraph, unless it's only whitespace.
fn flush(loose: &mut Vec<Inline>, blocks: &mut Vec<Node>) {
    let items = normalize_inline(std::mem::take(loose));
    let blank = items.iter().all(|item| match item {
        Inline::Text(text) => text.trim().is_empty(),
        Inline::Node(_) => false,
    });
    if !blank {
        blocks.push(Node::new(NodeKind::Paragraph).with_inline(items));
    }
}

fn inline_from(children: &[Handle]) -> Vec<Inline> {
    let mut items = Vec::new();
    for child in children {
        match &child.data {
            NodeData::Text { contents } => items.push(Inline::Text(contents.borrow().to_string())),
            NodeData::Element { .. } => {
                if data_type(child).as_deref() == Some("math-inline") {
                    items.push(Inline::Node(Node::math_inline(tex_from(child))));
                } else if tag_name(child).as_deref() == Some("br") {
                    items.push(Inline::Text("\n".into()));
                } else {
                    items.extend(inline_from(&child.children.borrow()));
                }
            }
            _ => {}
        }
    }
    normalize_inline(items)
}

fn list_from(list: &Handle) -> Node {
    let items = list
        .children
        .borrow()
        .iter()
        .filter(|child| tag_name(child).as_deref() == Some("li"))
        .map(|li| {
            let mut blocks = blocks_from(&li.children.borrow());
            if blocks.is_empty() {
                blocks.push(Node::new(NodeKind::Paragraph));
            }
            Node::list_item(blocks)
        })
        .collect();
    Node::bullet_list(items)
}

/// `data-language`/`data-code` first, then `<code class="language-x">` and the element text.
fn code_from(pre: &Handle) -> Node {
    let code_child = pre
        .children
        .borrow()
        .iter()
        .find(|child| tag_name(child).as_deref() == Some("code"))
        .cloned();
    let language = attr(pre, "data-language")
        .filter(|l| !l.is_empty())
        .or_else(|| {
            code_child
                .as_ref()
                .and_then(|code| attr(code, "class"))
                .and_then(|class| {
                    class
                        .split_whitespace()
                        .find_map(|c| c.strip_prefix("language-").map(str::to_string))
                })
        })
        .unwrap_or_else(|| DEFAULT_CODE_LANGUAGE.to_string());
    let code = attr(pre, "data-code").unwrap_or_else(|| text_content(pre));
    Node::code_block(language, code)
}

/// `data-tex`, or the element text for legacy markup.
fn tex_from(element: &Handle) -> String {
    attr(element, "data-tex")
        .filter(|tex| !tex.is_empty())
        .unwrap_or_else(|| text_content(element).trim().to_string())
}

fn find_element(handle: &Handle, name: &str) -> Option<Handle> {
    if tag_name(handle).as_deref() == Some(name) {
        return Some(handle.clone());
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, name))
}

fn tag_name(handle: &Handle) -> Option<String> {
    match &handle.data {
        NodeData::Element { name, .. } => Some(name.local.to_string()),
        _ => None,
    }
}

fn attr(handle: &Handle, name: &str) -> Option<String> {
    let NodeData::Element { attrs, .. } = &handle.data else {
        return None;
    };
    attrs
        .borrow()
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

fn data_type(handle: &Handle) -> Option<String> {
    attr(handle, "data-type")
}

fn text_content(handle: &Handle) -> String {
    let mut out = String::new();
    collect_text(handle, &mut out);
    out
}

fn collect_text(handle: &Handle, out: &mut String) {
    if let NodeData::Text { contents } = &handle.data {
        out.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::new(vec![
            Node::heading(1, "Tuesday"),
            Node::new(NodeKind::Paragraph).with_inline(vec![
                Inline::Text("Energy: ".into()),
                Inline::Node(Node::math_inline("E = mc^2")),
                Inline::Text(" & more".into()),
            ]),
            Node::bullet_list(vec![
                Node::list_item(vec![Node::paragraph("walk")]),
                Node::list_item(vec![Node::paragraph("read")]),
            ]),
            Node::code_block("python", "if a and b:\n    print(a)\n"),
            Node::math_block(r"\frac{1}{2}"),
        ])
        .unwrap()
    }

    #[test]
    fn export_markup() {
        insta::assert_snapshot!(to_html(&sample(), &HtmlOptions::default()), @r#"
        <h1>Tuesday</h1>
        <p>Energy: <span data-type="math-inline" data-tex="E = mc^2">E = mc^2</span> &amp; more</p>
        <ul><li><p>walk</p></li><li><p>read</p></li></ul>
        <pre data-type="code-block" data-language="python" data-code="if a and b:
            print(a)
        "><code class="language-python">if a and b:
            print(a)
        </code></pre>
        <div data-type="math-block" data-tex="\frac{1}{2}">\frac{1}{2}</div>
        "#);
    }

    #[test]
    fn round_trips_plain_export() {
        let doc = sample();
        let back = from_html(&to_html(&doc, &HtmlOptions::default())).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn round_trips_rendered_export() {
        let doc = sample();
        let html = to_html(&doc, &HtmlOptions::rendered());
        assert!(html.contains("jt-"));
        assert!(html.contains("<math"));
        let back = from_html(&html).unwrap();
        let code = back.nodes_of_kind(NodeKind::CodeBlock)[0];
        assert_eq!(code.attr("language"), Some("python"));
        assert_eq!(code.attr("code"), Some("if a and b:\n    print(a)\n"));
        assert_eq!(code.text(), code.attr("code"));
        let math = back.nodes_of_kind(NodeKind::MathBlock)[0];
        assert_eq!(math.attr("tex"), Some(r"\frac{1}{2}"));
    }

    #[test]
    fn parses_foreign_markup() {
        let doc = from_html(
            "<div><h3>Notes</h3>loose <em>text</em></div>\
             <pre><code class=\"hljs language-rust\">let x = 1;</code></pre>\
             <p>inline <span data-type=\"math-inline\">x^2</span></p>\
             <div data-type=\"math-block\"> y </div>",
        )
        .unwrap();
        let blocks = doc.blocks();
        assert_eq!(blocks.len(), 5);
        assert_eq!(blocks[0].attr("level"), Some("3"));
        assert_eq!(blocks[1].inline_text(), "loose text");
        assert_eq!(blocks[2].attr("language"), Some("rust"));
        assert_eq!(blocks[2].attr("code"), Some("let x = 1;"));
        let atom = doc.nodes_of_kind(NodeKind::MathInline)[0];
        assert_eq!(atom.attr("tex"), Some("x^2"));
        assert_eq!(blocks[4].attr("tex"), Some("y"));
    }

    #[test]
    fn empty_input_gives_an_empty_document() {
        assert_eq!(from_html("").unwrap(), Document::empty());
        assert_eq!(from_html("<p>   </p>").unwrap().blocks().len(), 1);
    }
}
