//! Node views for `math_inline` and `math_block`.
//!
//! A view caches the typeset output of its node and only re-typesets when the
//! node's `tex` changes, so unrelated transactions are cheap.

use std::collections::HashMap;

use html_escape::encode_double_quoted_attribute;
use jotter_renderer::{MathResult, render_math};

use crate::node::Node;
use crate::schema::NodeKind;
use crate::tree::Document;
use crate::types::NodeId;

/// Typeset output for one math node.
#[derive(Debug, Clone)]
pub struct MathView {
    node: NodeId,
    display: bool,
    tex: String,
    output: MathResult,
    renders: usize,
}

impl MathView {
    pub fn new(node: &Node) -> Self {
        let display = node.kind() == NodeKind::MathBlock;
        let tex = node.attr("tex").unwrap_or_default().to_string();
        let output = typeset(node.id(), &tex, display);
        Self {
            node: node.id(),
            display,
            tex,
            output,
            renders: 1,
        }
    }

    /// Re-typeset if the node's source changed. Returns whether it did.
    pub fn update(&mut self, node: &Node) -> bool {
        let display = node.kind() == NodeKind::MathBlock;
        let tex = node.attr("tex").unwrap_or_default();
        if tex == self.tex && display == self.display {
            return false;
        }
        self.tex = tex.to_string();
        self.display = display;
        self.output = typeset(self.node, &self.tex, display);
        self.renders += 1;
        true
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn tex(&self) -> &str {
        &self.tex
    }

    pub fn is_display(&self) -> bool {
        self.display
    }

    pub fn output(&self) -> &MathResult {
        &self.output
    }

    /// How many times this view has typeset.
    pub fn render_count(&self) -> usize {
        self.renders
    }

    /// HTML for the node-view slot.
    pub fn render(&self) -> String {
        let (tag, class) = if self.display {
            ("div", "math-node math-node-block")
        } else {
            ("span", "math-node math-node-inline")
        };
        format!(
            "<{tag} class=\"{class}\" data-node-id=\"{}\" data-tex=\"{}\">{}</{tag}>",
            self.node.get(),
            encode_double_quoted_attribute(&self.tex),
            self.output.html()
        )
    }
}

fn typeset(node: NodeId, tex: &str, display: bool) -> MathResult {
    let output = render_math(tex, display);
    if let MathResult::Error { message, .. } = &output {
        tracing::debug!(target: "jotter::math", %node, %message, "math fell back to source");
    }
    output
}

/// One [`MathView`] per math node in the document.
#[derive(Debug, Clone, Default)]
pub struct MathViews {
    views: HashMap<NodeId, MathView>,
}

impl MathViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&MathView> {
        self.views.get(&id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Reconcile with the document. Returns the ids that were (re)typeset.
    pub fn sync(&mut self, doc: &Document) -> Vec<NodeId> {
        let mut nodes = doc.nodes_of_kind(NodeKind::MathInline);
        nodes.extend(doc.nodes_of_kind(NodeKind::MathBlock));

        self.views
            .retain(|id, _| nodes.iter().any(|n| n.id() == *id));

        let mut rendered = Vec::new();
        for node in nodes {
            match self.views.get_mut(&node.id()) {
                Some(view) => {
                    if view.update(node) {
                        rendered.push(node.id());
                    }
                }
                None => {
                    self.views.insert(node.id(), MathView::new(node));
                    rendered.push(node.id());
                }
            }
        }
        rendered
    }

    pub fn clear(&mut self) {
        self.views.clear();
    }
}
