//! The persisted document format.
//!
//! ```json
//! {"type": "doc", "content": [
//!   {"type": "code_block", "attrs": {"language": "rust", "code": "fn main() {}"}, "text": "fn main() {}"},
//!   {"type": "paragraph", "content": [{"text": "x = "}, {"type": "math_inline", "attrs": {"tex": "x^2"}}]}
//! ]}
//! ```
//!
//! Node ids are session-local and never persisted.

use crate::error::DocumentParseError;
use crate::node::{Node, RawNode};
use crate::tree::Document;

pub fn to_json(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string(doc)
}

pub fn to_json_pretty(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

pub fn to_value(doc: &Document) -> Result<serde_json::Value, serde_json::Error> {
    serde_json::to_value(doc)
}

/// Parse a persisted document.
pub fn from_json(src: &str) -> Result<Document, DocumentParseError> {
    from_json_named("document.json", src)
}

/// Parse a persisted document, naming the source in diagnostics.
pub fn from_json_named(name: &str, src: &str) -> Result<Document, DocumentParseError> {
    // Two stages so shape errors keep their location and schema errors keep their type.
    let raw: RawNode =
        serde_json::from_str(src).map_err(|err| DocumentParseError::from_json(&err, name, src))?;
    let root = Node::try_from(raw)?;
    let doc = Document::from_root(root)?;
    tracing::trace!(target: "jotter::tree", name, nodes = doc.descendants().len(), "document loaded");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreeError;
    use crate::node::Inline;
    use crate::schema::NodeKind;

    fn sample() -> Document {
        Document::new(vec![
            Node::heading(2, "Morning"),
            Node::new(NodeKind::Paragraph).with_inline(vec![
                Inline::Text("x = ".into()),
                Inline::Node(Node::math_inline("x^2")),
            ]),
            Node::code_block("rust", "fn main() {\n    println!(\"hi\");\n}"),
            Node::math_block(r"\sum_{i=0}^n i"),
        ])
        .unwrap()
    }

    #[test]
    fn persisted_shape() {
        insta::assert_json_snapshot!(sample(), @r#"
        {
          "type": "doc",
          "content": [
            {
              "type": "heading",
              "attrs": {
                "level": "2"
              },
              "content": [
                {
                  "text": "Morning"
                }
              ]
            },
            {
              "type": "paragraph",
              "content": [
                {
                  "text": "x = "
                },
                {
                  "type": "math_inline",
                  "attrs": {
                    "tex": "x^2"
                  }
                }
              ]
            },
            {
              "type": "code_block",
              "attrs": {
                "code": "fn main() {\n    println!(\"hi\");\n}",
                "language": "rust"
              },
              "text": "fn main() {\n    println!(\"hi\");\n}"
            },
            {
              "type": "math_block",
              "attrs": {
                "tex": "\\sum_{i=0}^n i"
              }
            }
          ]
        }
        "#);
    }

    #[test]
    fn code_and_math_survive_a_round_trip() {
        let doc = sample();
        let back = from_json(&to_json(&doc).unwrap()).unwrap();
        assert_eq!(back, doc);

        let code = back.nodes_of_kind(NodeKind::CodeBlock)[0];
        assert_eq!(code.attr("language"), Some("rust"));
        assert_eq!(code.attr("code"), code.text());
        let math = back.nodes_of_kind(NodeKind::MathBlock)[0];
        assert_eq!(math.attr("tex"), Some(r"\sum_{i=0}^n i"));
    }

    #[test]
    fn legacy_nodes_fill_attributes_from_text() {
        let doc = from_json(
            r#"{"type":"doc","content":[
                {"type":"code_block","attrs":{"language":"go"},"text":"package main"},
                {"type":"math_block","text":"e^x"}
            ]}"#,
        )
        .unwrap();
        let blocks = doc.blocks();
        assert_eq!(blocks[0].attr("code"), Some("package main"));
        assert_eq!(blocks[0].text(), Some("package main"));
        assert_eq!(blocks[1].attr("tex"), Some("e^x"));
    }

    #[test]
    fn malformed_json_points_at_the_problem() {
        let src = "{\"type\": \"doc\",\n \"content\": [}";
        let err = from_json(src).unwrap_err();
        let DocumentParseError::Json { location, .. } = &err else {
            panic!("expected a located error, got {err:?}");
        };
        assert_eq!(location.offset(), src.find('}').unwrap());
    }

    #[test]
    fn schema_violations_are_typed() {
        let err = from_json(r#"{"type":"doc","content":[{"type":"list_item"}]}"#).unwrap_err();
        assert!(matches!(
            err,
            DocumentParseError::Schema(TreeError::InvalidChild { .. })
        ));

        let err = from_json(
            r#"{"type":"doc","content":[{"type":"heading","attrs":{"level":"9"}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DocumentParseError::Schema(TreeError::InvalidAttr { .. })
        ));
    }
}
