//! Error types for the editor core.

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};

use crate::platform::PlatformError;
use crate::surface::SurfacePhase;
use crate::types::NodeId;

/// Top-level error for editor operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// A transaction could not be applied to the node tree
    #[error(transparent)]
    #[diagnostic_source]
    Tree(#[from] TreeError),

    /// Code surface lifecycle error
    #[error(transparent)]
    #[diagnostic_source]
    Surface(#[from] SurfaceError),

    /// A suggestion command failed before anything was dispatched
    #[error(transparent)]
    #[diagnostic_source]
    Command(#[from] CommandError),

    #[error(transparent)]
    #[diagnostic_source]
    Config(#[from] ConfigError),

    /// Persisted document could not be loaded
    #[error(transparent)]
    #[diagnostic_source]
    Parse(#[from] DocumentParseError),

    #[error(transparent)]
    #[diagnostic(code(jotter::platform))]
    Platform(#[from] PlatformError),
}

/// Schema or structural violation while building or editing the node tree.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum TreeError {
    #[error("node {0} not found")]
    #[diagnostic(code(jotter::tree::not_found))]
    NodeNotFound(NodeId),

    #[error("node {0} is already in the document")]
    #[diagnostic(code(jotter::tree::duplicate_id))]
    DuplicateId(NodeId),

    #[error("{child} is not allowed inside {parent}")]
    #[diagnostic(code(jotter::tree::invalid_content))]
    InvalidChild {
        parent: &'static str,
        child: &'static str,
    },

    #[error("{kind} expects {expected} content")]
    #[diagnostic(code(jotter::tree::content_mismatch))]
    ContentMismatch {
        kind: &'static str,
        expected: &'static str,
    },

    #[error("node {0} does not hold inline content")]
    #[diagnostic(code(jotter::tree::not_textblock))]
    NotATextblock(NodeId),

    #[error("node {0} does not hold plain text content")]
    #[diagnostic(code(jotter::tree::not_text))]
    NotTextBearing(NodeId),

    #[error("node {0} is not a block")]
    #[diagnostic(code(jotter::tree::not_block))]
    NotABlock(NodeId),

    #[error("range {start}..{end} is out of bounds for node {node} of length {len}")]
    #[diagnostic(code(jotter::tree::out_of_bounds))]
    OutOfBounds {
        node: NodeId,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("invalid attribute {name}={value:?} on {kind}")]
    #[diagnostic(code(jotter::tree::invalid_attr))]
    InvalidAttr {
        kind: &'static str,
        name: String,
        value: String,
    },

    #[error("the document root cannot be removed or replaced")]
    #[diagnostic(code(jotter::tree::root))]
    RootImmutable,
}

/// Embedded code surface lifecycle errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum SurfaceError {
    /// The host failed to instantiate the code surface
    #[error("code surface failed to load: {0}")]
    #[diagnostic(code(jotter::surface::load))]
    LoadFailed(String),

    #[error("cannot {event} a code surface in the {from} state")]
    #[diagnostic(code(jotter::surface::transition))]
    InvalidTransition {
        from: SurfacePhase,
        event: &'static str,
    },

    #[error("no code block view for node {0}")]
    #[diagnostic(code(jotter::surface::unknown_node))]
    UnknownNode(NodeId),
}

/// Failure inside a suggestion command's apply function.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum CommandError {
    #[error("command {title} cannot be applied here: {reason}")]
    #[diagnostic(code(jotter::command::not_applicable))]
    NotApplicable { title: String, reason: String },

    #[error("command failed: {0}")]
    #[diagnostic(code(jotter::command::failed))]
    Failed(String),
}

/// Configuration loading and validation errors.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error(transparent)]
    #[diagnostic(code(jotter::config::json))]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(jotter::config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    #[diagnostic(code(jotter::config::invalid))]
    Invalid(String),
}

/// A persisted document could not be loaded.
#[derive(thiserror::Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum DocumentParseError {
    /// The JSON itself is malformed or doesn't match the node format
    #[error("malformed document: {message}")]
    #[diagnostic(code(jotter::parse::json))]
    Json {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        location: SourceSpan,
    },

    /// Well-formed JSON that violates the node schema
    #[error("document violates the schema: {0}")]
    #[diagnostic(code(jotter::parse::schema))]
    Schema(#[source] TreeError),
}

impl DocumentParseError {
    /// Wrap a serde_json error, pointing the span at its line and column in `src`.
    pub fn from_json(err: &serde_json::Error, name: &str, src: &str) -> Self {
        let location = if err.line() == 0 {
            SourceSpan::new(SourceOffset::from(0), 0)
        } else {
            let offset = SourceOffset::from_location(src, err.line(), err.column());
            let len = usize::from(offset.offset() < src.len());
            SourceSpan::new(offset, len)
        };
        Self::Json {
            message: err.to_string(),
            src: NamedSource::new(name, src.to_string()),
            location,
        }
    }
}

impl From<TreeError> for DocumentParseError {
    fn from(err: TreeError) -> Self {
        Self::Schema(err)
    }
}
