//! jotter-editor-core: the block editor behind jotter, without a UI toolkit.
//!
//! This crate provides:
//! - `Document`: a schema-checked node tree changed only through atomic,
//!   invertible `Transaction`s
//! - `CodeBlockView`: keeps an embedded code surface and its node in sync
//!   across a debounce boundary
//! - `MathView`: LaTeX nodes rendered through `jotter-renderer`
//! - `SuggestionEngine`: the `/` command popup
//! - `serialize`: JSON persistence, HTML and markdown export
//! - `Editor`: the facade a host drives, generic over its surfaces and UI

pub mod actions;
pub mod config;
pub mod document;
pub mod editor;
pub mod error;
pub mod input_rules;
pub mod language;
pub mod math;
pub mod node;
pub mod platform;
pub mod schema;
pub mod serialize;
pub mod suggest;
pub mod surface;
pub mod transaction;
pub mod tree;
pub mod types;

pub use actions::{Key, KeyCombo, Modifiers};
pub use config::{ClassifierConfig, EditorConfig, SuggestionConfig};
pub use document::{EditorDocument, PlainEditor};
pub use editor::{Editor, KeyDisposition};
pub use error::{
    CommandError, ConfigError, DocumentParseError, EditorError, SurfaceError, TreeError,
};
pub use language::{Classifier, classify};
pub use math::{MathView, MathViews};
pub use node::{ATOM_CHAR, Attrs, Content, Inline, Node};
pub use platform::{CaretGeometry, ClipboardPlatform, EditorHost, PlatformError, PopupRenderer};
pub use schema::NodeKind;
pub use serialize::HtmlOptions;
pub use smol_str::SmolStr;
pub use suggest::{Catalog, CommandContext, PopupContent, SuggestionEngine, default_catalog};
pub use surface::{CodeBlockView, CodeBlockViews, CodeSurface, SurfaceLoader, SurfaceSeed};
pub use transaction::{AppliedTransaction, SelectionAfter, Step, Transaction, TxOrigin};
pub use tree::Document;
pub use types::{Caret, CursorRect, NodeId, Selection};
