//! Jotter renderer
//!
//! Leaf rendering helpers shared by the editor core and by read-only export:
//! LaTeX typesetting to MathML and syntax-highlighted code blocks.

#[cfg(feature = "syntax-highlighting")]
pub mod code_pretty;
pub mod math;

pub use math::{MathResult, render_math};
