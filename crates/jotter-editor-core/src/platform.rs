//! Platform abstraction traits for editor operations.
//!
//! These traits define the interface between the editor logic and the host
//! (browser DOM, native UI, a test harness). The editor never touches a
//! widget directly: it asks for caret geometry, tells a popup what to show
//! and where, and writes to the clipboard through these seams.

use crate::suggest::PopupContent;
use crate::types::{Caret, CursorRect};

/// Error type for platform operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl From<&str> for PlatformError {
    fn from(s: &str) -> Self {
        PlatformError(s.to_string())
    }
}

impl From<String> for PlatformError {
    fn from(s: String) -> Self {
        PlatformError(s)
    }
}

/// Screen geometry of the caret.
pub trait CaretGeometry {
    /// Screen rectangle for a caret position.
    ///
    /// Returns None if the position isn't laid out yet.
    fn caret_rect(&self, caret: Caret) -> Option<CursorRect>;
}

/// A floating popup anchored at the caret.
///
/// `show` and `update` both receive the current anchor; implementations must
/// move the popup to it rather than only refreshing its contents.
pub trait PopupRenderer {
    fn show(&mut self, anchor: CursorRect, content: &PopupContent);

    fn update(&mut self, anchor: CursorRect, content: &PopupContent);

    fn hide(&mut self);
}

/// Platform clipboard.
pub trait ClipboardPlatform {
    fn write_text(&self, text: &str) -> Result<(), PlatformError>;
}

/// Everything the editor needs from its host UI.
pub trait EditorHost: CaretGeometry + PopupRenderer {}

impl<T: CaretGeometry + PopupRenderer> EditorHost for T {}
