//! Embedded code surfaces.
//!
//! A code block is edited in a rich, independently-stateful code widget owned
//! by the host (the "surface"). The editor keeps the surface and the node's
//! `code` attribute in sync: surface edits are committed after a quiet period
//! ([`Debouncer`]), tree changes from elsewhere are pushed into the surface,
//! and echoes of the editor's own writes are ignored.
//!
//! Surfaces load asynchronously. Until one is ready the view renders a static
//! placeholder; if loading fails it renders an error fallback instead.

mod debounce;
mod registry;
mod view;

use std::fmt;
use std::future::Future;

pub use debounce::Debouncer;
pub use registry::CodeBlockViews;
pub use view::CodeBlockView;

use crate::error::SurfaceError;
use crate::types::NodeId;

/// A host-owned code editing widget.
pub trait CodeSurface {
    /// Current text in the widget.
    fn value(&self) -> String;

    /// Replace the widget's text. May fire a change notification back.
    fn set_value(&mut self, text: &str);

    fn set_language(&mut self, language: &str);

    /// Release widget resources. Called exactly once.
    fn dispose(&mut self);
}

/// What a surface should start with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceSeed {
    pub node: NodeId,
    pub language: String,
    pub code: String,
}

/// Asynchronous surface construction, provided by the host.
pub trait SurfaceLoader {
    type Surface: CodeSurface;

    /// Instantiate a surface for a mounted code block.
    fn load(
        &self,
        seed: SurfaceSeed,
    ) -> impl Future<Output = Result<Self::Surface, SurfaceError>>;
}

/// Lifecycle state of a code block's surface.
#[derive(Debug)]
pub enum SurfaceState<S> {
    Uninitialized,
    /// Load requested, placeholder shown.
    Loading,
    Ready(S),
    /// Load failed, error fallback shown.
    Failed(SurfaceError),
    /// Torn down. Terminal.
    Disposed,
}

impl<S> SurfaceState<S> {
    pub fn phase(&self) -> SurfacePhase {
        match self {
            SurfaceState::Uninitialized => SurfacePhase::Uninitialized,
            SurfaceState::Loading => SurfacePhase::Loading,
            SurfaceState::Ready(_) => SurfacePhase::Ready,
            SurfaceState::Failed(_) => SurfacePhase::Failed,
            SurfaceState::Disposed => SurfacePhase::Disposed,
        }
    }
}

/// [`SurfaceState`] without the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfacePhase {
    Uninitialized,
    Loading,
    Ready,
    Failed,
    Disposed,
}

impl fmt::Display for SurfacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SurfacePhase::Uninitialized => "uninitialized",
            SurfacePhase::Loading => "loading",
            SurfacePhase::Ready => "ready",
            SurfacePhase::Failed => "failed",
            SurfacePhase::Disposed => "disposed",
        })
    }
}
