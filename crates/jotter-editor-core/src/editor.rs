//! The editor facade a host drives.
//!
//! [`Editor`] owns the document and caret, the per-node views and the
//! suggestion engine, and keeps them consistent: after every applied
//! transaction the code and math views are reconciled with the tree and the
//! suggestion context is re-evaluated.

use std::sync::Arc;

use web_time::Instant;

use crate::actions::{Key, KeyCombo};
use crate::config::EditorConfig;
use crate::document::{EditorDocument, PlainEditor};
use crate::error::{EditorError, SurfaceError, TreeError};
use crate::input_rules::apply_math_rules;
use crate::language::Classifier;
use crate::math::MathViews;
use crate::platform::{ClipboardPlatform, EditorHost};
use crate::serialize::{self, HtmlOptions};
use crate::suggest::{Catalog, KeyOutcome, SuggestionEngine};
use crate::surface::{CodeBlockViews, CodeSurface, SurfaceLoader, SurfaceSeed};
use crate::transaction::{AppliedTransaction, Transaction};
use crate::tree::Document;
use crate::types::{Caret, NodeId};

/// What happened to a key given to [`Editor::handle_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// The open suggestion popup took it.
    ConsumedBySuggestion,
    /// Default editing changed the document.
    Edited,
    /// The caret moved.
    Moved,
    /// Nothing handled it; the host may apply its own behaviour.
    Unhandled,
}

pub struct Editor<S, H> {
    inner: PlainEditor,
    config: EditorConfig,
    classifier: Classifier,
    code_views: CodeBlockViews<S>,
    math_views: MathViews,
    suggestions: SuggestionEngine,
    host: H,
    /// Surfaces mounted but not yet handed to a loader.
    pending_seeds: Vec<SurfaceSeed>,
}

impl<S: CodeSurface, H: EditorHost> Editor<S, H> {
    pub fn new(
        doc: Document,
        catalog: Arc<Catalog>,
        config: EditorConfig,
        host: H,
    ) -> Result<Self, EditorError> {
        config.validate()?;
        let mut editor = Self {
            inner: PlainEditor::new(doc),
            classifier: Classifier::new(config.classifier.clone()),
            code_views: CodeBlockViews::new(config.debounce()),
            math_views: MathViews::new(),
            suggestions: SuggestionEngine::new(catalog, &config),
            config,
            host,
            pending_seeds: Vec::new(),
        };
        editor.after_change();
        Ok(editor)
    }

    pub fn document(&self) -> &Document {
        self.inner.document()
    }

    pub fn caret(&self) -> Option<Caret> {
        self.inner.caret()
    }

    /// Move the caret, e.g. after a click. Re-evaluates suggestions.
    pub fn set_caret(&mut self, caret: Option<Caret>) {
        self.inner.set_caret(caret);
        self.suggestions.update(&self.inner, &mut self.host);
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn suggestions(&self) -> &SuggestionEngine {
        &self.suggestions
    }

    pub fn code_views(&self) -> &CodeBlockViews<S> {
        &self.code_views
    }

    pub fn math_views(&self) -> &MathViews {
        &self.math_views
    }

    /// Apply a transaction and bring every view up to date.
    ///
    /// Undo is the host's: dispatch the returned inverse to revert.
    pub fn dispatch(&mut self, tx: Transaction) -> Result<AppliedTransaction, EditorError> {
        let applied = self.inner.dispatch(tx)?;
        self.after_change();
        Ok(applied)
    }

    /// Type text at the caret, then run the math input rules.
    pub fn insert_text(&mut self, text: &str) -> Result<bool, EditorError> {
        self.insert_text_with(text, apply_math_rules)
    }

    /// The typed text stays even when `rules` fails, so views resync either way.
    fn insert_text_with<R>(&mut self, text: &str, rules: R) -> Result<bool, EditorError>
    where
        R: FnOnce(&mut PlainEditor) -> Result<Option<AppliedTransaction>, TreeError>,
    {
        if self.inner.insert_text(text)?.is_none() {
            return Ok(false);
        }
        let fired = rules(&mut self.inner);
        self.after_change();
        if let Some(applied) = fired? {
            tracing::trace!(target: "jotter::tree", changed = applied.changed.len(), "math input rule applied");
        }
        Ok(true)
    }

    /// Route a key: the suggestion popup first, then default editing.
    pub fn handle_key(&mut self, combo: KeyCombo) -> Result<KeyDisposition, EditorError> {
        match self
            .suggestions
            .handle_key(&combo, &mut self.inner, &mut self.host)?
        {
            KeyOutcome::Handled => return Ok(KeyDisposition::ConsumedBySuggestion),
            KeyOutcome::Committed(_) => {
                self.after_change();
                return Ok(KeyDisposition::ConsumedBySuggestion);
            }
            KeyOutcome::PassThrough => {}
        }
        if combo.modifiers.has_command() {
            return Ok(KeyDisposition::Unhandled);
        }

        let edited = match &combo.key {
            Key::Character(text) => return self.insert_text(text).map(edited_or_unhandled),
            Key::Backspace => self.inner.delete_backward()?.is_some(),
            Key::Enter => self.inner.split_block()?.is_some(),
            Key::ArrowLeft | Key::ArrowRight => {
                if self.inner.caret().is_none() {
                    return Ok(KeyDisposition::Unhandled);
                }
                let delta = if combo.key == Key::ArrowLeft { -1 } else { 1 };
                self.inner.move_caret(delta);
                self.suggestions.update(&self.inner, &mut self.host);
                return Ok(KeyDisposition::Moved);
            }
            _ => return Ok(KeyDisposition::Unhandled),
        };
        if edited {
            self.after_change();
        }
        Ok(edited_or_unhandled(edited))
    }

    // === Code surfaces ===

    /// Surfaces mounted since the last call. The host loads each and reports
    /// back through [`surface_ready`](Self::surface_ready) or
    /// [`surface_failed`](Self::surface_failed).
    pub fn pending_surface_seeds(&mut self) -> Vec<SurfaceSeed> {
        std::mem::take(&mut self.pending_seeds)
    }

    /// Load every pending surface with `loader`, one after another.
    pub async fn load_pending_surfaces<L>(&mut self, loader: &L) -> Result<(), EditorError>
    where
        L: SurfaceLoader<Surface = S>,
    {
        for seed in self.pending_surface_seeds() {
            let node = seed.node;
            match loader.load(seed).await {
                Ok(surface) => self.surface_ready(node, surface)?,
                Err(error) => self.surface_failed(node, error)?,
            }
        }
        Ok(())
    }

    pub fn surface_ready(&mut self, node: NodeId, surface: S) -> Result<(), EditorError> {
        Ok(self.code_views.surface_ready(node, surface)?)
    }

    pub fn surface_failed(&mut self, node: NodeId, error: SurfaceError) -> Result<(), EditorError> {
        Ok(self.code_views.surface_failed(node, error)?)
    }

    /// The surface for `node` reported an edit. Returns whether a commit is scheduled.
    pub fn surface_changed(&mut self, node: NodeId, now: Instant) -> Result<bool, EditorError> {
        Ok(self.code_views.handle_surface_change(node, now)?)
    }

    /// Commit surfaces whose quiet period has ended.
    pub fn tick(&mut self, now: Instant) -> Result<Vec<AppliedTransaction>, EditorError> {
        let applied = self.code_views.tick(&mut self.inner, now)?;
        if !applied.is_empty() {
            self.after_change();
        }
        Ok(applied)
    }

    /// When the host should next call [`tick`](Self::tick).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.code_views.next_deadline()
    }

    /// Commit every pending surface edit now, e.g. before saving.
    pub fn flush_pending(&mut self) -> Result<Vec<AppliedTransaction>, EditorError> {
        let applied = self.code_views.flush(&mut self.inner)?;
        if !applied.is_empty() {
            self.after_change();
        }
        Ok(applied)
    }

    pub fn set_code_language(
        &mut self,
        node: NodeId,
        language: &str,
    ) -> Result<AppliedTransaction, EditorError> {
        let view = self
            .code_views
            .get_mut(node)
            .ok_or(SurfaceError::UnknownNode(node))?;
        let applied = view.set_language(&mut self.inner, language)?;
        self.after_change();
        Ok(applied)
    }

    /// Classify the block's code and switch language if the guess differs.
    pub fn auto_detect_language(
        &mut self,
        node: NodeId,
    ) -> Result<Option<AppliedTransaction>, EditorError> {
        let view = self
            .code_views
            .get_mut(node)
            .ok_or(SurfaceError::UnknownNode(node))?;
        let applied = view.auto_detect(&mut self.inner, &self.classifier)?;
        if applied.is_some() {
            self.after_change();
        }
        Ok(applied)
    }

    pub fn copy_code(
        &self,
        node: NodeId,
        clipboard: &impl ClipboardPlatform,
    ) -> Result<(), EditorError> {
        let view = self
            .code_views
            .get(node)
            .ok_or(SurfaceError::UnknownNode(node))?;
        Ok(view.copy_to_clipboard(clipboard)?)
    }

    // === Node-view slots ===

    pub fn render_code_slot(&self, node: NodeId) -> Option<String> {
        self.code_views.get(node).map(|view| view.render())
    }

    pub fn render_math_slot(&self, node: NodeId) -> Option<String> {
        self.math_views.get(node).map(|view| view.render())
    }

    // === Export ===

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serialize::to_json(self.document())
    }

    pub fn to_html(&self, options: &HtmlOptions) -> String {
        serialize::to_html(self.document(), options)
    }

    pub fn to_markdown(&self) -> String {
        serialize::to_markdown(self.document())
    }

    /// Close the popup and dispose every view. Pending surface commits are dropped.
    pub fn teardown(&mut self) {
        self.suggestions.close(&mut self.host);
        self.code_views.teardown();
        self.math_views.clear();
        self.pending_seeds.clear();
        tracing::debug!(target: "jotter::tree", "editor torn down");
    }

    fn after_change(&mut self) {
        let doc = self.inner.document();
        self.pending_seeds.extend(self.code_views.sync(doc));
        let rerendered = self.math_views.sync(doc);
        if !rerendered.is_empty() {
            tracing::trace!(target: "jotter::math", count = rerendered.len(), "math views re-rendered");
        }
        self.suggestions.update(&self.inner, &mut self.host);
    }
}

fn edited_or_unhandled(edited: bool) -> KeyDisposition {
    if edited {
        KeyDisposition::Edited
    } else {
        KeyDisposition::Unhandled
    }
}
