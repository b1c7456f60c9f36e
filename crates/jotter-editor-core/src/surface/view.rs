use std::time::Duration;

use html_escape::{encode_double_quoted_attribute, encode_text};
use web_time::Instant;

use super::{CodeSurface, Debouncer, SurfacePhase, SurfaceSeed, SurfaceState};
use crate::document::EditorDocument;
use crate::error::{SurfaceError, TreeError};
use crate::language::{Classifier, language_options};
use crate::node::Node;
use crate::platform::{ClipboardPlatform, PlatformError};
use crate::transaction::{AppliedTransaction, Transaction, TxOrigin};
use crate::types::NodeId;

/// Binds one `code_block` node to its embedded surface.
///
/// `synced_code` is the code both sides last agreed on. A surface change that
/// matches it is an echo of our own write and is ignored; a tree value that
/// differs from it came from somewhere else and is pushed into the surface.
#[derive(Debug)]
pub struct CodeBlockView<S> {
    node: NodeId,
    state: SurfaceState<S>,
    debounce: Debouncer,
    synced_code: String,
    language: String,
    /// Language the surface was seeded with, to spot changes made while loading.
    seeded_language: Option<String>,
}

impl<S: CodeSurface> CodeBlockView<S> {
    pub fn new(node: &Node, delay: Duration) -> Self {
        Self {
            node: node.id(),
            state: SurfaceState::Uninitialized,
            debounce: Debouncer::new(delay),
            synced_code: node.attr("code").unwrap_or_default().to_string(),
            language: node.attr("language").unwrap_or_default().to_string(),
            seeded_language: None,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.node
    }

    pub fn state(&self) -> &SurfaceState<S> {
        &self.state
    }

    pub fn phase(&self) -> SurfacePhase {
        self.state.phase()
    }

    pub fn surface(&self) -> Option<&S> {
        match &self.state {
            SurfaceState::Ready(surface) => Some(surface),
            _ => None,
        }
    }

    pub fn surface_mut(&mut self) -> Option<&mut S> {
        match &mut self.state {
            SurfaceState::Ready(surface) => Some(surface),
            _ => None,
        }
    }

    /// Code last committed to or received from the tree.
    pub fn synced_code(&self) -> &str {
        &self.synced_code
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn has_pending_commit(&self) -> bool {
        self.debounce.is_pending()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Start loading: Uninitialized -> Loading. Returns what the host should load.
    pub fn mount(&mut self) -> Result<SurfaceSeed, SurfaceError> {
        match self.state {
            SurfaceState::Uninitialized => {
                self.state = SurfaceState::Loading;
                self.seeded_language = Some(self.language.clone());
                tracing::debug!(target: "jotter::surface", node = %self.node, "loading code surface");
                Ok(SurfaceSeed {
                    node: self.node,
                    language: self.language.clone(),
                    code: self.synced_code.clone(),
                })
            }
            _ => Err(self.invalid("mount")),
        }
    }

    /// The host finished loading the surface.
    ///
    /// A surface arriving after the view was disposed is disposed on the spot.
    pub fn surface_ready(&mut self, mut surface: S) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::Loading => {
                // The tree may have moved on while the surface was loading.
                if surface.value() != self.synced_code {
                    surface.set_value(&self.synced_code);
                }
                if self.seeded_language.as_deref() != Some(self.language.as_str()) {
                    surface.set_language(&self.language);
                }
                self.state = SurfaceState::Ready(surface);
                tracing::debug!(target: "jotter::surface", node = %self.node, "code surface ready");
                Ok(())
            }
            SurfaceState::Disposed => {
                tracing::debug!(
                    target: "jotter::surface",
                    node = %self.node,
                    "surface arrived after teardown, disposing"
                );
                surface.dispose();
                Ok(())
            }
            _ => {
                surface.dispose();
                Err(self.invalid("finish loading"))
            }
        }
    }

    /// The host failed to load the surface: Loading -> Failed.
    pub fn surface_failed(&mut self, error: SurfaceError) -> Result<(), SurfaceError> {
        match self.state {
            SurfaceState::Loading => {
                tracing::warn!(target: "jotter::surface", node = %self.node, %error, "code surface failed to load");
                self.state = SurfaceState::Failed(error);
                Ok(())
            }
            SurfaceState::Disposed => Ok(()),
            _ => Err(self.invalid("fail loading")),
        }
    }

    /// The surface reported a content change. Returns whether a commit is now scheduled.
    pub fn handle_surface_change(&mut self, now: Instant) -> bool {
        let SurfaceState::Ready(surface) = &self.state else {
            return false;
        };
        if surface.value() == self.synced_code {
            // Echo of our own write, or an edit that was undone inside the quiet period.
            self.debounce.cancel();
            return false;
        }
        self.debounce.schedule(now);
        true
    }

    /// Commit the surface's text if the quiet period is over.
    pub fn tick<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        now: Instant,
    ) -> Result<Option<AppliedTransaction>, TreeError> {
        if !self.debounce.fire_if_due(now) {
            return Ok(None);
        }
        self.commit(doc)
    }

    /// Commit a pending change immediately, e.g. before saving.
    pub fn flush<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
    ) -> Result<Option<AppliedTransaction>, TreeError> {
        if !self.debounce.take() {
            return Ok(None);
        }
        self.commit(doc)
    }

    fn commit<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
    ) -> Result<Option<AppliedTransaction>, TreeError> {
        let SurfaceState::Ready(surface) = &self.state else {
            return Ok(None);
        };
        let value = surface.value();
        if value == self.synced_code {
            return Ok(None);
        }
        if !doc.document().contains(self.node) {
            tracing::warn!(target: "jotter::surface", node = %self.node, "dropping commit for detached code block");
            return Ok(None);
        }
        let tx = Transaction::new(TxOrigin::Surface(self.node)).set_attr(
            self.node,
            "code",
            value.clone(),
        );
        let applied = doc.dispatch(tx)?;
        tracing::trace!(
            target: "jotter::surface",
            node = %self.node,
            len = value.len(),
            "committed code surface"
        );
        self.synced_code = value;
        Ok(Some(applied))
    }

    /// Reconcile with the node after any transaction.
    ///
    /// A tree value that differs from what we last synced is an external change
    /// (undo, collaboration, programmatic edit): it wins over a pending local
    /// commit and is pushed into the surface.
    pub fn update(&mut self, node: &Node) {
        debug_assert_eq!(node.id(), self.node);
        let code = node.attr("code").unwrap_or_default();
        let language = node.attr("language").unwrap_or_default();

        if let SurfaceState::Ready(surface) = &mut self.state {
            if code != self.synced_code {
                self.debounce.cancel();
                if surface.value() != code {
                    surface.set_value(code);
                }
                tracing::trace!(target: "jotter::surface", node = %self.node, "pushed external change into surface");
            } else if !self.debounce.is_pending() && surface.value() != code {
                surface.set_value(code);
            }
            if language != self.language {
                surface.set_language(language);
            }
        }
        if code != self.synced_code {
            self.synced_code = code.to_string();
        }
        if language != self.language {
            self.language = language.to_string();
        }
    }

    /// Change the block's language from the selector.
    pub fn set_language<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        language: &str,
    ) -> Result<AppliedTransaction, TreeError> {
        let tx = Transaction::new(TxOrigin::User).set_attr(self.node, "language", language);
        let applied = doc.dispatch(tx)?;
        if language != self.language {
            if let SurfaceState::Ready(surface) = &mut self.state {
                surface.set_language(language);
            }
            self.language = language.to_string();
        }
        Ok(applied)
    }

    /// Classify the current code and switch to the result if it differs.
    pub fn auto_detect<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        classifier: &Classifier,
    ) -> Result<Option<AppliedTransaction>, TreeError> {
        let detected = classifier.classify(&self.copy_text());
        tracing::debug!(target: "jotter::surface", node = %self.node, language = %detected, "auto-detected language");
        if detected == self.language {
            return Ok(None);
        }
        self.set_language(doc, &detected).map(Some)
    }

    /// Text the copy button puts on the clipboard: what the user currently sees.
    pub fn copy_text(&self) -> String {
        match &self.state {
            SurfaceState::Ready(surface) => surface.value(),
            _ => self.synced_code.clone(),
        }
    }

    pub fn copy_to_clipboard(
        &self,
        clipboard: &impl ClipboardPlatform,
    ) -> Result<(), PlatformError> {
        clipboard.write_text(&self.copy_text())
    }

    /// Tear down. Any pending commit is discarded. Idempotent.
    pub fn dispose(&mut self) {
        self.debounce.cancel();
        match std::mem::replace(&mut self.state, SurfaceState::Disposed) {
            SurfaceState::Disposed => return,
            SurfaceState::Ready(mut surface) => surface.dispose(),
            _ => {}
        }
        tracing::debug!(target: "jotter::surface", node = %self.node, "code block view disposed");
    }

    /// HTML for the node-view slot.
    ///
    /// While loading or after a failure the code is shown read-only; once
    /// ready the host mounts the surface into `.code-surface-mount`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let (state_class, body) = match &self.state {
            SurfaceState::Disposed => return out,
            SurfaceState::Uninitialized | SurfaceState::Loading => (
                "code-block-loading",
                format!(
                    "{}<span class=\"code-block-status\">Loading editor…</span>",
                    self.fallback_pre()
                ),
            ),
            SurfaceState::Failed(error) => (
                "code-block-error",
                format!(
                    "{}<span class=\"code-block-status\" role=\"alert\">Code editor unavailable: {}</span>",
                    self.fallback_pre(),
                    encode_text(&error.to_string())
                ),
            ),
            SurfaceState::Ready(_) => ("code-block-ready", "<div class=\"code-surface-mount\"></div>".to_string()),
        };

        out.push_str(&format!(
            "<div class=\"code-block {state_class}\" data-node-id=\"{}\" data-language=\"{}\">",
            self.node.get(),
            encode_double_quoted_attribute(&self.language)
        ));
        self.push_toolbar(&mut out);
        out.push_str(&body);
        out.push_str("</div>");
        out
    }

    fn fallback_pre(&self) -> String {
        format!(
            "<pre class=\"code-block-fallback\"><code>{}</code></pre>",
            encode_text(&self.synced_code)
        )
    }

    fn push_toolbar(&self, out: &mut String) {
        out.push_str("<div class=\"code-block-toolbar\"><select class=\"code-block-language\">");
        let mut known = false;
        for (id, label) in language_options() {
            let selected = if id == self.language {
                known = true;
                " selected"
            } else {
                ""
            };
            out.push_str(&format!("<option value=\"{id}\"{selected}>{label}</option>"));
        }
        if !known {
            let lang = encode_double_quoted_attribute(&self.language);
            out.push_str(&format!("<option value=\"{lang}\" selected>{lang}</option>"));
        }
        out.push_str(
            "</select><button type=\"button\" data-action=\"detect-language\">Detect</button>\
             <button type=\"button\" data-action=\"copy\">Copy</button></div>",
        );
    }

    fn invalid(&self, event: &'static str) -> SurfaceError {
        SurfaceError::InvalidTransition {
            from: self.phase(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::document::PlainEditor;
    use crate::surface::testing::FakeSurface;
    use crate::tree::Document;

    const DELAY: Duration = Duration::from_millis(300);

    fn setup(code: &str) -> (PlainEditor, CodeBlockView<FakeSurface>) {
        let doc = Document::new(vec![Node::code_block("rust", code)]).unwrap();
        let view = CodeBlockView::new(&doc.blocks()[0], DELAY);
        (PlainEditor::new(doc), view)
    }

    fn ready(view: &mut CodeBlockView<FakeSurface>) -> FakeSurface {
        let seed = view.mount().unwrap();
        let surface = FakeSurface::new(&seed.code);
        view.surface_ready(surface.clone()).unwrap();
        surface
    }

    fn code_of(ed: &PlainEditor) -> (String, String) {
        let node = &ed.document().blocks()[0];
        (
            node.attr("code").unwrap().to_string(),
            node.text().unwrap().to_string(),
        )
    }

    #[test]
    fn lifecycle_transitions() {
        let (_, mut view) = setup("x");
        assert_eq!(view.phase(), SurfacePhase::Uninitialized);
        let seed = view.mount().unwrap();
        assert_eq!(seed.language, "rust");
        assert_eq!(seed.code, "x");
        assert_eq!(view.phase(), SurfacePhase::Loading);
        assert!(matches!(
            view.mount(),
            Err(SurfaceError::InvalidTransition { from: SurfacePhase::Loading, .. })
        ));
        view.surface_ready(FakeSurface::new("x")).unwrap();
        assert_eq!(view.phase(), SurfacePhase::Ready);
        view.dispose();
        assert_eq!(view.phase(), SurfacePhase::Disposed);
    }

    #[test]
    fn debounced_commit_writes_attr_and_text() {
        let (mut ed, mut view) = setup("a");
        let surface = ready(&mut view);
        let start = Instant::now();

        surface.type_text("ab");
        assert!(view.handle_surface_change(start));
        surface.type_text("abc");
        assert!(view.handle_surface_change(start + Duration::from_millis(200)));

        // Still inside the quiet period of the second keystroke.
        assert!(view.tick(&mut ed, start + Duration::from_millis(400)).unwrap().is_none());
        assert_eq!(code_of(&ed).0, "a");

        let applied = view
            .tick(&mut ed, start + Duration::from_millis(500))
            .unwrap()
            .unwrap();
        assert_eq!(applied.origin, TxOrigin::Surface(view.node_id()));
        assert_eq!(code_of(&ed), ("abc".to_string(), "abc".to_string()));
        assert_eq!(view.synced_code(), "abc");
        assert!(!view.has_pending_commit());
    }

    #[test]
    fn echo_of_own_write_is_ignored() {
        let (mut ed, mut view) = setup("a");
        let surface = ready(&mut view);
        let start = Instant::now();
        surface.type_text("b");
        view.handle_surface_change(start);
        view.tick(&mut ed, start + DELAY).unwrap();

        // Reconciling after our own commit must not write back into the surface.
        view.update(&ed.document().blocks()[0]);
        assert_eq!(surface.log.borrow().set_value_calls, 0);
        assert!(!view.handle_surface_change(start + DELAY));
        assert!(!view.has_pending_commit());
    }

    #[test]
    fn external_change_wins_over_pending_edit() {
        let (mut ed, mut view) = setup("local");
        let surface = ready(&mut view);
        let id = view.node_id();
        let start = Instant::now();

        surface.type_text("local edit");
        view.handle_surface_change(start);

        ed.dispatch(Transaction::new(TxOrigin::History).set_attr(id, "code", "restored"))
            .unwrap();
        view.update(ed.document().node(id).unwrap());

        assert_eq!(surface.value(), "restored");
        assert!(!view.has_pending_commit());
        assert!(view.tick(&mut ed, start + DELAY).unwrap().is_none());
        assert_eq!(code_of(&ed).0, "restored");
    }

    #[test]
    fn language_change_reaches_surface() {
        let (mut ed, mut view) = setup("print(1)");
        let surface = ready(&mut view);
        let id = view.node_id();
        ed.dispatch(Transaction::new(TxOrigin::User).set_attr(id, "language", "python"))
            .unwrap();
        view.update(ed.document().node(id).unwrap());
        assert_eq!(surface.log.borrow().language, "python");
        assert_eq!(surface.log.borrow().set_value_calls, 0);
    }

    #[test]
    fn tree_change_while_loading_is_applied_on_ready() {
        let (mut ed, mut view) = setup("old");
        let id = view.node_id();
        let seed = view.mount().unwrap();
        ed.dispatch(
            Transaction::new(TxOrigin::Programmatic)
                .set_attr(id, "code", "new")
                .set_attr(id, "language", "go"),
        )
        .unwrap();
        view.update(ed.document().node(id).unwrap());

        let surface = FakeSurface::new(&seed.code);
        view.surface_ready(surface.clone()).unwrap();
        assert_eq!(surface.value(), "new");
        assert_eq!(surface.log.borrow().language, "go");
    }

    #[test]
    fn late_surface_after_dispose_is_released() {
        let (mut ed, mut view) = setup("x");
        view.mount().unwrap();
        view.dispose();
        let surface = FakeSurface::new("x");
        view.surface_ready(surface.clone()).unwrap();
        assert_eq!(surface.log.borrow().disposed, 1);
        assert_eq!(view.phase(), SurfacePhase::Disposed);
        assert!(view.flush(&mut ed).unwrap().is_none());
    }

    #[test]
    fn pending_commit_is_dropped_on_dispose() {
        let (mut ed, mut view) = setup("a");
        let surface = ready(&mut view);
        let start = Instant::now();
        surface.type_text("changed");
        view.handle_surface_change(start);
        view.dispose();
        assert_eq!(surface.log.borrow().disposed, 1);
        assert!(view.tick(&mut ed, start + DELAY * 10).unwrap().is_none());
        assert!(view.flush(&mut ed).unwrap().is_none());
        assert_eq!(code_of(&ed).0, "a");

        view.dispose();
        assert_eq!(surface.log.borrow().disposed, 1);
    }

    #[test]
    fn failed_load_renders_fallback() {
        let (_, mut view) = setup("a < b");
        view.mount().unwrap();
        view.surface_failed(SurfaceError::LoadFailed("network".into()))
            .unwrap();
        assert_eq!(view.phase(), SurfacePhase::Failed);
        let html = view.render();
        assert!(html.contains("code-block-error"));
        assert!(html.contains("<code>a &lt; b</code>"));
        assert!(html.contains("role=\"alert\""));
        assert!(html.contains("network"));
        assert_eq!(view.copy_text(), "a < b");
    }

    #[test]
    fn placeholder_marks_language() {
        let (_, view) = setup("fn main() {}");
        let html = view.render();
        assert!(html.starts_with("<div class=\"code-block code-block-loading\""));
        assert!(html.contains("data-language=\"rust\""));
        assert!(html.contains("<option value=\"rust\" selected>Rust</option>"));
        assert!(html.contains("Loading editor"));
    }

    #[test]
    fn auto_detect_sets_language() {
        let (mut ed, mut view) = setup("");
        let surface = ready(&mut view);
        surface.type_text("def hello():\n    print('hi')");
        assert!(view.auto_detect(&mut ed, &Classifier::default()).unwrap().is_some());
        assert_eq!(view.language(), "python");
        assert_eq!(
            ed.document().blocks()[0].attr("language"),
            Some("python")
        );
        assert_eq!(surface.log.borrow().language, "python");
        // Same result again is not a change.
        assert!(view.auto_detect(&mut ed, &Classifier::default()).unwrap().is_none());
    }

    #[test]
    fn copy_uses_live_surface_text() {
        struct Clip(RefCell<String>);
        impl ClipboardPlatform for Clip {
            fn write_text(&self, text: &str) -> Result<(), PlatformError> {
                *self.0.borrow_mut() = text.to_string();
                Ok(())
            }
        }

        let (_, mut view) = setup("old");
        let surface = ready(&mut view);
        surface.type_text("typed but not committed");
        let clip = Clip(RefCell::new(String::new()));
        view.copy_to_clipboard(&clip).unwrap();
        assert_eq!(*clip.0.borrow(), "typed but not committed");
    }
}
