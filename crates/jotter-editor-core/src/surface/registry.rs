use std::collections::HashMap;
use std::time::Duration;

use web_time::Instant;

use super::{CodeBlockView, CodeSurface, SurfaceSeed};
use crate::document::EditorDocument;
use crate::error::{SurfaceError, TreeError};
use crate::schema::NodeKind;
use crate::transaction::AppliedTransaction;
use crate::tree::Document;
use crate::types::NodeId;

/// One [`CodeBlockView`] per `code_block` node in the document.
#[derive(Debug)]
pub struct CodeBlockViews<S> {
    views: HashMap<NodeId, CodeBlockView<S>>,
    delay: Duration,
}

impl<S: CodeSurface> CodeBlockViews<S> {
    pub fn new(delay: Duration) -> Self {
        Self {
            views: HashMap::new(),
            delay,
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&CodeBlockView<S>> {
        self.views.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut CodeBlockView<S>> {
        self.views.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Reconcile views with the document.
    ///
    /// New code blocks get a view and are mounted; the returned seeds are the
    /// surfaces the host should now load. Views whose node is gone (or is no
    /// longer a code block) are disposed. The rest are updated.
    pub fn sync(&mut self, doc: &Document) -> Vec<SurfaceSeed> {
        let blocks = doc.nodes_of_kind(NodeKind::CodeBlock);

        let stale: Vec<NodeId> = self
            .views
            .keys()
            .copied()
            .filter(|id| !blocks.iter().any(|b| b.id() == *id))
            .collect();
        for id in stale {
            if let Some(mut view) = self.views.remove(&id) {
                view.dispose();
            }
        }

        let mut seeds = Vec::new();
        for node in blocks {
            match self.views.get_mut(&node.id()) {
                Some(view) => view.update(node),
                None => {
                    let mut view = CodeBlockView::new(node, self.delay);
                    match view.mount() {
                        Ok(seed) => seeds.push(seed),
                        Err(error) => {
                            tracing::error!(target: "jotter::surface", node = %node.id(), %error, "fresh view refused to mount");
                        }
                    }
                    self.views.insert(node.id(), view);
                }
            }
        }
        seeds
    }

    /// Hand a loaded surface to its view. Orphaned surfaces are disposed.
    pub fn surface_ready(&mut self, id: NodeId, mut surface: S) -> Result<(), SurfaceError> {
        match self.views.get_mut(&id) {
            Some(view) => view.surface_ready(surface),
            None => {
                tracing::debug!(target: "jotter::surface", node = %id, "surface for removed block, disposing");
                surface.dispose();
                Ok(())
            }
        }
    }

    pub fn surface_failed(&mut self, id: NodeId, error: SurfaceError) -> Result<(), SurfaceError> {
        match self.views.get_mut(&id) {
            Some(view) => view.surface_failed(error),
            None => Ok(()),
        }
    }

    pub fn handle_surface_change(&mut self, id: NodeId, now: Instant) -> Result<bool, SurfaceError> {
        self.views
            .get_mut(&id)
            .map(|v| v.handle_surface_change(now))
            .ok_or(SurfaceError::UnknownNode(id))
    }

    /// Commit every view whose quiet period has ended.
    pub fn tick<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
        now: Instant,
    ) -> Result<Vec<AppliedTransaction>, TreeError> {
        let mut applied = Vec::new();
        for id in self.due(now) {
            if let Some(view) = self.views.get_mut(&id) {
                applied.extend(view.tick(doc, now)?);
            }
        }
        Ok(applied)
    }

    /// Commit every pending change now.
    pub fn flush<D: EditorDocument + ?Sized>(
        &mut self,
        doc: &mut D,
    ) -> Result<Vec<AppliedTransaction>, TreeError> {
        let mut applied = Vec::new();
        let mut ids: Vec<NodeId> = self.views.keys().copied().collect();
        ids.sort();
        for id in ids {
            if let Some(view) = self.views.get_mut(&id) {
                applied.extend(view.flush(doc)?);
            }
        }
        Ok(applied)
    }

    /// Earliest pending commit deadline, for the host's timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.views.values().filter_map(CodeBlockView::deadline).min()
    }

    /// Dispose every view. Pending commits are dropped.
    pub fn teardown(&mut self) {
        for (_, mut view) in self.views.drain() {
            view.dispose();
        }
    }

    fn due(&self, now: Instant) -> Vec<NodeId> {
        let mut due: Vec<NodeId> = self
            .views
            .iter()
            .filter(|(_, v)| v.deadline().is_some_and(|d| d <= now))
            .map(|(id, _)| *id)
            .collect();
        due.sort();
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PlainEditor;
    use crate::node::Node;
    use crate::surface::SurfacePhase;
    use crate::surface::testing::FakeSurface;
    use crate::transaction::{Transaction, TxOrigin};

    const DELAY: Duration = Duration::from_millis(300);

    fn two_blocks() -> PlainEditor {
        PlainEditor::new(
            Document::new(vec![
                Node::code_block("rust", "a"),
                Node::paragraph("text"),
                Node::code_block("go", "b"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn sync_mounts_new_blocks_once() {
        let ed = two_blocks();
        let mut views: CodeBlockViews<FakeSurface> = CodeBlockViews::new(DELAY);
        let seeds = views.sync(ed.document());
        assert_eq!(seeds.len(), 2);
        assert_eq!(views.len(), 2);
        assert!(views.sync(ed.document()).is_empty());
    }

    #[test]
    fn removed_block_disposes_its_view() {
        let mut ed = two_blocks();
        let mut views: CodeBlockViews<FakeSurface> = CodeBlockViews::new(DELAY);
        let seeds = views.sync(ed.document());
        let first = seeds[0].node;
        let surface = FakeSurface::new(&seeds[0].code);
        views.surface_ready(first, surface.clone()).unwrap();

        ed.dispatch(Transaction::new(TxOrigin::User).remove_block(first))
            .unwrap();
        views.sync(ed.document());
        assert!(views.get(first).is_none());
        assert_eq!(surface.log.borrow().disposed, 1);

        // A surface that finishes loading for a removed block is released too.
        let late = FakeSurface::new("");
        views.surface_ready(first, late.clone()).unwrap();
        assert_eq!(late.log.borrow().disposed, 1);
    }

    #[test]
    fn converted_block_is_disposed() {
        let mut ed = two_blocks();
        let mut views: CodeBlockViews<FakeSurface> = CodeBlockViews::new(DELAY);
        let id = views.sync(ed.document())[0].node;
        ed.dispatch(Transaction::new(TxOrigin::User).replace_block(id, Node::paragraph("now text")))
            .unwrap();
        views.sync(ed.document());
        assert!(views.get(id).is_none());
        assert_eq!(views.len(), 1);
    }

    #[test]
    fn tick_commits_only_due_views() {
        let mut ed = two_blocks();
        let mut views: CodeBlockViews<FakeSurface> = CodeBlockViews::new(DELAY);
        let seeds = views.sync(ed.document());
        let surfaces: Vec<FakeSurface> = seeds
            .iter()
            .map(|seed| {
                let surface = FakeSurface::new(&seed.code);
                views.surface_ready(seed.node, surface.clone()).unwrap();
                surface
            })
            .collect();

        let start = Instant::now();
        surfaces[0].type_text("a2");
        views.handle_surface_change(seeds[0].node, start).unwrap();
        surfaces[1].type_text("b2");
        views
            .handle_surface_change(seeds[1].node, start + Duration::from_millis(100))
            .unwrap();
        assert_eq!(views.next_deadline(), Some(start + DELAY));

        let applied = views.tick(&mut ed, start + DELAY).unwrap();
        assert_eq!(applied.len(), 1);
        assert_eq!(ed.document().node(seeds[0].node).unwrap().attr("code"), Some("a2"));
        assert_eq!(ed.document().node(seeds[1].node).unwrap().attr("code"), Some("b"));
        assert_eq!(
            views.next_deadline(),
            Some(start + Duration::from_millis(100) + DELAY)
        );
    }

    #[test]
    fn teardown_disposes_everything() {
        let ed = two_blocks();
        let mut views: CodeBlockViews<FakeSurface> = CodeBlockViews::new(DELAY);
        let seeds = views.sync(ed.document());
        let surface = FakeSurface::new("a");
        views.surface_ready(seeds[0].node, surface.clone()).unwrap();
        views.teardown();
        assert!(views.is_empty());
        assert_eq!(surface.log.borrow().disposed, 1);
    }

    #[test]
    fn unknown_node_change_is_an_error() {
        let mut views: CodeBlockViews<FakeSurface> = CodeBlockViews::new(DELAY);
        let err = views
            .handle_surface_change(NodeId(99), Instant::now())
            .unwrap_err();
        assert_eq!(err, SurfaceError::UnknownNode(NodeId(99)));
        assert_eq!(SurfacePhase::Loading.to_string(), "loading");
    }
}
