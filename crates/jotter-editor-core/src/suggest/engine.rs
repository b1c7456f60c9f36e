use std::ops::Range;
use std::sync::Arc;

use crate::actions::{Key, KeyCombo};
use crate::config::{EditorConfig, SuggestionConfig};
use crate::document::EditorDocument;
use crate::error::{CommandError, EditorError, TreeError};
use crate::platform::{EditorHost, PopupRenderer};
use crate::transaction::{AppliedTransaction, Transaction, TxOrigin};
use crate::types::{CursorRect, NodeId};

use super::catalog::{Catalog, CommandContext};
use super::filter::rank;
use super::popup::{PopupContent, PopupItem};
use super::trigger::{TriggerMatch, find_trigger};

/// Suggestion popup state.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SuggestionState {
    #[default]
    Closed,
    Open(Session),
}

/// A live trigger context and what the popup shows for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    block: NodeId,
    range: Range<usize>,
    query: String,
    items: Vec<usize>,
    selected: usize,
    anchor: Option<CursorRect>,
    shown: bool,
}

impl Session {
    pub fn block(&self) -> NodeId {
        self.block
    }

    /// Trigger char plus query, in inline units.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Ranked catalog indices.
    pub fn items(&self) -> &[usize] {
        &self.items
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn anchor(&self) -> Option<CursorRect> {
        self.anchor
    }

    fn same_trigger(&self, hit: &TriggerMatch) -> bool {
        self.block == hit.block && self.range.start == hit.range.start
    }
}

/// What the engine did with a key.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// Consumed. The document is untouched.
    Handled,
    /// Not for the engine; run default editing.
    PassThrough,
    /// Consumed by committing the selected command.
    Committed(AppliedTransaction),
}

/// The `/` popup: trigger detection, ranking, keyboard selection and commit.
#[derive(Debug)]
pub struct SuggestionEngine {
    catalog: Arc<Catalog>,
    config: SuggestionConfig,
    code_language: String,
    state: SuggestionState,
    /// Trigger (block, start) closed with Escape. Stays closed until that context is gone.
    dismissed: Option<(NodeId, usize)>,
}

impl SuggestionEngine {
    pub fn new(catalog: Arc<Catalog>, config: &EditorConfig) -> Self {
        Self {
            catalog,
            config: config.suggestion.clone(),
            code_language: config.default_code_language.clone(),
            state: SuggestionState::Closed,
            dismissed: None,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SuggestionState::Open(session) => Some(session),
            SuggestionState::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, SuggestionState::Open(_))
    }

    /// What the popup currently shows, if open.
    pub fn content(&self) -> Option<PopupContent> {
        self.session().map(|s| popup_content(&self.catalog, s))
    }

    /// Re-evaluate the trigger context after the document or caret changed.
    ///
    /// Opens, updates or closes the popup. While open, the anchor is always
    /// re-queried so the popup follows the caret.
    pub fn update<D, H>(&mut self, editor: &D, host: &mut H)
    where
        D: EditorDocument + ?Sized,
        H: EditorHost + ?Sized,
    {
        let found = editor.caret().and_then(|caret| {
            find_trigger(editor.document(), caret, &self.config).map(|hit| (caret, hit))
        });
        let Some((caret, hit)) = found else {
            self.dismissed = None;
            self.close(host);
            return;
        };
        if self.dismissed == Some((hit.block, hit.range.start)) {
            self.close(host);
            return;
        }
        self.dismissed = None;

        let mut items = rank(&self.catalog, &hit.query);
        if let Some(max) = self.config.max_items {
            items.truncate(max);
        }
        let rect = host.caret_rect(caret);

        match &mut self.state {
            SuggestionState::Open(session) if session.same_trigger(&hit) => {
                if session.items != items {
                    session.items = items;
                    session.selected = 0;
                }
                session.range = hit.range;
                session.query = hit.query;
                if rect.is_some() {
                    session.anchor = rect;
                }
            }
            state => {
                tracing::debug!(target: "jotter::suggest", block = %hit.block, query = %hit.query, "suggestions opened");
                *state = SuggestionState::Open(Session {
                    block: hit.block,
                    range: hit.range,
                    query: hit.query,
                    items,
                    selected: 0,
                    anchor: rect,
                    shown: false,
                });
            }
        }
        self.render(host);
    }

    /// Route a key. Never consumes anything while closed.
    pub fn handle_key<D, H>(
        &mut self,
        combo: &KeyCombo,
        editor: &mut D,
        host: &mut H,
    ) -> Result<KeyOutcome, EditorError>
    where
        D: EditorDocument + ?Sized,
        H: EditorHost + ?Sized,
    {
        let SuggestionState::Open(session) = &mut self.state else {
            return Ok(KeyOutcome::PassThrough);
        };
        if combo.modifiers.has_command() {
            return Ok(KeyOutcome::PassThrough);
        }

        match combo.key {
            Key::ArrowDown | Key::ArrowUp => {
                let len = session.items.len();
                if len > 0 {
                    session.selected = if combo.key == Key::ArrowDown {
                        (session.selected + 1) % len
                    } else {
                        (session.selected + len - 1) % len
                    };
                    self.render(host);
                }
                Ok(KeyOutcome::Handled)
            }
            Key::Escape => {
                self.dismissed = Some((session.block, session.range.start));
                self.close(host);
                Ok(KeyOutcome::Handled)
            }
            Key::Enter => {
                let Some(&index) = session.items.get(session.selected) else {
                    return Ok(KeyOutcome::PassThrough);
                };
                let block = session.block;
                // The document may have moved on since the last update.
                let live = editor
                    .caret()
                    .and_then(|caret| find_trigger(editor.document(), caret, &self.config))
                    .filter(|hit| hit.block == block);
                self.close(host);
                let Some(hit) = live else {
                    return Ok(KeyOutcome::PassThrough);
                };
                self.commit(index, hit, editor).map(KeyOutcome::Committed)
            }
            _ => Ok(KeyOutcome::PassThrough),
        }
    }

    /// Close without touching the document.
    pub fn close<H: PopupRenderer + ?Sized>(&mut self, host: &mut H) {
        if let SuggestionState::Open(session) = std::mem::take(&mut self.state) {
            tracing::debug!(target: "jotter::suggest", block = %session.block, "suggestions closed");
            if session.shown {
                host.hide();
            }
        }
    }

    /// Delete the trigger text and run the command, in one transaction.
    fn commit<D: EditorDocument + ?Sized>(
        &self,
        index: usize,
        hit: TriggerMatch,
        editor: &mut D,
    ) -> Result<AppliedTransaction, EditorError> {
        let entry = self
            .catalog
            .get(index)
            .ok_or_else(|| CommandError::Failed(format!("no catalog entry {index}")))?;
        let doc = editor.document();
        let block = doc.node(hit.block).ok_or(TreeError::NodeNotFound(hit.block))?;

        let tx = Transaction::new(TxOrigin::Suggestion).delete(hit.block, hit.range.clone());
        let mut cx = CommandContext::new(doc, block, hit.range, &self.code_language, tx);
        if let Err(error) = entry.apply(&mut cx) {
            tracing::warn!(target: "jotter::suggest", title = entry.title(), %error, "command failed");
            return Err(error.into());
        }
        let tx = cx.into_transaction();

        tracing::debug!(target: "jotter::suggest", title = entry.title(), steps = tx.steps().len(), "command committed");
        Ok(editor.dispatch(tx)?)
    }

    fn render<H: PopupRenderer + ?Sized>(&mut self, host: &mut H) {
        let SuggestionState::Open(session) = &mut self.state else {
            return;
        };
        let Some(anchor) = session.anchor else {
            return;
        };
        let content = popup_content(&self.catalog, session);
        if session.shown {
            host.update(anchor, &content);
        } else {
            host.show(anchor, &content);
            session.shown = true;
        }
    }
}

fn popup_content(catalog: &Catalog, session: &Session) -> PopupContent {
    if session.items.is_empty() {
        return PopupContent::NoMatches;
    }
    let items = session
        .items
        .iter()
        .filter_map(|i| catalog.get(*i))
        .map(|entry| PopupItem {
            title: entry.title().to_string(),
            category: entry.category().to_string(),
        })
        .collect();
    PopupContent::Items {
        items,
        selected: session.selected,
    }
}
