//! `/`-triggered command suggestions.
//!
//! [`find_trigger`] spots an open trigger context at the caret, [`rank`]
//! filters the [`Catalog`] for its query, and [`SuggestionEngine`] owns the
//! popup state machine: it opens and repositions the host popup, routes the
//! navigation keys while open, and commits the chosen command as one
//! transaction.

mod catalog;
mod commands;
mod engine;
mod filter;
mod popup;
mod trigger;

pub use catalog::{ApplyFn, Catalog, CatalogBuilder, CommandContext, CommandEntry};
pub use commands::{SAMPLE_BLOCK_TEX, SAMPLE_INLINE_TEX, default_catalog};
pub use engine::{KeyOutcome, Session, SuggestionEngine, SuggestionState};
pub use filter::rank;
pub use popup::{PopupContent, PopupItem};
pub use trigger::{TriggerMatch, find_trigger};
