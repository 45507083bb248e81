//! # tk-select
//!
//! Decides which streams of a probed container survive a remux.
//!
//! - [`language`] canonicalises raw language tags and native-script titles.
//! - [`StreamSelector`] applies the audio priority rule and classifies every
//!   stream as kept, removed, or cover art.
//! - [`SelectionStrategy`] picks between the automatic, manual, and
//!   extract modes.
//! - [`InteractiveSelectionController`] lets a user edit the automatic
//!   decision within a bounded window.

pub mod decision;
pub mod interactive;
pub mod language;
pub mod selector;
pub mod strategy;

pub use decision::SelectionDecision;
pub use interactive::{
    InputListener, InteractiveSelectionController, MenuEntry, SelectionMenu, UserAction,
};
pub use language::{
    canonical_preferences, configured_preferences, parse_language_list, resolve, resolve_stream,
};
pub use selector::StreamSelector;
pub use strategy::SelectionStrategy;
