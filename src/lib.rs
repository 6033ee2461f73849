//! Authoring core for books of riddles: draft validation, hint diffing and staged persistence
//! against a document store and a blob store.

pub mod blob;
pub mod config;
pub mod editor;
pub mod identity;
pub mod logging;
pub mod riddle;
pub mod store;
#[cfg(test)]
mod test_utils;

pub use editor::{RiddleEditor, SaveEvent, SaveRequest, SaveStage};
pub use riddle::{RiddleDraft, RiddleSnapshot};
