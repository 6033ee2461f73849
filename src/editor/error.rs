use crate::blob::BlobError;
use crate::editor::stage::SaveStage;
use crate::riddle::{MediaField, ValidationErrors};
use crate::store::{StoreError, WatchTarget};
use thiserror::Error;

/// Why a save stopped
///
/// Writes completed before the failure are kept; nothing is rolled back.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("{0}")]
    Validation(#[from] ValidationErrors),

    #[error("Sign in to save riddles")]
    Unauthenticated,

    #[error("Upload of {field} failed while {stage}: {source}")]
    Upload {
        field: MediaField,
        stage: SaveStage,
        #[source]
        source: BlobError,
    },

    #[error("Write failed while {stage}: {source}")]
    Write {
        stage: SaveStage,
        #[source]
        source: StoreError,
    },

    #[error("Save task ended unexpectedly: {0}")]
    Aborted(String),
}

impl SaveError {
    /// The stage the save was in when it failed
    pub fn stage(&self) -> SaveStage {
        match self {
            SaveError::Validation(_) | SaveError::Unauthenticated => SaveStage::Validating,
            SaveError::Upload { stage, .. } | SaveError::Write { stage, .. } => *stage,
            SaveError::Aborted(_) => SaveStage::Errored,
        }
    }
}

#[derive(Error, Debug)]
pub enum DeleteError {
    #[error("Sign in to delete riddles")]
    Unauthenticated,

    #[error("Failed to delete hints of riddle {riddle_id}: {source}")]
    Hints {
        riddle_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete riddle {riddle_id}: {source}")]
    Record {
        riddle_id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to delete media of riddle {riddle_id}: {source}")]
    Media {
        riddle_id: String,
        #[source]
        source: BlobError,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Sign in to create books")]
    Unauthenticated,

    #[error("Invalid book name: {0}")]
    InvalidName(ValidationErrors),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A live-view listener that could not attach
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to subscribe to {target}: {source}")]
    Subscribe {
        target: WatchTarget,
        #[source]
        source: StoreError,
    },
}
