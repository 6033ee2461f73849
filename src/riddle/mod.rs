pub mod codec;
pub mod diff;
pub mod model;
pub mod paths;
pub mod validate;
#[cfg(test)]
mod diff_tests;
#[cfg(test)]
mod tests;

pub use diff::{diff_hints, HintChanges, HintCreate, HintDelete, HintDiff, HintUpdate};
pub use model::{
    Content, ContentDraft, ContentKind, HintDraft, HintItem, MediaField, MediaKind, MediaRef,
    PersistedHint, Provenance, RiddleDraft, RiddleEdit, RiddleSnapshot, StoredContent,
};
pub use validate::{validate, validate_book_name, FieldError, ValidationErrors, MAX_FIELD_LEN};
