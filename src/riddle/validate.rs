use crate::riddle::model::{
    Content, ContentDraft, HintItem, MediaRef, RiddleDraft, RiddleEdit, RiddleSnapshot,
};
use std::collections::HashSet;
use std::fmt;

/// Longest accepted name, answer, success text or book name, in characters
pub const MAX_FIELD_LEN: usize = 256;

/// A rejected field, addressed by path such as `hints[2].text`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Every field error found in one candidate, in field order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Message reported for `path`, if any
    pub fn get(&self, path: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|error| error.path == path)
            .map(|error| error.message.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "invalid riddle: {}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

const REQUIRED: &str = "is required";

fn too_long() -> String {
    format!("must be at most {} characters", MAX_FIELD_LEN)
}

/// Trim a bounded text field, recording an error when it is empty or too long
fn bounded_text(
    errors: &mut ValidationErrors,
    path: &str,
    value: Option<&str>,
    bounded: bool,
) -> Option<String> {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        errors.push(path, REQUIRED);
        return None;
    }
    if bounded && trimmed.chars().count() > MAX_FIELD_LEN {
        errors.push(path, too_long());
        return None;
    }
    Some(trimmed.to_string())
}

/// Pick the media for a field: the submitted one, or in edit mode the persisted fallback
fn media_for(
    errors: &mut ValidationErrors,
    path: &str,
    submitted: Option<&MediaRef>,
    fallback: Option<&str>,
    is_new: bool,
) -> Option<MediaRef> {
    let submitted = submitted.filter(|media| !media.is_empty());
    match submitted {
        Some(MediaRef::Persisted(_)) if is_new => {
            errors.push(path, "must be a new file for a new riddle");
            None
        }
        Some(media) => Some(media.clone()),
        None => match fallback.filter(|url| !url.is_empty()) {
            Some(url) => Some(MediaRef::Persisted(url.to_string())),
            None => {
                errors.push(path, REQUIRED);
                None
            }
        },
    }
}

fn content_for(
    errors: &mut ValidationErrors,
    path: &str,
    draft: &ContentDraft,
    fallback_media: Option<&str>,
    bounded: bool,
    is_new: bool,
) -> Option<Content> {
    // The field that does not match the kind is dropped
    match draft.kind.media_kind() {
        None => bounded_text(errors, &format!("{path}.text"), draft.text.as_deref(), bounded)
            .map(Content::Text),
        Some(kind) => media_for(
            errors,
            &format!("{path}.media"),
            draft.media.as_ref(),
            fallback_media,
            is_new,
        )
        .map(|media| Content::Media { kind, media }),
    }
}

/// Validate a candidate riddle
///
/// `existing` is the persisted riddle in edit mode and `None` for a new riddle. Media left empty
/// in an edit falls back to what is persisted for the same field. Hint orders are assigned
/// from list position, starting at 1.
pub fn validate(
    draft: &RiddleDraft,
    existing: Option<&RiddleSnapshot>,
) -> Result<RiddleEdit, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let is_new = existing.is_none();

    let name = bounded_text(&mut errors, "name", Some(draft.name.as_str()), true);
    let answer = bounded_text(&mut errors, "answer", Some(draft.answer.as_str()), true);

    let riddle_image = media_for(
        &mut errors,
        "riddleImage",
        draft.riddle_image.as_ref(),
        existing.and_then(|riddle| riddle.riddle_image.as_deref()),
        is_new,
    );

    let success_message = content_for(
        &mut errors,
        "successMessage",
        &draft.success_message,
        existing.and_then(|riddle| riddle.success_message.media.as_deref()),
        true,
        is_new,
    );

    let mut seen = HashSet::new();
    let mut hints = Vec::with_capacity(draft.hints.len());
    for (index, hint) in draft.hints.iter().enumerate() {
        let path = format!("hints[{index}]");
        let local_id = hint.local_id.trim();

        if local_id.is_empty() {
            errors.push(format!("{path}.localId"), REQUIRED);
        } else if !seen.insert(local_id) {
            errors.push(format!("{path}.localId"), "duplicates an earlier hint");
        }

        let fallback = existing
            .and_then(|riddle| riddle.hint(local_id))
            .and_then(|persisted| persisted.content.media.as_deref());
        let content = content_for(&mut errors, &path, &hint.content, fallback, false, is_new);

        if let Some(content) = content {
            hints.push(HintItem {
                local_id: local_id.to_string(),
                order: index as u32 + 1,
                content,
            });
        }
    }

    match (name, answer, riddle_image, success_message) {
        (Some(name), Some(answer), Some(riddle_image), Some(success_message))
            if errors.is_empty() =>
        {
            Ok(RiddleEdit {
                name,
                answer,
                riddle_image,
                success_message,
                hints,
            })
        }
        _ => Err(errors),
    }
}

/// Validate a book name, returning it trimmed
pub fn validate_book_name(name: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    match bounded_text(&mut errors, "name", Some(name), true) {
        Some(name) => Ok(name),
        None => Err(errors),
    }
}
