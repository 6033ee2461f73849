use crate::blob::LocalFile;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use uuid::Uuid;

/// Discriminator of a riddle prompt, success message or hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
    Video,
    Audio,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
            ContentKind::Video => "video",
            ContentKind::Audio => "audio",
        }
    }

    /// The media kind, `None` for text
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            ContentKind::Text => None,
            ContentKind::Image => Some(MediaKind::Image),
            ContentKind::Video => Some(MediaKind::Video),
            ContentKind::Audio => Some(MediaKind::Audio),
        }
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ContentKind::Text),
            "image" => Ok(ContentKind::Image),
            "video" => Ok(ContentKind::Video),
            "audio" => Ok(ContentKind::Audio),
            other => Err(format!("unknown content type '{}'", other)),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl From<MediaKind> for ContentKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => ContentKind::Image,
            MediaKind::Video => ContentKind::Video,
            MediaKind::Audio => ContentKind::Audio,
        }
    }
}

/// Media attached to a field: a file waiting to be uploaded, or the URL of one already stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaRef {
    #[serde(rename = "file")]
    Pending(LocalFile),
    #[serde(rename = "url")]
    Persisted(String),
}

impl MediaRef {
    pub fn is_pending(&self) -> bool {
        matches!(self, MediaRef::Pending(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            MediaRef::Pending(file) => file.path().as_os_str().is_empty(),
            MediaRef::Persisted(url) => url.trim().is_empty(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            MediaRef::Persisted(url) => Some(url),
            MediaRef::Pending(_) => None,
        }
    }

    fn resolved_against(&self, base: &Path) -> Self {
        match self {
            MediaRef::Pending(file) => MediaRef::Pending(file.resolved_against(base)),
            persisted => persisted.clone(),
        }
    }
}

/// Unvalidated content as submitted by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    #[serde(rename = "type")]
    pub kind: ContentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRef>,
}

impl ContentDraft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: ContentKind::Text,
            text: Some(text.into()),
            media: None,
        }
    }

    pub fn media(kind: MediaKind, media: MediaRef) -> Self {
        Self {
            kind: kind.into(),
            text: None,
            media: Some(media),
        }
    }
}

pub fn new_local_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintDraft {
    #[serde(default = "new_local_id")]
    pub local_id: String,
    #[serde(flatten)]
    pub content: ContentDraft,
}

impl HintDraft {
    pub fn new(local_id: impl Into<String>, content: ContentDraft) -> Self {
        Self {
            local_id: local_id.into(),
            content,
        }
    }
}

/// A candidate riddle edit, before validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiddleDraft {
    pub name: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riddle_image: Option<MediaRef>,
    pub success_message: ContentDraft,
    #[serde(default)]
    pub hints: Vec<HintDraft>,
}

impl RiddleDraft {
    /// Resolve every relative pending file against `base_dir`
    pub fn resolve_files(&mut self, base_dir: &Path) {
        let resolve = |media: &mut Option<MediaRef>| {
            if let Some(current) = media.as_mut() {
                *current = current.resolved_against(base_dir);
            }
        };
        resolve(&mut self.riddle_image);
        resolve(&mut self.success_message.media);
        for hint in &mut self.hints {
            resolve(&mut hint.content.media);
        }
    }
}

/// Validated content. Exactly one of text or media, as the kind dictates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Media { kind: MediaKind, media: MediaRef },
}

impl Content {
    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Text(_) => ContentKind::Text,
            Content::Media { kind, .. } => (*kind).into(),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Content::Text(text) => Some(text),
            Content::Media { .. } => None,
        }
    }

    pub fn media(&self) -> Option<&MediaRef> {
        match self {
            Content::Text(_) => None,
            Content::Media { media, .. } => Some(media),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HintItem {
    pub local_id: String,
    /// 1-based position in the list
    pub order: u32,
    pub content: Content,
}

/// A riddle edit accepted by the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiddleEdit {
    pub name: String,
    pub answer: String,
    pub riddle_image: MediaRef,
    pub success_message: Content,
    pub hints: Vec<HintItem>,
}

/// Content as read back from the store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredContent {
    pub kind: Option<ContentKind>,
    pub text: Option<String>,
    pub media: Option<String>,
}

impl StoredContent {
    fn to_draft(&self) -> ContentDraft {
        ContentDraft {
            kind: self.kind.unwrap_or(ContentKind::Text),
            text: self.text.clone(),
            media: self.media.clone().map(MediaRef::Persisted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedHint {
    pub persisted_id: String,
    pub local_id: String,
    pub order: u32,
    pub content: StoredContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Provenance {
    pub created_by: Option<String>,
    pub created_at: Option<String>,
    pub updated_by: Option<String>,
    pub updated_at: Option<String>,
}

/// The last-known persisted state of a riddle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiddleSnapshot {
    pub id: String,
    pub book_id: String,
    pub name: String,
    pub answer: String,
    pub riddle_image: Option<String>,
    pub success_message: StoredContent,
    /// Sorted by order
    pub hints: Vec<PersistedHint>,
    pub provenance: Provenance,
}

impl RiddleSnapshot {
    /// The persisted hint with `local_id`, the lowest-ordered one when several share it
    pub fn hint(&self, local_id: &str) -> Option<&PersistedHint> {
        self.hints
            .iter()
            .filter(|hint| hint.local_id == local_id)
            .min_by_key(|hint| hint.order)
    }

    /// The riddle as an editable draft. Copies of a duplicated `localId` are left out.
    pub fn to_draft(&self) -> RiddleDraft {
        RiddleDraft {
            name: self.name.clone(),
            answer: self.answer.clone(),
            riddle_image: self.riddle_image.clone().map(MediaRef::Persisted),
            success_message: self.success_message.to_draft(),
            hints: self
                .hints
                .iter()
                .filter(|hint| {
                    self.hint(&hint.local_id)
                        .is_some_and(|kept| std::ptr::eq(kept, *hint))
                })
                .map(|hint| HintDraft::new(hint.local_id.clone(), hint.content.to_draft()))
                .collect(),
        }
    }
}

/// A media field of a riddle, naming both its blob and its progress label
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaField {
    RiddleImage,
    SuccessMessage,
    Hint {
        local_id: String,
        /// 1-based position in the submitted list
        position: u32,
    },
}

impl MediaField {
    /// Blob file name without extension
    pub fn field_name(&self) -> String {
        match self {
            MediaField::RiddleImage => "riddleImage".to_string(),
            MediaField::SuccessMessage => "successMsgMedia".to_string(),
            MediaField::Hint { local_id, .. } => {
                let safe: String = local_id
                    .chars()
                    .map(|c| {
                        if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                            c
                        } else {
                            '_'
                        }
                    })
                    .collect();
                format!("hint_{}", safe)
            }
        }
    }
}

impl fmt::Display for MediaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaField::RiddleImage => f.write_str("riddle image"),
            MediaField::SuccessMessage => f.write_str("success message media"),
            MediaField::Hint { position, .. } => write!(f, "hint {} media", position),
        }
    }
}
