//! Mapping between riddle types and flat document fields

use crate::identity::Actor;
use crate::riddle::model::{
    Content, ContentKind, HintItem, MediaField, PersistedHint, Provenance, RiddleEdit,
    RiddleSnapshot, StoredContent,
};
use crate::store::{Document, Fields};
use serde_json::Value;
use tracing::warn;

pub const NAME: &str = "name";
pub const ANSWER: &str = "answer";
pub const BOOK_ID: &str = "bookId";
pub const RIDDLE_IMAGE: &str = "riddleImage";
pub const SUCCESS_MSG_TYPE: &str = "successMsgType";
pub const SUCCESS_MSG_TEXT: &str = "successMsgText";
pub const SUCCESS_MSG_MEDIA: &str = "successMsgMedia";
pub const CREATED_BY: &str = "createdBy";
pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_BY: &str = "updatedBy";
pub const UPDATED_AT: &str = "updatedAt";

pub const HINT_LOCAL_ID: &str = "localId";
pub const HINT_TYPE: &str = "type";
pub const HINT_TEXT: &str = "text";
pub const HINT_MEDIA: &str = "media";
pub const HINT_ORDER: &str = "order";

fn string(value: &str) -> Value {
    Value::String(value.to_string())
}

fn optional(value: Option<&str>) -> Value {
    value.map(string).unwrap_or(Value::Null)
}

/// Non-media fields of a riddle plus provenance
///
/// Creation stamps are only written for a new riddle. A text success message clears any
/// stored success media.
pub fn riddle_metadata(
    edit: &RiddleEdit,
    book_id: &str,
    actor: &Actor,
    now: &str,
    is_new: bool,
) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.to_string(), string(&edit.name));
    fields.insert(ANSWER.to_string(), string(&edit.answer));
    fields.insert(BOOK_ID.to_string(), string(book_id));
    fields.insert(
        SUCCESS_MSG_TYPE.to_string(),
        string(edit.success_message.kind().as_str()),
    );
    fields.insert(
        SUCCESS_MSG_TEXT.to_string(),
        optional(edit.success_message.text()),
    );
    if let Content::Text(_) = edit.success_message {
        fields.insert(SUCCESS_MSG_MEDIA.to_string(), Value::Null);
    }

    if is_new {
        fields.insert(CREATED_BY.to_string(), string(&actor.uid));
        fields.insert(CREATED_AT.to_string(), string(now));
    }
    fields.insert(UPDATED_BY.to_string(), string(&actor.uid));
    fields.insert(UPDATED_AT.to_string(), string(now));
    fields
}

/// Patch storing an uploaded URL on the riddle document, `None` for hint media
pub fn parent_media_fields(field: &MediaField, url: &str) -> Option<Fields> {
    let key = match field {
        MediaField::RiddleImage => RIDDLE_IMAGE,
        MediaField::SuccessMessage => SUCCESS_MSG_MEDIA,
        MediaField::Hint { .. } => return None,
    };
    let mut fields = Fields::new();
    fields.insert(key.to_string(), string(url));
    Some(fields)
}

/// Every field of a hint document; the attribute the kind does not use is cleared
pub fn hint_fields(item: &HintItem, media_url: Option<&str>) -> Fields {
    let mut fields = Fields::new();
    fields.insert(HINT_LOCAL_ID.to_string(), string(&item.local_id));
    fields.insert(HINT_TYPE.to_string(), string(item.content.kind().as_str()));
    fields.insert(HINT_ORDER.to_string(), Value::from(item.order));
    fields.insert(HINT_TEXT.to_string(), optional(item.content.text()));
    fields.insert(HINT_MEDIA.to_string(), optional(media_url));
    fields
}

pub fn book_fields(name: &str, actor: &Actor, now: &str) -> Fields {
    let mut fields = Fields::new();
    fields.insert(NAME.to_string(), string(name));
    fields.insert(CREATED_BY.to_string(), string(&actor.uid));
    fields.insert(CREATED_AT.to_string(), string(now));
    fields
}

fn content_kind(doc: &Document, key: &str) -> Option<ContentKind> {
    let raw = doc.str_field(key)?;
    match raw.parse() {
        Ok(kind) => Some(kind),
        Err(e) => {
            warn!("Ignoring {} of {}: {}", key, doc.path, e);
            None
        }
    }
}

fn owned(doc: &Document, key: &str) -> Option<String> {
    doc.str_field(key).map(str::to_string)
}

/// Read a hint document, `None` when its type is missing or unknown
pub fn decode_hint(doc: &Document) -> Option<PersistedHint> {
    let kind = match content_kind(doc, HINT_TYPE) {
        Some(kind) => kind,
        None => {
            warn!("Skipping hint {} without a usable type", doc.path);
            return None;
        }
    };

    Some(PersistedHint {
        persisted_id: doc.id.clone(),
        // Hints written without a localId are matched by their document id
        local_id: owned(doc, HINT_LOCAL_ID)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| doc.id.clone()),
        order: doc.u32_field(HINT_ORDER).unwrap_or(0),
        content: StoredContent {
            kind: Some(kind),
            text: owned(doc, HINT_TEXT),
            media: owned(doc, HINT_MEDIA),
        },
    })
}

/// Assemble a riddle from its document and its hint documents
pub fn decode_riddle(book_id: &str, doc: &Document, hint_docs: &[Document]) -> RiddleSnapshot {
    let mut hints: Vec<PersistedHint> = hint_docs.iter().filter_map(decode_hint).collect();
    hints.sort_by_key(|hint| hint.order);

    RiddleSnapshot {
        id: doc.id.clone(),
        book_id: owned(doc, BOOK_ID).unwrap_or_else(|| book_id.to_string()),
        name: owned(doc, NAME).unwrap_or_default(),
        answer: owned(doc, ANSWER).unwrap_or_default(),
        riddle_image: owned(doc, RIDDLE_IMAGE),
        success_message: StoredContent {
            kind: content_kind(doc, SUCCESS_MSG_TYPE),
            text: owned(doc, SUCCESS_MSG_TEXT),
            media: owned(doc, SUCCESS_MSG_MEDIA),
        },
        hints,
        provenance: Provenance {
            created_by: owned(doc, CREATED_BY),
            created_at: owned(doc, CREATED_AT),
            updated_by: owned(doc, UPDATED_BY),
            updated_at: owned(doc, UPDATED_AT),
        },
    }
}
