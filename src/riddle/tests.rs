use crate::blob::LocalFile;
use crate::riddle::codec::{decode_riddle, hint_fields, riddle_metadata};
use crate::riddle::model::{
    Content, ContentDraft, ContentKind, HintDraft, MediaField, MediaKind, MediaRef,
    PersistedHint, Provenance, RiddleDraft, RiddleSnapshot, StoredContent,
};
use crate::riddle::validate::{validate, validate_book_name, MAX_FIELD_LEN};
use crate::store::{Document, Fields};
use crate::test_utils::{media_hint, riddle_draft, test_actor, text_hint};
use serde_json::json;

fn image() -> LocalFile {
    LocalFile::new("/media/riddle.png")
}

fn persisted_snapshot() -> RiddleSnapshot {
    RiddleSnapshot {
        id: "r1".to_string(),
        book_id: "b1".to_string(),
        name: "The Sphinx".to_string(),
        answer: "man".to_string(),
        riddle_image: Some("https://cdn/riddleImage.png".to_string()),
        success_message: StoredContent {
            kind: Some(ContentKind::Video),
            text: None,
            media: Some("https://cdn/successMsgMedia.mp4".to_string()),
        },
        hints: vec![PersistedHint {
            persisted_id: "h1".to_string(),
            local_id: "a".to_string(),
            order: 1,
            content: StoredContent {
                kind: Some(ContentKind::Audio),
                text: None,
                media: Some("https://cdn/hint_a.mp3".to_string()),
            },
        }],
        provenance: Provenance::default(),
    }
}

#[test]
fn valid_draft_is_normalized_with_contiguous_orders() {
    let draft = RiddleDraft {
        name: "  The Sphinx ".to_string(),
        ..riddle_draft(
            Some(image()),
            vec![
                text_hint("a", " Walks on four legs "),
                media_hint("b", MediaKind::Image, &LocalFile::new("/media/b.png")),
                text_hint("c", "Then on three"),
            ],
        )
    };

    let edit = validate(&draft, None).unwrap();

    assert_eq!(edit.name, "The Sphinx");
    assert_eq!(edit.riddle_image, MediaRef::Pending(image()));
    assert_eq!(edit.success_message, Content::Text("Well done!".to_string()));
    let orders: Vec<u32> = edit.hints.iter().map(|hint| hint.order).collect();
    assert_eq!(orders, vec![1, 2, 3]);
    assert_eq!(
        edit.hints[0].content,
        Content::Text("Walks on four legs".to_string())
    );
}

#[test]
fn empty_hint_list_is_valid() {
    let edit = validate(&riddle_draft(Some(image()), Vec::new()), None).unwrap();
    assert!(edit.hints.is_empty());
}

#[test]
fn text_hint_with_empty_text_is_rejected() {
    let draft = riddle_draft(
        Some(image()),
        vec![text_hint("a", "fine"), text_hint("b", "   ")],
    );

    let errors = validate(&draft, None).unwrap_err();

    assert_eq!(errors.len(), 1);
    assert_eq!(errors.get("hints[1].text"), Some("is required"));
}

#[test]
fn media_hint_without_media_is_rejected() {
    let mut hint = media_hint("a", MediaKind::Image, &image());
    hint.content.media = None;

    let errors = validate(&riddle_draft(Some(image()), vec![hint]), None).unwrap_err();

    assert!(errors.contains("hints[0].media"));
}

#[test]
fn text_hint_carrying_media_is_accepted_and_media_dropped() {
    let mut hint = text_hint("a", "Look closer");
    hint.content.media = Some(MediaRef::Pending(LocalFile::new("/media/x.png")));

    let edit = validate(&riddle_draft(Some(image()), vec![hint]), None).unwrap();

    assert_eq!(edit.hints[0].content, Content::Text("Look closer".to_string()));
}

#[test]
fn new_riddle_requires_riddle_image() {
    let errors = validate(&riddle_draft(None, Vec::new()), None).unwrap_err();
    assert_eq!(errors.get("riddleImage"), Some("is required"));
}

#[test]
fn new_riddle_rejects_persisted_media() {
    let mut draft = riddle_draft(Some(image()), Vec::new());
    draft.riddle_image = Some(MediaRef::Persisted("https://cdn/old.png".to_string()));

    let errors = validate(&draft, None).unwrap_err();

    assert!(errors.contains("riddleImage"));
}

#[test]
fn edit_falls_back_to_persisted_media() {
    let existing = persisted_snapshot();
    let mut hint = media_hint("a", MediaKind::Audio, &image());
    hint.content.media = None;
    let draft = RiddleDraft {
        success_message: ContentDraft {
            kind: ContentKind::Video,
            text: None,
            media: None,
        },
        ..riddle_draft(None, vec![hint])
    };

    let edit = validate(&draft, Some(&existing)).unwrap();

    assert_eq!(
        edit.riddle_image,
        MediaRef::Persisted("https://cdn/riddleImage.png".to_string())
    );
    assert_eq!(
        edit.success_message.media(),
        Some(&MediaRef::Persisted(
            "https://cdn/successMsgMedia.mp4".to_string()
        ))
    );
    assert_eq!(
        edit.hints[0].content.media(),
        Some(&MediaRef::Persisted("https://cdn/hint_a.mp3".to_string()))
    );
}

#[test]
fn new_hint_in_edit_mode_still_needs_media() {
    let existing = persisted_snapshot();
    let mut hint = media_hint("new", MediaKind::Image, &image());
    hint.content.media = None;

    let errors = validate(&riddle_draft(None, vec![hint]), Some(&existing)).unwrap_err();

    assert!(errors.contains("hints[0].media"));
}

#[test]
fn duplicate_and_empty_local_ids_are_rejected() {
    let draft = riddle_draft(
        Some(image()),
        vec![
            text_hint("a", "one"),
            text_hint("a", "two"),
            text_hint(" ", "three"),
        ],
    );

    let errors = validate(&draft, None).unwrap_err();

    assert_eq!(errors.get("hints[1].localId"), Some("duplicates an earlier hint"));
    assert_eq!(errors.get("hints[2].localId"), Some("is required"));
    assert!(!errors.contains("hints[0].localId"));
}

#[test]
fn overlong_fields_are_rejected() {
    let long = "x".repeat(MAX_FIELD_LEN + 1);
    let mut draft = riddle_draft(Some(image()), Vec::new());
    draft.answer = long.clone();
    draft.success_message = ContentDraft::text(long.clone());

    let errors = validate(&draft, None).unwrap_err();

    assert!(errors.contains("answer"));
    assert!(errors.contains("successMessage.text"));
    assert!(validate_book_name(&long).is_err());
    assert_eq!(validate_book_name(" Myths ").unwrap(), "Myths");
}

#[test]
fn errors_are_collected_across_fields() {
    let draft = RiddleDraft {
        name: String::new(),
        answer: String::new(),
        riddle_image: None,
        success_message: ContentDraft {
            kind: ContentKind::Image,
            text: None,
            media: None,
        },
        hints: vec![text_hint("a", "")],
    };

    let errors = validate(&draft, None).unwrap_err();

    let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "name",
            "answer",
            "riddleImage",
            "successMessage.media",
            "hints[0].text"
        ]
    );
    assert!(errors.to_string().starts_with("invalid riddle: name: is required"));
}

#[test]
fn draft_json_uses_tagged_media_and_generates_local_ids() {
    let draft: RiddleDraft = serde_json::from_value(json!({
        "name": "Sphinx",
        "answer": "man",
        "riddleImage": {"file": "media/riddle.png"},
        "successMessage": {"type": "audio", "media": {"url": "https://cdn/yay.mp3"}},
        "hints": [
            {"type": "text", "text": "Morning"},
            {"localId": "b", "type": "video", "media": {"file": "b.mp4"}}
        ]
    }))
    .unwrap();

    assert_eq!(
        draft.riddle_image,
        Some(MediaRef::Pending(LocalFile::new("media/riddle.png")))
    );
    assert_eq!(draft.success_message.kind, ContentKind::Audio);
    assert!(!draft.hints[0].local_id.is_empty());
    assert_eq!(draft.hints[1].local_id, "b");
    assert_eq!(draft.hints[1].content.kind, ContentKind::Video);
}

#[test]
fn resolve_files_only_touches_relative_pending_files() {
    let mut draft = riddle_draft(
        Some(LocalFile::new("riddle.png")),
        vec![media_hint("a", MediaKind::Image, &LocalFile::new("/abs/a.png"))],
    );
    draft.success_message =
        ContentDraft::media(MediaKind::Audio, MediaRef::Persisted("https://cdn/a".into()));

    draft.resolve_files(std::path::Path::new("/drafts"));

    assert_eq!(
        draft.riddle_image,
        Some(MediaRef::Pending(LocalFile::new("/drafts/riddle.png")))
    );
    assert_eq!(
        draft.hints[0].content.media,
        Some(MediaRef::Pending(LocalFile::new("/abs/a.png")))
    );
    assert_eq!(
        draft.success_message.media,
        Some(MediaRef::Persisted("https://cdn/a".to_string()))
    );
}

#[test]
fn media_field_names_and_labels() {
    let hint = MediaField::Hint {
        local_id: "a/b c".to_string(),
        position: 2,
    };
    assert_eq!(hint.field_name(), "hint_a_b_c");
    assert_eq!(hint.to_string(), "hint 2 media");
    assert_eq!(MediaField::RiddleImage.field_name(), "riddleImage");
    assert_eq!(MediaField::SuccessMessage.field_name(), "successMsgMedia");
    assert_eq!(MediaField::SuccessMessage.to_string(), "success message media");
}

#[test]
fn riddle_metadata_stamps_creation_only_for_new_riddles() {
    let edit = validate(&riddle_draft(Some(image()), Vec::new()), None).unwrap();
    let actor = test_actor();

    let created = riddle_metadata(&edit, "b1", &actor, "2024-01-01T00:00:00Z", true);
    assert_eq!(created["createdBy"], json!("editor-1"));
    assert_eq!(created["updatedAt"], json!("2024-01-01T00:00:00Z"));
    assert_eq!(created["successMsgType"], json!("text"));
    assert_eq!(created["successMsgMedia"], json!(null));
    assert!(!created.contains_key("riddleImage"));

    let updated = riddle_metadata(&edit, "b1", &actor, "2024-02-01T00:00:00Z", false);
    assert!(!updated.contains_key("createdBy"));
    assert!(!updated.contains_key("createdAt"));
    assert_eq!(updated["updatedBy"], json!("editor-1"));
}

#[test]
fn decode_riddle_reads_flat_fields_and_sorts_hints() {
    let fields = |value: serde_json::Value| -> Fields {
        serde_json::from_value(value).unwrap()
    };
    let riddle = Document::new(
        "books/b1/riddles/r1",
        fields(json!({
            "name": "Sphinx",
            "answer": "man",
            "bookId": "b1",
            "riddleImage": "https://cdn/r.png",
            "successMsgType": "text",
            "successMsgText": "Yes!",
            "createdBy": "editor-1"
        })),
    )
    .unwrap();
    let hints = vec![
        Document::new(
            "books/b1/riddles/r1/hints/h2",
            fields(json!({"localId": "b", "type": "image", "media": "https://cdn/b.png", "order": 2})),
        )
        .unwrap(),
        Document::new(
            "books/b1/riddles/r1/hints/h1",
            fields(json!({"type": "text", "text": "first", "order": 1})),
        )
        .unwrap(),
        Document::new(
            "books/b1/riddles/r1/hints/h3",
            fields(json!({"localId": "c", "type": "hologram", "order": 3})),
        )
        .unwrap(),
    ];

    let snapshot = decode_riddle("b1", &riddle, &hints);

    assert_eq!(snapshot.name, "Sphinx");
    assert_eq!(snapshot.success_message.text.as_deref(), Some("Yes!"));
    assert_eq!(snapshot.provenance.created_by.as_deref(), Some("editor-1"));
    let ids: Vec<&str> = snapshot.hints.iter().map(|h| h.local_id.as_str()).collect();
    // Missing localId falls back to the document id; the unknown type is skipped
    assert_eq!(ids, vec!["h1", "b"]);

    let draft = snapshot.to_draft();
    assert_eq!(
        draft.hints[1],
        HintDraft::new(
            "b",
            ContentDraft::media(
                MediaKind::Image,
                MediaRef::Persisted("https://cdn/b.png".to_string())
            )
        )
    );
}

#[test]
fn to_draft_skips_copies_of_a_duplicated_local_id() {
    let mut snapshot = persisted_snapshot();
    snapshot.hints.push(PersistedHint {
        persisted_id: "copy".to_string(),
        local_id: "a".to_string(),
        order: 2,
        content: StoredContent {
            kind: Some(ContentKind::Text),
            text: Some("stale".to_string()),
            media: None,
        },
    });

    let draft = snapshot.to_draft();

    assert_eq!(draft.hints.len(), 1);
    assert_eq!(draft.hints[0].content.kind, ContentKind::Audio);
    assert!(validate(&draft, Some(&snapshot)).is_ok());
}

#[test]
fn hint_fields_clear_the_unused_attribute() {
    let edit = validate(
        &riddle_draft(
            Some(image()),
            vec![media_hint("a", MediaKind::Video, &LocalFile::new("/m/a.mp4"))],
        ),
        None,
    )
    .unwrap();

    let fields = hint_fields(&edit.hints[0], Some("https://cdn/a.mp4"));

    assert_eq!(fields["type"], json!("video"));
    assert_eq!(fields["order"], json!(1));
    assert_eq!(fields["text"], json!(null));
    assert_eq!(fields["media"], json!("https://cdn/a.mp4"));
}
