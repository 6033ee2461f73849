use crate::blob::LocalFile;
use crate::riddle::diff::{diff_hints, HintChanges};
use crate::riddle::model::{
    Content, ContentKind, HintItem, MediaKind, MediaRef, PersistedHint, StoredContent,
};
use std::collections::HashSet;

fn persisted_text(persisted_id: &str, local_id: &str, order: u32, text: &str) -> PersistedHint {
    PersistedHint {
        persisted_id: persisted_id.to_string(),
        local_id: local_id.to_string(),
        order,
        content: StoredContent {
            kind: Some(ContentKind::Text),
            text: Some(text.to_string()),
            media: None,
        },
    }
}

fn persisted_image(persisted_id: &str, local_id: &str, order: u32, url: &str) -> PersistedHint {
    PersistedHint {
        persisted_id: persisted_id.to_string(),
        local_id: local_id.to_string(),
        order,
        content: StoredContent {
            kind: Some(ContentKind::Image),
            text: None,
            media: Some(url.to_string()),
        },
    }
}

fn text_item(local_id: &str, order: u32, text: &str) -> HintItem {
    HintItem {
        local_id: local_id.to_string(),
        order,
        content: Content::Text(text.to_string()),
    }
}

fn image_item(local_id: &str, order: u32, media: MediaRef) -> HintItem {
    HintItem {
        local_id: local_id.to_string(),
        order,
        content: Content::Media {
            kind: MediaKind::Image,
            media,
        },
    }
}

#[test]
fn resubmitting_unchanged_hints_produces_no_operations() {
    let persisted = vec![
        persisted_text("h1", "a", 1, "first"),
        persisted_image("h2", "b", 2, "https://cdn/b.png"),
    ];
    let next = vec![
        text_item("a", 1, "first"),
        image_item("b", 2, MediaRef::Persisted("https://cdn/b.png".to_string())),
    ];

    let diff = diff_hints(&persisted, &next);

    assert!(diff.is_empty());
    assert_eq!(diff.operation_count(), 0);
    assert_eq!(diff.unchanged, vec!["a".to_string(), "b".to_string()]);
}

#[test]
fn removing_a_hint_deletes_only_that_hint() {
    let persisted = vec![
        persisted_text("h1", "a", 1, "first"),
        persisted_text("h2", "b", 2, "second"),
    ];
    let next = vec![text_item("a", 1, "first")];

    let diff = diff_hints(&persisted, &next);

    assert!(diff.creates.is_empty());
    assert!(diff.updates.is_empty());
    assert_eq!(diff.deletes.len(), 1);
    assert_eq!(diff.deletes[0].persisted_id, "h2");
    assert_eq!(diff.deletes[0].local_id, "b");
}

#[test]
fn new_items_are_created_in_list_order() {
    let persisted = vec![persisted_text("h1", "a", 1, "first")];
    let next = vec![
        text_item("x", 1, "new first"),
        text_item("a", 2, "first"),
        text_item("y", 3, "new last"),
    ];

    let diff = diff_hints(&persisted, &next);

    let created: Vec<(&str, u32)> = diff
        .creates
        .iter()
        .map(|create| (create.item.local_id.as_str(), create.item.order))
        .collect();
    assert_eq!(created, vec![("x", 1), ("y", 3)]);
    assert_eq!(diff.updates.len(), 1);
    assert_eq!(
        diff.updates[0].changes,
        HintChanges {
            order: true,
            ..HintChanges::default()
        }
    );
}

#[test]
fn reorder_updates_only_orders() {
    let persisted = vec![
        persisted_text("h1", "a", 1, "first"),
        persisted_text("h2", "b", 2, "second"),
        persisted_text("h3", "c", 3, "third"),
    ];
    let next = vec![
        text_item("c", 1, "third"),
        text_item("b", 2, "second"),
        text_item("a", 3, "first"),
    ];

    let diff = diff_hints(&persisted, &next);

    let updated: Vec<&str> = diff
        .updates
        .iter()
        .map(|update| update.persisted_id.as_str())
        .collect();
    assert_eq!(updated, vec!["h3", "h1"]);
    assert!(diff.updates.iter().all(|update| update.changes.order
        && !update.changes.text
        && !update.changes.kind
        && !update.changes.media));
    assert_eq!(diff.unchanged, vec!["b".to_string()]);
}

#[test]
fn only_a_new_file_counts_as_media_change() {
    let persisted = vec![
        persisted_image("h1", "a", 1, "https://cdn/a.png"),
        persisted_image("h2", "b", 2, "https://cdn/b.png"),
    ];
    let next = vec![
        // Same media, URL formatted differently
        image_item("a", 1, MediaRef::Persisted("https://cdn/a.png?alt=media".to_string())),
        image_item("b", 2, MediaRef::Pending(LocalFile::new("/m/new-b.png"))),
    ];

    let diff = diff_hints(&persisted, &next);

    assert_eq!(diff.unchanged, vec!["a".to_string()]);
    assert_eq!(diff.updates.len(), 1);
    assert_eq!(diff.updates[0].persisted_id, "h2");
    assert!(diff.updates[0].changes.media);
}

#[test]
fn switching_kind_marks_kind_and_text_changed() {
    let persisted = vec![persisted_text("h1", "a", 1, "words")];
    let next = vec![image_item("a", 1, MediaRef::Pending(LocalFile::new("/m/a.png")))];

    let diff = diff_hints(&persisted, &next);

    assert_eq!(
        diff.updates[0].changes,
        HintChanges {
            kind: true,
            text: true,
            media: true,
            order: false,
        }
    );
}

#[test]
fn duplicate_persisted_local_ids_keep_lowest_order_and_delete_copies() {
    let persisted = vec![
        persisted_text("late", "a", 3, "copy"),
        persisted_text("early", "a", 1, "original"),
        persisted_text("h2", "b", 2, "second"),
    ];
    let next = vec![text_item("a", 1, "edited")];

    let diff = diff_hints(&persisted, &next);

    assert_eq!(diff.updates.len(), 1);
    assert_eq!(diff.updates[0].persisted_id, "early");
    let deleted: Vec<&str> = diff.deletes.iter().map(|d| d.persisted_id.as_str()).collect();
    assert_eq!(deleted, vec!["h2", "late"]);
    assert_eq!(diff.deletes[1].local_id, "a");
}

#[test]
fn duplicate_copy_is_deleted_even_when_unchanged() {
    let persisted = vec![
        persisted_text("h1", "a", 1, "first"),
        persisted_text("h2", "b", 2, "second"),
        persisted_text("copy", "a", 2, "first"),
    ];
    let next = vec![text_item("a", 1, "first"), text_item("b", 2, "second")];

    let diff = diff_hints(&persisted, &next);

    assert!(diff.creates.is_empty());
    assert!(diff.updates.is_empty());
    assert_eq!(diff.unchanged, vec!["a".to_string(), "b".to_string()]);
    let deleted: Vec<&str> = diff.deletes.iter().map(|d| d.persisted_id.as_str()).collect();
    assert_eq!(deleted, vec!["copy"]);
}

#[test]
fn categories_partition_the_local_ids() {
    let persisted = vec![
        persisted_text("h1", "a", 1, "a"),
        persisted_text("h2", "b", 2, "b"),
        persisted_text("h3", "c", 3, "c"),
        persisted_text("h4", "d", 4, "d"),
    ];
    let next = vec![
        text_item("d", 1, "d"),
        text_item("b", 2, "b"),
        text_item("e", 3, "e"),
        text_item("a", 4, "changed"),
    ];

    let diff = diff_hints(&persisted, &next);

    let mut seen = HashSet::new();
    for id in diff
        .creates
        .iter()
        .map(|c| c.item.local_id.clone())
        .chain(diff.updates.iter().map(|u| u.item.local_id.clone()))
        .chain(diff.unchanged.iter().cloned())
    {
        assert!(seen.insert(id), "localId in more than one category");
    }
    let next_ids: HashSet<String> = next.iter().map(|item| item.local_id.clone()).collect();
    assert_eq!(seen, next_ids);

    let deleted: HashSet<&str> = diff.deletes.iter().map(|d| d.local_id.as_str()).collect();
    assert_eq!(deleted, HashSet::from(["c"]));
}

#[test]
fn empty_lists_diff_to_nothing() {
    let diff = diff_hints(&[], &[]);
    assert!(diff.is_empty());
    assert!(diff.unchanged.is_empty());
}
