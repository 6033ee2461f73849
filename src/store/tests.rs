use crate::store::models::{Fields, Snapshot, WatchTarget};
use crate::store::{DocumentStore, FakeDocumentStore, SqliteDocumentStore, StoreCall, StoreError};
use futures::future::join_all;
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;

// Type alias to simplify the complex type for store factory functions
type StoreFactory = Box<dyn Fn() -> Box<dyn DocumentStore>>;

/// Helper function to create test store implementations
fn get_test_stores() -> Vec<StoreFactory> {
    vec![
        // Always include the FakeDocumentStore
        Box::new(|| Box::new(FakeDocumentStore::new()) as Box<dyn DocumentStore>),
        // ":memory:" creates a database that exists only in RAM
        Box::new(|| {
            let store = SqliteDocumentStore::new(":memory:")
                .expect("Failed to create in-memory SQLite store");
            Box::new(store) as Box<dyn DocumentStore>
        }),
    ]
}

fn fields(value: serde_json::Value) -> Fields {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

async fn next_snapshot(subscription: &mut crate::store::Subscription) -> Snapshot {
    timeout(Duration::from_secs(1), subscription.next())
        .await
        .expect("timed out waiting for snapshot")
        .expect("subscription closed")
}

#[tokio::test]
async fn create_record_assigns_distinct_ids() {
    for factory in get_test_stores() {
        let store = factory();

        let first = store
            .create_record("books", fields(json!({"name": "First"})))
            .await
            .unwrap();
        let second = store
            .create_record("books", fields(json!({"name": "Second"})))
            .await
            .unwrap();

        assert_ne!(first, second);
        let doc = store.get_record(&format!("books/{first}")).await.unwrap().unwrap();
        assert_eq!(doc.id, first);
        assert_eq!(doc.str_field("name"), Some("First"));
    }
}

#[tokio::test]
async fn create_record_rejects_record_path() {
    for factory in get_test_stores() {
        let store = factory();
        let result = store.create_record("books/b1", Fields::new()).await;
        assert!(matches!(result, Err(StoreError::InvalidPath(_, _))));
    }
}

#[tokio::test]
async fn merge_write_keeps_unnamed_fields_and_clears_nulls() {
    for factory in get_test_stores() {
        let store = factory();
        let id = store
            .create_record(
                "books/b1/riddles",
                fields(json!({"name": "Sphinx", "answer": "man", "riddleImage": "https://x/a.png"})),
            )
            .await
            .unwrap();
        let path = format!("books/b1/riddles/{id}");

        store
            .merge_write_record(&path, fields(json!({"answer": "human", "riddleImage": null})))
            .await
            .unwrap();

        let doc = store.get_record(&path).await.unwrap().unwrap();
        assert_eq!(doc.str_field("name"), Some("Sphinx"));
        assert_eq!(doc.str_field("answer"), Some("human"));
        assert!(!doc.fields.contains_key("riddleImage"));
    }
}

#[tokio::test]
async fn merge_write_creates_missing_record() {
    for factory in get_test_stores() {
        let store = factory();
        store
            .merge_write_record("books/b1/riddles/r1", fields(json!({"name": "New"})))
            .await
            .unwrap();

        let doc = store.get_record("books/b1/riddles/r1").await.unwrap().unwrap();
        assert_eq!(doc.id, "r1");
        assert_eq!(doc.str_field("name"), Some("New"));
    }
}

#[tokio::test]
async fn delete_record_is_idempotent() {
    for factory in get_test_stores() {
        let store = factory();
        let id = store.create_record("books", Fields::new()).await.unwrap();
        let path = format!("books/{id}");

        store.delete_record(&path).await.unwrap();
        store.delete_record(&path).await.unwrap();

        assert!(store.get_record(&path).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn list_records_returns_direct_children_oldest_first() {
    for factory in get_test_stores() {
        let store = factory();
        let collection = "books/b1/riddles/r1/hints";
        let mut ids = Vec::new();
        for i in 0..3 {
            ids.push(
                store
                    .create_record(collection, fields(json!({"order": i + 1})))
                    .await
                    .unwrap(),
            );
        }
        // Records in a sibling and a nested collection stay out
        store.create_record("books/b1/riddles", Fields::new()).await.unwrap();
        store
            .create_record("books/b1/riddles/r2/hints", Fields::new())
            .await
            .unwrap();

        // Updating does not move a record to the end
        store
            .merge_write_record(&format!("{collection}/{}", ids[0]), fields(json!({"order": 9})))
            .await
            .unwrap();

        let listed: Vec<String> = store
            .list_records(collection)
            .await
            .unwrap()
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(listed, ids);
    }
}

#[tokio::test]
async fn record_subscription_sees_initial_state_and_writes() {
    for factory in get_test_stores() {
        let store = factory();
        store
            .merge_write_record("books/b1/riddles/r1", fields(json!({"name": "Before"})))
            .await
            .unwrap();

        let mut subscription = store
            .subscribe(WatchTarget::Record("books/b1/riddles/r1".to_string()))
            .await
            .unwrap();

        match next_snapshot(&mut subscription).await {
            Snapshot::Record(Some(doc)) => assert_eq!(doc.str_field("name"), Some("Before")),
            other => panic!("unexpected initial snapshot: {other:?}"),
        }

        store
            .merge_write_record("books/b1/riddles/r1", fields(json!({"name": "After"})))
            .await
            .unwrap();
        match next_snapshot(&mut subscription).await {
            Snapshot::Record(Some(doc)) => assert_eq!(doc.str_field("name"), Some("After")),
            other => panic!("unexpected snapshot: {other:?}"),
        }

        store.delete_record("books/b1/riddles/r1").await.unwrap();
        assert_eq!(next_snapshot(&mut subscription).await, Snapshot::Record(None));
    }
}

#[tokio::test]
async fn collection_subscription_ignores_unrelated_writes() {
    for factory in get_test_stores() {
        let store = factory();
        let mut subscription = store
            .subscribe(WatchTarget::Collection("books/b1/riddles/r1/hints".to_string()))
            .await
            .unwrap();
        assert_eq!(
            next_snapshot(&mut subscription).await,
            Snapshot::Collection(Vec::new())
        );

        store
            .merge_write_record("books/b1/riddles/r1", fields(json!({"name": "Parent"})))
            .await
            .unwrap();
        store
            .create_record("books/b1/riddles/r1/hints", fields(json!({"order": 1})))
            .await
            .unwrap();

        match next_snapshot(&mut subscription).await {
            Snapshot::Collection(docs) => {
                assert_eq!(docs.len(), 1);
                assert_eq!(docs[0].u32_field("order"), Some(1));
            }
            other => panic!("unexpected snapshot: {other:?}"),
        }
        assert!(subscription.latest().is_none());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_leave_listeners_on_the_newest_snapshot() {
    for factory in get_test_stores() {
        let store = factory();
        let collection = "books/b1/riddles/r1/hints";
        let mut subscription = store
            .subscribe(WatchTarget::Collection(collection.to_string()))
            .await
            .unwrap();

        let writes = (1..=8u32).map(|order| {
            let store = &store;
            async move {
                store
                    .create_record(collection, fields(json!({ "order": order })))
                    .await
            }
        });
        for result in join_all(writes).await {
            result.unwrap();
        }

        match subscription.latest() {
            Some(Snapshot::Collection(docs)) => assert_eq!(docs.len(), 8),
            other => panic!("unexpected snapshot: {other:?}"),
        }
    }
}

#[tokio::test]
async fn fake_records_calls_and_simulates_failures() {
    let store = FakeDocumentStore::new();
    store.fake_fail_path("books/b1/riddles/r1/hints");

    let result = store
        .create_record("books/b1/riddles/r1/hints", Fields::new())
        .await;
    assert!(matches!(result, Err(StoreError::OperationError(_))));

    store
        .merge_write_record("books/b1/riddles/r1", fields(json!({"name": "ok"})))
        .await
        .unwrap();
    assert_eq!(
        store.fake_calls(),
        vec![StoreCall::MergeWrite {
            path: "books/b1/riddles/r1".to_string(),
            fields: fields(json!({"name": "ok"})),
        }]
    );

    store.fake_reset_failures();
    store
        .create_record("books/b1/riddles/r1/hints", Fields::new())
        .await
        .unwrap();
    assert_eq!(store.fake_calls_in("books/b1/riddles/r1/hints").len(), 1);

    store.fake_clear_calls();
    assert!(store.fake_calls().is_empty());
}

#[tokio::test]
async fn dropped_subscription_is_unregistered() {
    let store = FakeDocumentStore::new();
    let subscription = store
        .subscribe(WatchTarget::Record("books/b1".to_string()))
        .await
        .unwrap();
    assert_eq!(store.fake_listener_count(), 1);

    drop(subscription);
    assert_eq!(store.fake_listener_count(), 0);

    store.fake_fail_subscriptions();
    let result = store
        .subscribe(WatchTarget::Record("books/b1".to_string()))
        .await;
    assert!(matches!(result, Err(StoreError::SubscriptionUnavailable(_))));
}
