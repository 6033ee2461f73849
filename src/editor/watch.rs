use crate::blob::BlobStore;
use crate::editor::error::WatchError;
use crate::editor::orchestrator::RiddleEditor;
use crate::identity::Identity;
use crate::riddle::codec::decode_riddle;
use crate::riddle::paths::{hints_collection, riddle_path};
use crate::riddle::RiddleSnapshot;
use crate::store::{Document, DocumentStore, Snapshot, Subscription, WatchTarget};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The latest pushed state of a riddle document and its hints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RiddleView {
    pub riddle: Option<Document>,
    pub hints: Vec<Document>,
}

impl RiddleView {
    pub fn snapshot(&self, book_id: &str) -> Option<RiddleSnapshot> {
        self.riddle
            .as_ref()
            .map(|doc| decode_riddle(book_id, doc, &self.hints))
    }
}

/// A live view of one riddle, fed by two listeners independent of any save
///
/// Dropping the watch detaches both listeners.
pub struct RiddleWatch {
    book_id: String,
    view: watch::Receiver<RiddleView>,
    errors: Vec<WatchError>,
    pump: Option<JoinHandle<()>>,
}

impl RiddleWatch {
    pub fn current(&self) -> RiddleView {
        self.view.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<RiddleSnapshot> {
        self.view.borrow().snapshot(&self.book_id)
    }

    /// Wait for the view to change. `false` once no listener is left.
    pub async fn changed(&mut self) -> bool {
        self.view.changed().await.is_ok()
    }

    /// Listeners that failed to attach
    pub fn errors(&self) -> &[WatchError] {
        &self.errors
    }
}

impl Drop for RiddleWatch {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<Snapshot> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => None,
    }
}

/// Skip to the newest queued snapshot so a burst of writes updates the view once
fn newest(subscription: &mut Option<Subscription>, snapshot: Snapshot) -> Snapshot {
    subscription
        .as_mut()
        .and_then(Subscription::latest)
        .unwrap_or(snapshot)
}

fn apply(view: &watch::Sender<RiddleView>, snapshot: Snapshot) {
    view.send_modify(|current| match snapshot {
        Snapshot::Record(doc) => current.riddle = doc,
        Snapshot::Collection(docs) => current.hints = docs,
    });
}

async fn pump_view(
    mut riddle: Option<Subscription>,
    mut hints: Option<Subscription>,
    view: watch::Sender<RiddleView>,
) {
    loop {
        tokio::select! {
            Some(snapshot) = next_snapshot(&mut riddle) => {
                apply(&view, newest(&mut riddle, snapshot))
            }
            Some(snapshot) = next_snapshot(&mut hints) => {
                apply(&view, newest(&mut hints, snapshot))
            }
            else => break,
        }
    }
    debug!("Riddle view listeners closed");
}

impl<D: DocumentStore, B: BlobStore, I: Identity> RiddleEditor<D, B, I> {
    async fn attach(
        &self,
        target: WatchTarget,
        errors: &mut Vec<WatchError>,
    ) -> Option<Subscription> {
        match self.store.subscribe(target.clone()).await {
            Ok(subscription) => {
                debug!("Listening to {}", subscription.target());
                Some(subscription)
            }
            Err(source) => {
                warn!("Failed to subscribe to {}: {}", target, source);
                errors.push(WatchError::Subscribe { target, source });
                None
            }
        }
    }

    /// Watch a riddle and its hints
    ///
    /// A listener that fails to attach is reported in `errors()` and its half of the view
    /// stays empty.
    pub async fn watch_riddle(&self, book_id: &str, riddle_id: &str) -> RiddleWatch {
        let mut errors = Vec::new();
        let riddle = self
            .attach(
                WatchTarget::Record(riddle_path(book_id, riddle_id)),
                &mut errors,
            )
            .await;
        let hints = self
            .attach(
                WatchTarget::Collection(hints_collection(book_id, riddle_id)),
                &mut errors,
            )
            .await;

        let (view_tx, view_rx) = watch::channel(RiddleView::default());
        let pump = if riddle.is_none() && hints.is_none() {
            None
        } else {
            Some(tokio::spawn(pump_view(riddle, hints, view_tx)))
        };

        RiddleWatch {
            book_id: book_id.to_string(),
            view: view_rx,
            errors,
            pump,
        }
    }
}
