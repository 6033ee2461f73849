use crate::blob::{BlobStore, LocalFile};
use crate::editor::error::{DeleteError, SaveError};
use crate::editor::progress::{track_upload, ProgressReporter, SaveEvent, SaveTask};
use crate::editor::stage::SaveStage;
use crate::identity::{Actor, Identity};
use crate::riddle::codec::{hint_fields, parent_media_fields, riddle_metadata};
use crate::riddle::paths::{
    hint_path, hints_collection, media_blob_path, media_namespace, riddle_path,
    riddles_collection,
};
use crate::riddle::{
    diff_hints, validate, Content, HintDiff, HintItem, MediaField, MediaRef, RiddleDraft,
    RiddleEdit, RiddleSnapshot,
};
use crate::store::{DocumentStore, StoreError};
use chrono::{SecondsFormat, Utc};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// One riddle save: a new riddle inside a book, or an edit of a persisted one
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub book_id: String,
    /// Last-known persisted state, `None` for a new riddle
    pub previous: Option<RiddleSnapshot>,
    pub draft: RiddleDraft,
}

impl SaveRequest {
    pub fn create(book_id: impl Into<String>, draft: RiddleDraft) -> Self {
        Self {
            book_id: book_id.into(),
            previous: None,
            draft,
        }
    }

    pub fn edit(previous: RiddleSnapshot, draft: RiddleDraft) -> Self {
        Self {
            book_id: previous.book_id.clone(),
            previous: Some(previous),
            draft,
        }
    }

    pub fn riddle_id(&self) -> Option<&str> {
        self.previous.as_ref().map(|riddle| riddle.id.as_str())
    }
}

/// What a successful save wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub riddle_id: String,
    /// localIds of created, updated, deleted and untouched hints
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub unchanged: Vec<String>,
    pub uploaded: Vec<MediaField>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub hints_deleted: usize,
    pub blobs_deleted: usize,
}

/// Main editor that validates, diffs and persists riddles against its collaborators
pub struct RiddleEditor<D: DocumentStore, B: BlobStore, I: Identity> {
    pub(crate) store: Arc<D>,
    pub(crate) blobs: Arc<B>,
    pub(crate) identity: Arc<I>,
}

impl<D: DocumentStore, B: BlobStore, I: Identity> Clone for RiddleEditor<D, B, I> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            blobs: Arc::clone(&self.blobs),
            identity: Arc::clone(&self.identity),
        }
    }
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_error(stage: SaveStage) -> impl Fn(StoreError) -> SaveError {
    move |source| SaveError::Write { stage, source }
}

/// The URL a hint document should carry after uploads
fn resolved_media(item: &HintItem, uploaded: &HashMap<String, String>) -> Option<String> {
    match item.content.media()? {
        MediaRef::Persisted(url) => Some(url.clone()),
        MediaRef::Pending(_) => uploaded.get(&item.local_id).cloned(),
    }
}

/// Every media field that carries a new file, in field order
fn pending_uploads(edit: &RiddleEdit, diff: &HintDiff) -> Vec<(MediaField, LocalFile)> {
    let mut uploads = Vec::new();

    if let MediaRef::Pending(file) = &edit.riddle_image {
        uploads.push((MediaField::RiddleImage, file.clone()));
    }
    if let Content::Media {
        media: MediaRef::Pending(file),
        ..
    } = &edit.success_message
    {
        uploads.push((MediaField::SuccessMessage, file.clone()));
    }

    let written = diff
        .creates
        .iter()
        .map(|create| &create.item)
        .chain(diff.updates.iter().map(|update| &update.item));
    let mut hint_uploads: Vec<(MediaField, LocalFile)> = written
        .filter_map(|item| match item.content.media() {
            Some(MediaRef::Pending(file)) => Some((
                MediaField::Hint {
                    local_id: item.local_id.clone(),
                    position: item.order,
                },
                file.clone(),
            )),
            _ => None,
        })
        .collect();
    hint_uploads.sort_by_key(|(field, _)| match field {
        MediaField::Hint { position, .. } => *position,
        _ => 0,
    });
    uploads.extend(hint_uploads);
    uploads
}

impl<D: DocumentStore, B: BlobStore, I: Identity> RiddleEditor<D, B, I> {
    pub fn new(store: D, blobs: B, identity: I) -> Self {
        Self::from_shared(Arc::new(store), Arc::new(blobs), Arc::new(identity))
    }

    pub fn from_shared(store: Arc<D>, blobs: Arc<B>, identity: Arc<I>) -> Self {
        Self {
            store,
            blobs,
            identity,
        }
    }

    /// The signed-in actor, `None` while the session is loading or signed out
    pub(crate) async fn signed_in_actor(&self) -> Option<Actor> {
        if self.identity.is_loading().await {
            debug!("Identity is still loading");
            return None;
        }
        self.identity.current_user().await
    }

    /// Start a save in the background
    pub fn start_save(&self, request: SaveRequest) -> SaveTask {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let editor = self.clone();
        let handle = tokio::spawn(async move { editor.save(request, Some(events_tx)).await });
        SaveTask::new(events_rx, handle)
    }

    /// Run a save to completion, sending its events to `events` when given
    ///
    /// A failure leaves every write made before it in place.
    pub async fn save(
        &self,
        request: SaveRequest,
        events: Option<mpsc::UnboundedSender<SaveEvent>>,
    ) -> Result<SaveOutcome, SaveError> {
        let context = format!("Save riddle={}", request.riddle_id().unwrap_or("new"));
        let mut reporter = ProgressReporter::new(context.clone(), events);

        let result = self.run_save(&request, &mut reporter).await;
        match &result {
            Ok(outcome) => info!(
                "[{}] Saved riddle {}: {} created, {} updated, {} deleted, {} uploads",
                context,
                outcome.riddle_id,
                outcome.created.len(),
                outcome.updated.len(),
                outcome.deleted.len(),
                outcome.uploaded.len()
            ),
            Err(e) => {
                error!("[{}] Save failed while {}: {}", context, e.stage(), e);
                if reporter.stage().can_advance_to(SaveStage::Errored) {
                    reporter.enter(SaveStage::Errored);
                }
            }
        }
        result
    }

    async fn run_save(
        &self,
        request: &SaveRequest,
        reporter: &mut ProgressReporter,
    ) -> Result<SaveOutcome, SaveError> {
        reporter.enter(SaveStage::Validating);
        let edit = validate(&request.draft, request.previous.as_ref())?;
        let actor = self
            .signed_in_actor()
            .await
            .ok_or(SaveError::Unauthenticated)?;

        let persisted = request
            .previous
            .as_ref()
            .map(|riddle| riddle.hints.as_slice())
            .unwrap_or_default();
        let diff = diff_hints(persisted, &edit.hints);
        debug!(
            "Hint diff: {} creates, {} updates, {} deletes, {} unchanged",
            diff.creates.len(),
            diff.updates.len(),
            diff.deletes.len(),
            diff.unchanged.len()
        );

        reporter.enter(SaveStage::WritingMetadata);
        let book_id = request.book_id.as_str();
        let now = now_rfc3339();
        let riddle_id = match &request.previous {
            None => self
                .store
                .create_record(
                    &riddles_collection(book_id),
                    riddle_metadata(&edit, book_id, &actor, &now, true),
                )
                .await
                .map_err(write_error(SaveStage::WritingMetadata))?,
            Some(previous) => {
                self.store
                    .merge_write_record(
                        &riddle_path(book_id, &previous.id),
                        riddle_metadata(&edit, book_id, &actor, &now, false),
                    )
                    .await
                    .map_err(write_error(SaveStage::WritingMetadata))?;
                previous.id.clone()
            }
        };
        debug!("Wrote metadata of riddle {}", riddle_id);

        reporter.enter(SaveStage::UploadingMedia);
        let uploads = pending_uploads(&edit, &diff);
        let reporter_ref: &ProgressReporter = reporter;
        let results = join_all(uploads.iter().map(|(field, file)| {
            self.upload_media(book_id, &riddle_id, field, file, reporter_ref)
        }))
        .await;

        // Every upload has finished or failed; report the first failure in field order
        let mut hint_urls: HashMap<String, String> = HashMap::new();
        let mut uploaded = Vec::new();
        let mut first_error = None;
        for ((field, _), result) in uploads.iter().zip(results) {
            match result {
                Ok(url) => {
                    if let MediaField::Hint { local_id, .. } = field {
                        hint_urls.insert(local_id.clone(), url);
                    }
                    uploaded.push(field.clone());
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        reporter.enter(SaveStage::ReconcilingHints);
        self.reconcile_hints(book_id, &riddle_id, &diff, &hint_urls)
            .await
            .map_err(write_error(SaveStage::ReconcilingHints))?;

        reporter.enter(SaveStage::Done);
        Ok(SaveOutcome {
            riddle_id,
            created: diff
                .creates
                .iter()
                .map(|create| create.item.local_id.clone())
                .collect(),
            updated: diff
                .updates
                .iter()
                .map(|update| update.item.local_id.clone())
                .collect(),
            deleted: diff
                .deletes
                .iter()
                .map(|delete| delete.local_id.clone())
                .collect(),
            unchanged: diff.unchanged,
            uploaded,
        })
    }

    /// Upload one media field; parent fields are stored on the riddle as soon as they resolve
    async fn upload_media(
        &self,
        book_id: &str,
        riddle_id: &str,
        field: &MediaField,
        file: &LocalFile,
        reporter: &ProgressReporter,
    ) -> Result<String, SaveError> {
        let path = media_blob_path(book_id, riddle_id, field, file.extension().as_deref());
        debug!("Uploading {} from {} to {}", field, file, path);

        let task = self.blobs.upload_resumable(&path, file);
        let url = track_upload(task, field, reporter)
            .await
            .map_err(|source| {
                error!("Upload of {} for riddle {} failed: {}", field, riddle_id, source);
                SaveError::Upload {
                    field: field.clone(),
                    stage: SaveStage::UploadingMedia,
                    source,
                }
            })?;

        if let Some(fields) = parent_media_fields(field, &url) {
            self.store
                .merge_write_record(&riddle_path(book_id, riddle_id), fields)
                .await
                .map_err(write_error(SaveStage::UploadingMedia))?;
        }
        Ok(url)
    }

    /// Run every hint create, update and delete concurrently
    async fn reconcile_hints(
        &self,
        book_id: &str,
        riddle_id: &str,
        diff: &HintDiff,
        hint_urls: &HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let collection = hints_collection(book_id, riddle_id);
        let mut writes: Vec<BoxFuture<'_, Result<(), StoreError>>> =
            Vec::with_capacity(diff.operation_count());

        for create in &diff.creates {
            let url = resolved_media(&create.item, hint_urls);
            let fields = hint_fields(&create.item, url.as_deref());
            let collection = collection.as_str();
            writes.push(
                async move {
                    self.store.create_record(collection, fields).await?;
                    Ok(())
                }
                .boxed(),
            );
        }
        for update in &diff.updates {
            let url = resolved_media(&update.item, hint_urls);
            let fields = hint_fields(&update.item, url.as_deref());
            let path = hint_path(book_id, riddle_id, &update.persisted_id);
            writes.push(async move { self.store.merge_write_record(&path, fields).await }.boxed());
        }
        for delete in &diff.deletes {
            let path = hint_path(book_id, riddle_id, &delete.persisted_id);
            writes.push(async move { self.store.delete_record(&path).await }.boxed());
        }

        let results = join_all(writes).await;
        let failures: Vec<StoreError> = results.into_iter().filter_map(Result::err).collect();
        if failures.len() > 1 {
            warn!(
                "{} hint writes failed for riddle {}; reporting the first",
                failures.len(),
                riddle_id
            );
        }
        match failures.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Delete a riddle with all of its hints and media
    ///
    /// Hints go first, then the riddle document, then every blob under the riddle's namespace.
    pub async fn delete_riddle(
        &self,
        book_id: &str,
        riddle_id: &str,
    ) -> Result<DeleteOutcome, DeleteError> {
        if self.signed_in_actor().await.is_none() {
            return Err(DeleteError::Unauthenticated);
        }
        info!("[Delete riddle={}] Deleting riddle in book {}", riddle_id, book_id);

        let hints = self
            .store
            .list_records(&hints_collection(book_id, riddle_id))
            .await
            .map_err(|source| DeleteError::Hints {
                riddle_id: riddle_id.to_string(),
                source,
            })?;
        let results = join_all(hints.iter().map(|hint| self.store.delete_record(&hint.path))).await;
        if let Some(source) = results.into_iter().find_map(Result::err) {
            error!("[Delete riddle={}] Failed to delete hints: {}", riddle_id, source);
            return Err(DeleteError::Hints {
                riddle_id: riddle_id.to_string(),
                source,
            });
        }

        self.store
            .delete_record(&riddle_path(book_id, riddle_id))
            .await
            .map_err(|source| DeleteError::Record {
                riddle_id: riddle_id.to_string(),
                source,
            })?;

        let media_error = |source| DeleteError::Media {
            riddle_id: riddle_id.to_string(),
            source,
        };
        let blobs = self
            .blobs
            .list_children(&media_namespace(book_id, riddle_id))
            .await
            .map_err(media_error)?;
        if blobs.is_empty() {
            debug!("[Delete riddle={}] No media to delete", riddle_id);
        }
        let results = join_all(blobs.iter().map(|blob| self.blobs.delete_blob(blob))).await;
        if let Some(source) = results.into_iter().find_map(Result::err) {
            error!("[Delete riddle={}] Failed to delete media: {}", riddle_id, source);
            return Err(media_error(source));
        }

        info!(
            "[Delete riddle={}] Deleted {} hints and {} media files",
            riddle_id,
            hints.len(),
            blobs.len()
        );
        Ok(DeleteOutcome {
            hints_deleted: hints.len(),
            blobs_deleted: blobs.len(),
        })
    }
}
