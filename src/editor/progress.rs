use crate::blob::{BlobError, UploadProgress, UploadTask};
use crate::editor::error::SaveError;
use crate::editor::orchestrator::SaveOutcome;
use crate::editor::stage::SaveStage;
use crate::riddle::MediaField;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Something observable that happened during a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveEvent {
    Stage(SaveStage),
    UploadStarted(MediaField),
    /// Percent never decreases for one field
    UploadProgress {
        field: MediaField,
        percent: u8,
    },
    UploadFinished {
        field: MediaField,
        url: String,
    },
    UploadFailed {
        field: MediaField,
        message: String,
    },
}

impl SaveEvent {
    /// Human-readable status line, e.g. "uploading hint 2 media (40%)"
    pub fn label(&self) -> String {
        match self {
            SaveEvent::Stage(stage) => stage.label().to_string(),
            SaveEvent::UploadStarted(field) => format!("uploading {}", field),
            SaveEvent::UploadProgress { field, percent } => {
                format!("uploading {} ({}%)", field, percent)
            }
            SaveEvent::UploadFinished { field, .. } => format!("uploaded {}", field),
            SaveEvent::UploadFailed { field, message } => {
                format!("upload of {} failed: {}", field, message)
            }
        }
    }
}

/// Tracks the stage of one save and forwards its events
pub(crate) struct ProgressReporter {
    context: String,
    stage: SaveStage,
    events: Option<mpsc::UnboundedSender<SaveEvent>>,
}

impl ProgressReporter {
    pub(crate) fn new(context: String, events: Option<mpsc::UnboundedSender<SaveEvent>>) -> Self {
        Self {
            context,
            stage: SaveStage::Idle,
            events,
        }
    }

    pub(crate) fn stage(&self) -> SaveStage {
        self.stage
    }

    pub(crate) fn enter(&mut self, next: SaveStage) {
        if !self.stage.can_advance_to(next) {
            warn!(
                "[{}] Unexpected stage change {} -> {}",
                self.context, self.stage, next
            );
        }
        debug!("[{}] {} -> {}", self.context, self.stage, next);
        self.stage = next;
        self.emit(SaveEvent::Stage(next));
    }

    pub(crate) fn emit(&self, event: SaveEvent) {
        if let Some(events) = &self.events {
            // Nobody listening is fine
            let _ = events.send(event);
        }
    }
}

/// Drive an upload to completion, forwarding its progress as save events
pub(crate) async fn track_upload(
    task: UploadTask,
    field: &MediaField,
    reporter: &ProgressReporter,
) -> Result<String, BlobError> {
    let UploadTask {
        mut progress,
        mut completion,
    } = task;
    reporter.emit(SaveEvent::UploadStarted(field.clone()));

    let mut last_percent: Option<u8> = None;
    let mut report = |update: UploadProgress| {
        let percent = update.percent();
        if last_percent.map_or(true, |last| percent > last) {
            last_percent = Some(percent);
            reporter.emit(SaveEvent::UploadProgress {
                field: field.clone(),
                percent,
            });
        }
    };

    let result = loop {
        tokio::select! {
            result = &mut completion => break result,
            Some(update) = progress.recv() => report(update),
        }
    };
    while let Ok(update) = progress.try_recv() {
        report(update);
    }

    match &result {
        Ok(url) => reporter.emit(SaveEvent::UploadFinished {
            field: field.clone(),
            url: url.clone(),
        }),
        Err(e) => reporter.emit(SaveEvent::UploadFailed {
            field: field.clone(),
            message: e.to_string(),
        }),
    }
    result
}

/// A save running in the background: an event stream plus one terminal result
pub struct SaveTask {
    events: mpsc::UnboundedReceiver<SaveEvent>,
    handle: JoinHandle<Result<SaveOutcome, SaveError>>,
}

impl SaveTask {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<SaveEvent>,
        handle: JoinHandle<Result<SaveOutcome, SaveError>>,
    ) -> Self {
        Self { events, handle }
    }

    /// Next event, `None` once the save has finished and every event was read
    pub async fn next_event(&mut self) -> Option<SaveEvent> {
        self.events.recv().await
    }

    pub async fn finish(self) -> Result<SaveOutcome, SaveError> {
        self.finish_with(|_| {}).await
    }

    /// Wait for the result, handing every remaining event to `on_event` first
    pub async fn finish_with(
        mut self,
        mut on_event: impl FnMut(&SaveEvent),
    ) -> Result<SaveOutcome, SaveError> {
        while let Some(event) = self.events.recv().await {
            on_event(&event);
        }
        self.handle
            .await
            .map_err(|e| SaveError::Aborted(e.to_string()))?
    }
}
