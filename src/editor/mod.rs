pub mod books;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod stage;
pub mod watch;

pub use books::{BookSummary, RiddleSummary};
pub use error::{CatalogError, DeleteError, SaveError, WatchError};
pub use orchestrator::{DeleteOutcome, RiddleEditor, SaveOutcome, SaveRequest};
pub use progress::{SaveEvent, SaveTask};
pub use stage::SaveStage;
pub use watch::{RiddleView, RiddleWatch};
