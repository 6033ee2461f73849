use crate::blob::BlobStore;
use crate::editor::error::CatalogError;
use crate::editor::orchestrator::{now_rfc3339, RiddleEditor};
use crate::identity::Identity;
use crate::riddle::codec::{self, book_fields, decode_riddle};
use crate::riddle::paths::{
    book_path, hints_collection, riddle_path, riddles_collection, BOOKS_COLLECTION,
};
use crate::riddle::{validate_book_name, RiddleSnapshot};
use crate::store::{Document, DocumentStore};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSummary {
    pub id: String,
    pub name: String,
    pub created_by: Option<String>,
    pub created_at: Option<String>,
}

impl BookSummary {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.str_field(codec::NAME).unwrap_or_default().to_string(),
            created_by: doc.str_field(codec::CREATED_BY).map(str::to_string),
            created_at: doc.str_field(codec::CREATED_AT).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiddleSummary {
    pub id: String,
    pub name: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl RiddleSummary {
    fn from_document(doc: &Document) -> Self {
        Self {
            id: doc.id.clone(),
            name: doc.str_field(codec::NAME).unwrap_or_default().to_string(),
            created_at: doc.str_field(codec::CREATED_AT).map(str::to_string),
            updated_at: doc.str_field(codec::UPDATED_AT).map(str::to_string),
        }
    }
}

/// Newest first. Documents come oldest first, so equal stamps keep reverse insertion order.
fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> Option<String>) -> Vec<T> {
    items.reverse();
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items
}

impl<D: DocumentStore, B: BlobStore, I: Identity> RiddleEditor<D, B, I> {
    /// Create a book owned by the signed-in actor
    pub async fn create_book(&self, name: &str) -> Result<BookSummary, CatalogError> {
        let name = validate_book_name(name).map_err(CatalogError::InvalidName)?;
        let actor = self
            .signed_in_actor()
            .await
            .ok_or(CatalogError::Unauthenticated)?;

        let now = now_rfc3339();
        let id = self
            .store
            .create_record(BOOKS_COLLECTION, book_fields(&name, &actor, &now))
            .await?;
        info!("Created book {} ({})", id, name);

        Ok(BookSummary {
            id,
            name,
            created_by: Some(actor.uid),
            created_at: Some(now),
        })
    }

    pub async fn list_books(&self) -> Result<Vec<BookSummary>, CatalogError> {
        let docs = self.store.list_records(BOOKS_COLLECTION).await?;
        let books = docs.iter().map(BookSummary::from_document).collect();
        Ok(newest_first(books, |book: &BookSummary| book.created_at.clone()))
    }

    pub async fn list_riddles(&self, book_id: &str) -> Result<Vec<RiddleSummary>, CatalogError> {
        if self.store.get_record(&book_path(book_id)).await?.is_none() {
            return Err(CatalogError::NotFound(format!("book {}", book_id)));
        }
        let docs = self.store.list_records(&riddles_collection(book_id)).await?;
        let riddles = docs.iter().map(RiddleSummary::from_document).collect();
        Ok(newest_first(riddles, |riddle: &RiddleSummary| {
            riddle.created_at.clone()
        }))
    }

    /// Read a riddle with its hints, ready to be edited
    pub async fn load_riddle(
        &self,
        book_id: &str,
        riddle_id: &str,
    ) -> Result<RiddleSnapshot, CatalogError> {
        let doc = self
            .store
            .get_record(&riddle_path(book_id, riddle_id))
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("riddle {}", riddle_id)))?;
        let hints = self
            .store
            .list_records(&hints_collection(book_id, riddle_id))
            .await?;
        Ok(decode_riddle(book_id, &doc, &hints))
    }
}
