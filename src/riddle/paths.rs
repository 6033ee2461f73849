//! Document and blob locations of books, riddles and hints

use crate::riddle::model::MediaField;

pub const BOOKS_COLLECTION: &str = "books";

pub fn book_path(book_id: &str) -> String {
    format!("{BOOKS_COLLECTION}/{book_id}")
}

pub fn riddles_collection(book_id: &str) -> String {
    format!("{}/riddles", book_path(book_id))
}

pub fn riddle_path(book_id: &str, riddle_id: &str) -> String {
    format!("{}/{}", riddles_collection(book_id), riddle_id)
}

pub fn hints_collection(book_id: &str, riddle_id: &str) -> String {
    format!("{}/hints", riddle_path(book_id, riddle_id))
}

pub fn hint_path(book_id: &str, riddle_id: &str, persisted_id: &str) -> String {
    format!("{}/{}", hints_collection(book_id, riddle_id), persisted_id)
}

/// Blob prefix holding every media file of one riddle
pub fn media_namespace(book_id: &str, riddle_id: &str) -> String {
    format!("books/{book_id}/riddles/{riddle_id}/")
}

/// Blob key of a media field, `{namespace}{fieldName}.{ext}`
pub fn media_blob_path(
    book_id: &str,
    riddle_id: &str,
    field: &MediaField,
    extension: Option<&str>,
) -> String {
    let namespace = media_namespace(book_id, riddle_id);
    match extension {
        Some(ext) => format!("{namespace}{}.{ext}", field.field_name()),
        None => format!("{namespace}{}", field.field_name()),
    }
}
