//! Error type for the knowledge store.
//!
//! Store operations return [`StoreError`] so callers can tell an empty
//! result set apart from a store that could not be reached.

use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Refusing to store a document with empty text")]
    EmptyText,

    #[error("Backend error: {0}")]
    Backend(String),
}
