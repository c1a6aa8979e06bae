//! Datastore errors

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend could not be reached at all
    #[error("datastore unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}
