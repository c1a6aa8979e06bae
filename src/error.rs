//! Error types for Sputnik

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for Sputnik
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),

    #[error("Dial to {network} failed: {reason}")]
    Dial { network: String, reason: String },

    #[error("Dial to {0} was cancelled")]
    DialCancelled(String),

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Result type alias for Sputnik
pub type Result<T> = std::result::Result<T, Error>;
