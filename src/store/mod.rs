//! Persistence adapter
//!
//! A durable mirror of network credentials and the bouncer password. The
//! orchestrator only ever talks to it through [`Datastore`]; the registry
//! and the store are allowed to drift (a write failure is logged, not
//! fatal).

mod error;
mod schema;
mod sqlite;

pub use error::StoreError;
pub use sqlite::SqliteDatastore;

use std::collections::HashMap;

use crate::common::Credentials;

/// Key-value persistence used by the bouncer
pub trait Datastore: Send + Sync {
    /// Liveness check
    fn ping(&self) -> Result<(), StoreError>;

    /// Bouncer-wide password, if one was ever stored
    fn get_password(&self) -> Result<Option<String>, StoreError>;

    fn set_password(&self, password: &str) -> Result<(), StoreError>;

    /// Every stored network, keyed by network name
    fn get_networks(&self) -> Result<HashMap<String, Credentials>, StoreError>;

    /// Insert or replace the record for `credentials.network`
    fn add_network(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Delete a network record. Removing an absent name is not an error.
    fn remove_network(&self, name: &str) -> Result<(), StoreError>;
}
