//! Sputnik - a multi-tenant IRC bouncer
//!
//! # Architecture
//!
//! ```text
//! IRC clients ──► Listener ──► ClientSession ─┐
//!                                             ├─► Bouncer (registry, persistence)
//! IRC networks ◄── Transport ◄── NetworkSession ┘         ▲
//!                                                          │
//!                                      configuration web server
//! ```
//!
//! ## Core Principles
//!
//! - The bouncer is one explicitly constructed context, shared as `Arc`
//! - Sessions register and deregister themselves
//! - Every wire line goes through the framing capability
//! - Persistence is optional; losing it degrades to memory-only mode
//!
//! ## Module Structure
//!
//! ```text
//! src/
//! ├── common/          # Core types: Stream, Address, Credentials
//! ├── transport/       # Transport layer: TCP dial/listen
//! ├── protocol/        # Line framing and minimal IRC parsing
//! ├── session/         # Session contract, client and network sessions
//! ├── store/           # Persistence adapter (SQLite)
//! └── app/             # Application: Bouncer, Registry, Web, Metrics
//! ```

// Core types
pub mod common;
pub mod error;

// Layered architecture
pub mod transport;
pub mod protocol;
pub mod session;
pub mod store;
pub mod app;

// Supporting modules
pub mod config;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use common::{Address, Credentials, Stream};
pub use error::{Error, Result};
pub use config::Config;

pub use app::{Bouncer, DialHandle, NetworkState};
pub use protocol::Framing;
pub use session::{ClientSession, NetworkSession, Session};
pub use store::{Datastore, SqliteDatastore, StoreError};
pub use transport::Transport;
