//! Common types and abstractions
//!
//! This module defines the core types used throughout the bouncer:
//! - Stream: unified async I/O abstraction
//! - Address: network address representation
//! - Credentials: the parameter set identifying one network connection
//! - Error: unified error types

mod address;
mod credentials;
mod stream;

pub use address::Address;
pub use credentials::Credentials;
pub use stream::{IntoStream, Stream};

// Re-export error types from crate root
pub use crate::error::{Error, Result};
