//! Protocol Layer
//!
//! Responsibilities:
//! - Byte/text conversion with a lossless fallback (`framing::decode`)
//! - Line termination and single-write line emission (`Framing`)
//! - Pulling the command word out of a decoded line (`message`)
//!
//! Both client-facing and network-facing sessions speak the wire through
//! this layer. It knows nothing about registries or sockets.

pub mod framing;
pub mod message;

pub use framing::{decode, frame, normalize, normalize_with, Framing, LineSink, CRLF};
pub use message::Message;
