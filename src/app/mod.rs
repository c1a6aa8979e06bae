//! Application Layer
//!
//! This module contains:
//! - Bouncer: the relay orchestrator (startup reload, client accept loop,
//!   network add/remove)
//! - Registry: network name → network session, plus attached clients
//! - Web: the configuration UI server
//! - Metrics: Prometheus counters and gauges

mod bouncer;
pub mod metrics;
mod registry;
pub mod web;

pub use bouncer::{generate_password, Bouncer, DialHandle};
pub use registry::NetworkState;
