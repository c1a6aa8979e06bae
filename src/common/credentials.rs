//! Network credentials

use serde::{Deserialize, Serialize};

use super::Address;

/// The named parameter set identifying one network connection.
///
/// Credentials are immutable once a session has been dialed with them;
/// changing a network means removing it and adding it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Network name, unique across the bouncer
    pub network: String,
    pub hostname: String,
    pub port: u16,
    pub nickname: String,
    pub username: String,
    pub realname: String,
    /// Server password sent with PASS, if any
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub usermode: u32,
}

impl Credentials {
    /// Address of the remote IRC server
    pub fn address(&self) -> Address {
        Address::from_host_port(&self.hostname, self.port)
    }
}
