//! Session registry
//!
//! The authoritative mapping from network name to network session, plus
//! the set of attached clients and a count of in-flight dials per name.
//! Owned by the [`Bouncer`](super::Bouncer); sessions only reach it
//! through the bouncer's register/deregister calls.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::session::{ClientSession, NetworkSession, Session, SessionId};

use super::metrics::{CLIENTS_CONNECTED, NETWORKS_REGISTERED};

/// Lifecycle of a network name as seen by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkState {
    /// Not registered and not being dialed
    Absent,
    /// A dial is in flight and no session is registered yet
    Connecting,
    /// Registered and connected
    Connected,
    /// Registered but disconnected, waiting for the session to deregister
    Disconnected,
}

#[derive(Default)]
pub struct Registry {
    clients: HashMap<SessionId, Arc<ClientSession>>,
    networks: HashMap<String, Arc<NetworkSession>>,
    dialing: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&mut self, client: Arc<ClientSession>) {
        self.clients.insert(client.id(), client);
        CLIENTS_CONNECTED.set(self.clients.len() as i64);
    }

    pub fn remove_client(&mut self, id: SessionId) -> Option<Arc<ClientSession>> {
        let removed = self.clients.remove(&id);
        CLIENTS_CONNECTED.set(self.clients.len() as i64);
        removed
    }

    /// Register a network session under its name, returning whatever
    /// session previously held that name.
    pub fn insert_network(&mut self, network: Arc<NetworkSession>) -> Option<Arc<NetworkSession>> {
        let previous = self.networks.insert(network.name().to_string(), network);
        NETWORKS_REGISTERED.set(self.networks.len() as i64);
        previous
    }

    /// Remove `name` only if it is still held by session `id`.
    pub fn remove_network(&mut self, name: &str, id: SessionId) -> bool {
        let owned = self.networks.get(name).is_some_and(|n| n.id() == id);
        if owned {
            self.networks.remove(name);
            NETWORKS_REGISTERED.set(self.networks.len() as i64);
        }
        owned
    }

    pub fn network(&self, name: &str) -> Option<Arc<NetworkSession>> {
        self.networks.get(name).cloned()
    }

    pub fn networks(&self) -> Vec<Arc<NetworkSession>> {
        self.networks.values().cloned().collect()
    }

    pub fn clients(&self) -> Vec<Arc<ClientSession>> {
        self.clients.values().cloned().collect()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn begin_dial(&mut self, name: &str) {
        *self.dialing.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn end_dial(&mut self, name: &str) {
        if let Some(count) = self.dialing.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.dialing.remove(name);
            }
        }
    }

    pub fn state(&self, name: &str) -> NetworkState {
        match self.networks.get(name) {
            Some(network) if network.is_connected() => NetworkState::Connected,
            Some(_) => NetworkState::Disconnected,
            None if self.dialing.contains_key(name) => NetworkState::Connecting,
            None => NetworkState::Absent,
        }
    }
}
