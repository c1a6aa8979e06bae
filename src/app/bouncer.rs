//! Bouncer - the relay orchestrator
//!
//! The bouncer is responsible for:
//! - Opening persistence, or degrading to memory-only mode
//! - Reconnecting every stored network at startup
//! - Accepting IRC clients and serving the configuration UI
//! - Adding and removing networks at runtime
//!
//! It owns the session registry. Sessions hold a weak reference back to it
//! and register/deregister themselves.

use std::future::Future;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::{Address, Credentials, Error, Result};
use crate::config::{Config, DatastoreConfig};
use crate::session::{ClientSession, NetworkSession, Session, SessionId};
use crate::store::{Datastore, SqliteDatastore, StoreError};
use crate::transport::{Listener, TcpTransport, Transport};

use super::metrics::init_metrics;
use super::registry::{NetworkState, Registry};
use super::web;

const PASSWORD_LEN: usize = 24;

/// Generate a random bouncer password
pub fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// The relay orchestrator. One per process, shared as `Arc<Bouncer>`.
pub struct Bouncer {
    config: Config,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn Datastore>>,
    password: String,
    registry: Mutex<Registry>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Bouncer {
    /// Build a bouncer from configuration, over TCP and the configured
    /// SQLite datastore.
    pub async fn from_config(config: Config) -> Result<Arc<Self>> {
        let store = open_datastore(&config.datastore)?;
        Self::initialize(config, store, Arc::new(TcpTransport::new())).await
    }

    /// Initialize the bouncer and reconnect every persisted network.
    ///
    /// A datastore that fails its ping with [`StoreError::Unavailable`] is
    /// dropped and the bouncer runs memory-only. Any other datastore error
    /// is returned.
    pub async fn initialize(
        config: Config,
        store: Option<Arc<dyn Datastore>>,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        init_metrics();

        let store = match store {
            Some(store) => match store.ping() {
                Ok(()) => Some(store),
                Err(StoreError::Unavailable(reason)) => {
                    warn!("Failed to reach the datastore ({}). Continuing without persistence.", reason);
                    None
                }
                Err(e) => return Err(e.into()),
            },
            None => None,
        };

        let password = match &store {
            Some(store) => match store.get_password()? {
                Some(password) => password,
                None => {
                    let password = generate_password();
                    store.set_password(&password)?;
                    info!("Generated bouncer password: {}", password);
                    password
                }
            },
            None => {
                let password = generate_password();
                warn!("Using an ephemeral bouncer password for this run: {}", password);
                password
            }
        };

        let (shutdown_tx, _) = broadcast::channel(1);
        let bouncer = Arc::new(Self {
            config,
            transport,
            store,
            password,
            registry: Mutex::new(Registry::new()),
            shutdown_tx,
        });

        if let Some(store) = &bouncer.store {
            let history = store.get_networks()?;
            info!("Reconnecting {} stored network(s)", history.len());
            for credentials in history.into_values() {
                bouncer.dial(credentials);
            }
        }

        Ok(bouncer)
    }

    /// Serve clients and the configuration UI until ctrl-c.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
            }
        })
        .await
    }

    /// Serve clients and the configuration UI until `shutdown` resolves.
    pub async fn run_until<F>(self: &Arc<Self>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let port = self.config.listen.effective_port()?;
        let addr = Address::from_host_port(&self.config.listen.host, port);
        let listener = self.transport.bind(&addr).await?;
        info!("Listening for IRC clients on {}", listener.local_addr()?);

        let mut handles = Vec::new();

        if self.config.web.enabled {
            let web_addr = self.config.web.listen.clone();
            let bouncer = self.clone();
            let shutdown_rx = self.shutdown_tx.subscribe();
            handles.push(tokio::spawn(async move {
                web::start_web_server(web_addr, bouncer, shutdown_rx).await;
            }));
        }

        let bouncer = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        handles.push(tokio::spawn(async move {
            run_listener(bouncer, listener, &mut shutdown_rx).await;
        }));

        shutdown.await;
        info!("Shutting down...");

        let _ = self.shutdown_tx.send(());
        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    /// Persist `credentials` and dial the network.
    ///
    /// Does not check for an existing network of the same name; callers
    /// that need uniqueness must check [`network_state`] first. The dial
    /// runs in the background and its outcome is only visible through the
    /// returned handle.
    ///
    /// [`network_state`]: Bouncer::network_state
    pub fn add_network(self: &Arc<Self>, credentials: Credentials) -> DialHandle {
        if let Some(store) = &self.store {
            if let Err(e) = store.add_network(&credentials) {
                warn!("[{}] Failed to persist network: {}", credentials.network, e);
            }
        }
        self.dial(credentials)
    }

    /// Disconnect `name` and drop it from persistence.
    ///
    /// The registry entry is left in place, disconnected; the session
    /// deregisters itself once its transport is gone. The persistence
    /// removal is issued even when `name` is not registered.
    pub fn remove_network(&self, name: &str) {
        let session = self.registry.lock().network(name);
        match session {
            Some(session) => {
                session.set_connected(false);
                session.transport().close();
                info!("[{}] Removed, closing session {}", name, session.id());
            }
            None => debug!("[{}] Remove requested for unregistered network", name),
        }

        if let Some(store) = &self.store {
            if let Err(e) = store.remove_network(name) {
                warn!("[{}] Failed to remove network from datastore: {}", name, e);
            }
        }
    }

    fn dial(self: &Arc<Self>, credentials: Credentials) -> DialHandle {
        let network = credentials.network.clone();
        self.registry.lock().begin_dial(&network);

        let guard = DialGuard {
            bouncer: Arc::downgrade(self),
            network: network.clone(),
        };
        let bouncer = self.clone();
        let task = tokio::spawn(async move {
            let _guard = guard;
            NetworkSession::connect(&bouncer, credentials).await
        });

        DialHandle { network, task }
    }

    // === Session registration ===

    pub fn register_client(&self, client: Arc<ClientSession>) {
        self.registry.lock().insert_client(client);
    }

    pub fn deregister_client(&self, id: SessionId) {
        self.registry.lock().remove_client(id);
    }

    pub fn register_network(&self, network: Arc<NetworkSession>) {
        let name = network.name().to_string();
        let previous = self.registry.lock().insert_network(network);
        if let Some(previous) = previous {
            warn!(
                "[{}] Session {} replaced in the registry while still live",
                name,
                previous.id()
            );
        }
    }

    /// Drop `name` from the registry if session `id` still holds it.
    pub fn deregister_network(&self, name: &str, id: SessionId) {
        if self.registry.lock().remove_network(name, id) {
            debug!("[{}] Session {} deregistered", name, id);
        }
    }

    // === Queries ===

    pub fn network_state(&self, name: &str) -> NetworkState {
        self.registry.lock().state(name)
    }

    pub fn network(&self, name: &str) -> Option<Arc<NetworkSession>> {
        self.registry.lock().network(name)
    }

    pub fn networks(&self) -> Vec<Arc<NetworkSession>> {
        self.registry.lock().networks()
    }

    pub fn clients(&self) -> Vec<Arc<ClientSession>> {
        self.registry.lock().clients()
    }

    pub fn client_count(&self) -> usize {
        self.registry.lock().client_count()
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn has_persistence(&self) -> bool {
        self.store.is_some()
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

/// Handle to one in-flight network dial.
///
/// Dropping the handle detaches the dial; it still completes in the
/// background.
pub struct DialHandle {
    network: String,
    task: JoinHandle<Result<Arc<NetworkSession>>>,
}

impl DialHandle {
    pub fn network(&self) -> &str {
        &self.network
    }

    /// Cancel the dial if it has not completed yet
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the dial to complete
    pub async fn wait(self) -> Result<Arc<NetworkSession>> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::DialCancelled(self.network)),
            Err(e) => Err(Error::Dial {
                network: self.network,
                reason: e.to_string(),
            }),
        }
    }
}

/// Keeps the registry's in-flight dial count for a name, released when the
/// dial task finishes or is cancelled.
struct DialGuard {
    bouncer: Weak<Bouncer>,
    network: String,
}

impl Drop for DialGuard {
    fn drop(&mut self) {
        if let Some(bouncer) = self.bouncer.upgrade() {
            bouncer.registry.lock().end_dial(&self.network);
        }
    }
}

/// Open the configured SQLite datastore, or `None` for memory-only mode.
fn open_datastore(config: &DatastoreConfig) -> Result<Option<Arc<dyn Datastore>>> {
    if !config.enabled {
        info!("Persistence disabled by configuration");
        return Ok(None);
    }

    match SqliteDatastore::open(&config.path) {
        Ok(store) => Ok(Some(Arc::new(store))),
        Err(StoreError::Unavailable(reason)) => {
            warn!("Failed to open the datastore ({}). Continuing without persistence.", reason);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Accept IRC clients until shutdown
async fn run_listener(
    bouncer: Arc<Bouncer>,
    listener: Box<dyn Listener>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) {
    let mut accepted: u64 = 0;

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        accepted += 1;
                        ClientSession::accept(&bouncer, stream, peer);
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Listener shutting down (accepted {} clients)", accepted);
                break;
            }
        }
    }
}
