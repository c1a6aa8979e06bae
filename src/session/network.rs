//! Network session - the bouncer's outbound connection to one IRC network

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, info, warn};

use crate::app::metrics::{DIALS_TOTAL, DIAL_FAILURES};
use crate::app::Bouncer;
use crate::common::{Credentials, Error, Result, Stream};
use crate::protocol::{Framing, LineSink, Message};

use super::{Session, SessionId, TransportHandle};

/// A live connection to a remote IRC network, keyed by network name
pub struct NetworkSession {
    id: SessionId,
    credentials: Credentials,
    bouncer: Weak<Bouncer>,
    connected: AtomicBool,
    transport: TransportHandle,
}

impl NetworkSession {
    /// Dial the network described by `credentials` and start a session on it.
    ///
    /// A failed dial is reported here (logged and counted) and returned; the
    /// bouncer does not retry.
    pub async fn connect(bouncer: &Arc<Bouncer>, credentials: Credentials) -> Result<Arc<Self>> {
        let addr = credentials.address();
        DIALS_TOTAL.inc();
        debug!("[{}] Dialing {}", credentials.network, addr);

        match bouncer.transport().connect(&addr).await {
            Ok(stream) => Ok(Self::establish(bouncer, credentials, stream)),
            Err(e) => {
                DIAL_FAILURES.inc();
                warn!("[{}] Failed to connect to {}: {}", credentials.network, addr, e);
                Err(Error::Dial {
                    network: credentials.network,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Start a session over an already connected stream.
    pub fn establish(bouncer: &Arc<Bouncer>, credentials: Credentials, stream: Stream) -> Arc<Self> {
        let (transport, parts) = TransportHandle::pair();
        let session = Arc::new(Self {
            id: SessionId::next(),
            credentials,
            bouncer: Arc::downgrade(bouncer),
            connected: AtomicBool::new(true),
            transport,
        });

        bouncer.register_network(session.clone());
        info!(
            "[{}] Connected to {} (session {})",
            session.name(),
            session.credentials.address(),
            session.id
        );

        if let Err(e) = session.register() {
            debug!("[{}] Registration not sent: {}", session.name(), e);
        }

        tokio::spawn(super::drive(session.clone(), stream, parts));
        session
    }

    pub fn name(&self) -> &str {
        &self.credentials.network
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Send the IRC connection registration for our credentials
    fn register(&self) -> Result<()> {
        let creds = &self.credentials;
        if let Some(password) = creds.password.as_deref().filter(|p| !p.is_empty()) {
            self.send(&["PASS", password])?;
        }
        self.send(&["NICK", &creds.nickname])?;

        let usermode = creds.usermode.to_string();
        let realname = format!(":{}", creds.realname);
        self.send(&["USER", &creds.username, &usermode, "*", &realname])
    }
}

impl Framing for NetworkSession {
    fn sink(&self) -> &dyn LineSink {
        &self.transport
    }
}

impl Session for NetworkSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
    }

    fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    fn handle_line(&self, line: &str) {
        let Some(message) = Message::parse(line) else {
            return;
        };

        if message.is("PING") {
            let token = format!(":{}", message.params.first().copied().unwrap_or_default());
            if let Err(e) = self.send(&["PONG", &token]) {
                debug!("[{}] PONG not sent: {}", self.name(), e);
            }
            return;
        }

        // Everything else is relayed verbatim to attached clients
        if let Some(bouncer) = self.bouncer.upgrade() {
            for client in bouncer.clients() {
                if let Err(e) = client.send(&[line]) {
                    debug!("[{}] Relay to client {} failed: {}", self.name(), client.id(), e);
                }
            }
        }
    }

    fn on_close(&self) {
        self.set_connected(false);
        info!("[{}] Disconnected (session {})", self.name(), self.id);
        if let Some(bouncer) = self.bouncer.upgrade() {
            bouncer.deregister_network(self.name(), self.id);
        }
    }
}
