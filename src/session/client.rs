//! Client session - one end-user IRC client attached to the bouncer

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tracing::{debug, info};

use crate::app::Bouncer;
use crate::common::{Address, Stream};
use crate::protocol::{Framing, LineSink, Message};

use super::{Session, SessionId, TransportHandle};

pub struct ClientSession {
    id: SessionId,
    peer: Address,
    bouncer: Weak<Bouncer>,
    connected: AtomicBool,
    transport: TransportHandle,
}

impl ClientSession {
    /// Attach an accepted client connection to the bouncer.
    pub fn accept(bouncer: &Arc<Bouncer>, stream: Stream, peer: Address) -> Arc<Self> {
        let (transport, parts) = TransportHandle::pair();
        let session = Arc::new(Self {
            id: SessionId::next(),
            peer,
            bouncer: Arc::downgrade(bouncer),
            connected: AtomicBool::new(true),
            transport,
        });

        bouncer.register_client(session.clone());
        info!("Client {} connected from {}", session.id, session.peer);

        tokio::spawn(super::drive(session.clone(), stream, parts));
        session
    }

}

impl Framing for ClientSession {
    fn sink(&self) -> &dyn LineSink {
        &self.transport
    }
}

impl Session for ClientSession {
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
                debug!("Client {}: PONG not sent: {}", self.id, e);
            }
        } else if message.is("QUIT") {
            self.transport.close();
        } else {
            debug!("Client {}: unhandled {}", self.id, message.command);
        }
    }

    fn on_close(&self) {
        self.set_connected(false);
        info!("Client {} from {} disconnected", self.id, self.peer);
        if let Some(bouncer) = self.bouncer.upgrade() {
            bouncer.deregister_client(self.id);
        }
    }
}
