//! In-memory transport for tests
//!
//! Dials produce `tokio::io::duplex` pipes whose far end is handed to the
//! test, every dial and bind is recorded, and inbound connections can be
//! injected into a bound listener.

use std::io::ErrorKind;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, Mutex as AsyncMutex};

use crate::common::{Address, IntoStream, Result, Stream};

use super::{Listener, Transport};

const PIPE_CAPACITY: usize = 16 * 1024;

pub struct MemoryTransport {
    dials: Mutex<Vec<Address>>,
    binds: Mutex<Vec<Address>>,
    refuse: bool,
    remote_tx: mpsc::UnboundedSender<(Address, DuplexStream)>,
    remote_rx: AsyncMutex<mpsc::UnboundedReceiver<(Address, DuplexStream)>>,
    inbound_tx: mpsc::UnboundedSender<(Stream, Address)>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<(Stream, Address)>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        let (remote_tx, remote_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        Self {
            dials: Mutex::new(Vec::new()),
            binds: Mutex::new(Vec::new()),
            refuse: false,
            remote_tx,
            remote_rx: AsyncMutex::new(remote_rx),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
        }
    }

    /// A transport whose every dial is refused
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::new()
        }
    }

    /// Every address dialed so far, in dial order
    pub fn dials(&self) -> Vec<Address> {
        self.dials.lock().clone()
    }

    /// Every address a listener was bound to
    pub fn binds(&self) -> Vec<Address> {
        self.binds.lock().clone()
    }

    /// Wait for the next successful dial and return the server side of it
    pub async fn next_remote(&self) -> (Address, DuplexStream) {
        self.remote_rx
            .lock()
            .await
            .recv()
            .await
            .expect("transport dropped")
    }

    /// Inject an inbound client connection and return the client's end
    pub fn inject_client(&self, peer: Address) -> DuplexStream {
        let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
        let _ = self.inbound_tx.send((ours.into_stream(), peer));
        theirs
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn connect(&self, addr: &Address) -> Result<Stream> {
        self.dials.lock().push(addr.clone());
        if self.refuse {
            return Err(std::io::Error::new(ErrorKind::ConnectionRefused, "connection refused").into());
        }
        let (ours, theirs) = tokio::io::duplex(PIPE_CAPACITY);
        let _ = self.remote_tx.send((addr.clone(), theirs));
        Ok(ours.into_stream())
    }

    async fn bind(&self, addr: &Address) -> Result<Box<dyn Listener>> {
        self.binds.lock().push(addr.clone());
        let rx = self
            .inbound_rx
            .lock()
            .take()
            .ok_or_else(|| std::io::Error::new(ErrorKind::AddrInUse, "already bound"))?;
        Ok(Box::new(MemoryListener {
            addr: addr.clone(),
            rx: AsyncMutex::new(rx),
        }))
    }
}

struct MemoryListener {
    addr: Address,
    rx: AsyncMutex<mpsc::UnboundedReceiver<(Stream, Address)>>,
}

#[async_trait]
impl Listener for MemoryListener {
    async fn accept(&self) -> Result<(Stream, Address)> {
        self.rx
            .lock()
            .await
            .recv()
            .await
            .ok_or(crate::error::Error::ConnectionClosed)
    }

    fn local_addr(&self) -> Result<Address> {
        Ok(self.addr.clone())
    }
}
