//! Session Layer
//!
//! Responsibilities:
//! - The contract client and network sessions satisfy to live in the
//!   bouncer registry ([`Session`])
//! - The transport handle every session writes through and closes
//! - The shared connection driver: read lines, decode, dispatch, tear down
//!
//! Sessions register themselves with the bouncer once established and
//! deregister on teardown. They hold a weak back-reference to the bouncer
//! and never touch another session's registry entry.

mod client;
mod network;

pub use client::ClientSession;
pub use network::NetworkSession;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, trace, warn};

use crate::app::metrics::{LINES_RECEIVED, LINES_SENT};
use crate::common::{Error, Result, Stream};
use crate::protocol::{Framing, LineSink};

/// Unique identity of one session for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SessionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Contract shared by client-facing and network-facing sessions
pub trait Session: Framing + Send + Sync + 'static {
    fn id(&self) -> SessionId;

    fn is_connected(&self) -> bool;

    fn set_connected(&self, connected: bool);

    fn transport(&self) -> &TransportHandle;

    /// Interpret one decoded line, terminator already stripped
    fn handle_line(&self, line: &str);

    /// Called once by the driver after the transport has gone away
    fn on_close(&self);
}

/// Write/close handle onto a session's underlying connection.
///
/// Writes are queued to the connection's writer task, one queued frame per
/// call, so a framed line always reaches the socket in a single write.
#[derive(Clone)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: Arc<watch::Sender<bool>>,
}

/// Receiving side of a [`TransportHandle`], consumed by the driver
pub struct TransportParts {
    outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: watch::Receiver<bool>,
}

impl TransportHandle {
    pub fn pair() -> (Self, TransportParts) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);
        (
            Self {
                outbound: outbound_tx,
                closed: Arc::new(closed_tx),
            },
            TransportParts {
                outbound: outbound_rx,
                closed: closed_rx,
            },
        )
    }

    /// Forcibly close the connection. Idempotent.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl LineSink for TransportHandle {
    fn write(&self, bytes: Vec<u8>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        self.outbound
            .send(bytes)
            .map_err(|_| Error::ConnectionClosed)?;
        LINES_SENT.inc();
        Ok(())
    }
}

#[cfg(test)]
impl TransportParts {
    /// Next frame queued for the wire, if any
    pub(crate) fn try_next_frame(&mut self) -> Option<Vec<u8>> {
        self.outbound.try_recv().ok()
    }
}

/// Longest inbound line accepted, terminator included
pub const MAX_LINE_LEN: usize = 8 * 1024;

/// Drive a session's connection until EOF, error or `close()`.
///
/// Reading and writing run concurrently. Whichever side stops first closes
/// the transport; the writer then flushes every frame queued before the
/// close, shuts the stream down, and `on_close` runs exactly once.
pub(crate) async fn drive<S: Session>(session: Arc<S>, stream: Stream, parts: TransportParts) {
    let TransportParts {
        mut outbound,
        mut closed,
    } = parts;
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);

    let write_session = session.clone();
    let mut writer_closed = closed.clone();
    let write_loop = async move {
        let mut healthy = true;
        loop {
            tokio::select! {
                biased;
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(e) = writer.write_all(&frame).await {
                        debug!(session = %write_session.id(), "write failed: {}", e);
                        healthy = false;
                        break;
                    }
                }
                _ = wait_closed(&mut writer_closed) => break,
            }
        }

        // Lines accepted by `send` before the close still go out
        if healthy {
            while let Ok(frame) = outbound.try_recv() {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(session = %write_session.id(), "flush failed: {}", e);
                    break;
                }
            }
        }
        let _ = writer.shutdown().await;
        write_session.transport().close();
    };

    let read_session = session.clone();
    let read_loop = async move {
        let mut buf = Vec::with_capacity(512);
        loop {
            let mut limited = (&mut reader).take(MAX_LINE_LEN as u64);
            tokio::select! {
                result = limited.read_until(b'\n', &mut buf) => {
                    match result {
                        Ok(0) => break,
                        Ok(_) if !buf.ends_with(b"\n") && buf.len() >= MAX_LINE_LEN => {
                            warn!(
                                session = %read_session.id(),
                                "line exceeds {} bytes, closing", MAX_LINE_LEN
                            );
                            break;
                        }
                        Ok(_) => {
                            let line = read_session.decode(strip_terminator(&buf));
                            buf.clear();
                            LINES_RECEIVED.inc();
                            trace!(session = %read_session.id(), "<< {}", line);
                            read_session.handle_line(&line);
                        }
                        Err(e) => {
                            debug!(session = %read_session.id(), "read failed: {}", e);
                            break;
                        }
                    }
                }
                _ = wait_closed(&mut closed) => break,
            }
        }
        read_session.transport().close();
    };

    tokio::join!(read_loop, write_loop);
    session.on_close();
}

async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    let _ = closed.wait_for(|closed| *closed).await;
}

fn strip_terminator(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn test_strip_terminator() {
        assert_eq!(strip_terminator(b"PING x\r\n"), b"PING x");
        assert_eq!(strip_terminator(b"PING x\n"), b"PING x");
        assert_eq!(strip_terminator(b"PING x"), b"PING x");
    }

    #[test]
    fn test_write_queues_one_frame() {
        let (handle, mut parts) = TransportHandle::pair();
        handle.write(b"NICK alice\r\n".to_vec()).unwrap();

        assert_eq!(parts.try_next_frame().unwrap(), b"NICK alice\r\n");
        assert!(parts.try_next_frame().is_none());
    }

    #[test]
    fn test_write_after_close_fails() {
        let (handle, _parts) = TransportHandle::pair();
        handle.close();
        handle.close();

        assert!(handle.is_closed());
        assert!(matches!(
            handle.write(b"QUIT\r\n".to_vec()),
            Err(Error::ConnectionClosed)
        ));
    }
}
