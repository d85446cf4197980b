//! Transport seam - the duplex link to the core service.
//!
//! The wire itself (WebSocket, pipe, in-process queue) is an external
//! collaborator; this crate only holds the outbound half and consumes
//! inbound wire text from a channel handed to [`RpcClient::run`].
//!
//! Sending is fire-and-forget from the caller's perspective: a send either
//! enqueues or reports the link as gone, it never blocks on the peer.
//!
//! [`RpcClient::run`]: crate::client::RpcClient::run
//!
//! # Example
//!
//! ```
//! use buslink::transport;
//!
//! let (link, mut rx) = transport::link();
//! link.send("{\"jsonrpc\":\"2.0\",\"method\":\"UI.OnCommand\"}".to_string()).unwrap();
//! assert!(rx.try_recv().is_ok());
//! ```

use tokio::sync::mpsc;

use crate::error::{BuslinkError, Result};

/// Outbound half of the duplex link to the core service.
///
/// Cheaply cloneable; every clone feeds the same wire.
#[derive(Clone)]
pub struct TransportLink {
    tx: mpsc::UnboundedSender<String>,
}

impl TransportLink {
    /// Wrap an existing outbound sender.
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Enqueue one wire message.
    ///
    /// # Errors
    ///
    /// Returns [`BuslinkError::ConnectionClosed`] when the far side of the
    /// link is gone.
    pub fn send(&self, message: String) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|_| BuslinkError::ConnectionClosed)
    }

    /// Whether the far side of the link has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create an in-memory link, returning the outbound half and the receiver
/// the far side (the bus, or a test) reads from.
pub fn link() -> (TransportLink, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TransportLink::new(tx), rx)
}
