//! Connection boundary.
//!
//! A [`Connection`] splits into one [`WireSink`] and one [`WireStream`]. The
//! sink is wrapped by [`ConnectionGuard::new`], which hands out exactly one
//! [`Sender`] and keeps the right to close the connection for itself.

pub mod websocket;

use crate::error::TransportError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use websocket::WebSocketConnector;

/// Outbound half of the connection
#[async_trait]
pub trait WireSink: Send {
    async fn send(&mut self, text: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Inbound half of the connection
#[async_trait]
pub trait WireStream: Send {
    /// Next inbound message, or `None` once the connection is closed
    async fn recv(&mut self) -> Option<Result<Vec<u8>, TransportError>>;
}

/// An open full-duplex connection
pub struct Connection {
    pub sink: Box<dyn WireSink>,
    pub stream: Box<dyn WireStream>,
}

impl Connection {
    pub fn split(self) -> (Box<dyn WireSink>, Box<dyn WireStream>) {
        (self.sink, self.stream)
    }
}

/// Opens connections to the speech service. Credentials are the connector's
/// concern and never pass through the session.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Connection, TransportError>;
}

type SharedSink = Arc<Mutex<Box<dyn WireSink>>>;

/// The single sending capability for a connection
pub struct Sender {
    sink: SharedSink,
    closed: Arc<AtomicBool>,
}

impl Sender {
    pub async fn send(&self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sink.lock().await.send(text).await
    }
}

/// Owns the right to close a connection; closing happens at most once
pub struct ConnectionGuard {
    sink: SharedSink,
    closed: Arc<AtomicBool>,
}

impl ConnectionGuard {
    pub fn new(sink: Box<dyn WireSink>) -> (Self, Sender) {
        let sink = Arc::new(Mutex::new(sink));
        let closed = Arc::new(AtomicBool::new(false));

        let sender = Sender {
            sink: Arc::clone(&sink),
            closed: Arc::clone(&closed),
        };

        (Self { sink, closed }, sender)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Close the connection, giving the peer at most `limit` to acknowledge.
    /// The guard counts as closed either way. Later calls are no-ops.
    pub async fn close(&self, limit: Duration) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Connection already closed");
            return;
        }

        let closing = async {
            let mut sink = self.sink.lock().await;
            sink.close().await
        };

        match tokio::time::timeout(limit, closing).await {
            Ok(Ok(())) => info!("Connection closed"),
            Ok(Err(e)) => debug!(error = %e, "Error while closing connection"),
            Err(_) => warn!(
                limit_ms = limit.as_millis() as u64,
                "Connection did not close in time, abandoning it"
            ),
        }
    }
}
