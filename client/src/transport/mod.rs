//! Transport abstraction: connect, send, subscribe, and an event stream back.
//!
//! Every transport runs its socket I/O on its own tasks. `send` only queues
//! the frame and never waits for an acknowledgment; connection changes and
//! inbound messages arrive on the [`EventStream`] returned by [`connect`].

use std::sync::Arc;

use protocol::Payload;
use tokio::sync::mpsc;

use crate::config::TransportConfig;

pub mod loopback;
pub mod rosbridge;
pub mod udp;

pub type TransportResult<T> = Result<T, TransportError>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    ConnectFailed(String),
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("transport is not connected")]
    NotConnected,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Protocol(#[from] protocol::ProtocolError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Message { topic: String, payload: Payload },
    ConnectionLost { reason: String },
}

pub type EventStream = mpsc::UnboundedReceiver<TransportEvent>;

pub trait Transport: Send + Sync {
    fn kind(&self) -> &'static str;
    fn send(&self, topic: &str, payload: Payload) -> TransportResult<()>;
    fn subscribe(&self, topic: &str) -> TransportResult<()>;
    fn unsubscribe(&self, topic: &str) -> TransportResult<()>;
    /// Close the link. A `ConnectionLost` event follows once the I/O side has wound down.
    fn disconnect(&self);
}

pub struct Connection {
    pub transport: Arc<dyn Transport>,
    pub events: EventStream,
}

pub async fn connect(config: &TransportConfig) -> TransportResult<Connection> {
    match config {
        TransportConfig::Loopback { echo } => {
            let (transport, events) = loopback::LoopbackTransport::open(*echo);
            Ok(Connection { transport, events })
        }
        TransportConfig::Rosbridge { url, publish_type, subscribe_type } => {
            rosbridge::RosbridgeTransport::connect(url, publish_type, subscribe_type).await
        }
        TransportConfig::Udp { bind, peer } => udp::UdpTransport::connect(bind, peer).await,
    }
}
