use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use protocol::Payload;
use tokio::net::{lookup_host, UdpSocket};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{Connection, Transport, TransportError, TransportEvent, TransportResult};

const MAX_DATAGRAM: usize = 1500;

/// One datagram per frame, carrying the payload text (`"x,y"` for the comma-pair format).
///
/// UDP has no topics: the send topic is ignored and inbound datagrams are
/// reported with the peer address as their topic.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    open: AtomicBool,
    reader: Mutex<Option<JoinHandle<()>>>,
    events: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
}

impl UdpTransport {
    pub async fn connect(bind: &str, peer: &str) -> TransportResult<Connection> {
        let peer = lookup_host(peer)
            .await
            .map_err(|e| TransportError::InvalidConfig(format!("peer {peer}: {e}")))?
            .next()
            .ok_or_else(|| TransportError::InvalidConfig(format!("peer {peer} did not resolve")))?;
        let socket = UdpSocket::bind(bind)
            .await
            .map_err(|e| TransportError::ConnectFailed(format!("bind {bind}: {e}")))?;
        socket
            .connect(peer)
            .await
            .map_err(|e| TransportError::ConnectFailed(format!("connect {peer}: {e}")))?;
        let socket = Arc::new(socket);
        info!(local = ?socket.local_addr().ok(), %peer, "UDP transport ready");

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(TransportEvent::Connected);

        let reader_socket = Arc::clone(&socket);
        let reader_events = event_tx.clone();
        let topic = peer.to_string();
        let reader = tokio::spawn(async move {
            let mut buf = [0u8; MAX_DATAGRAM];
            loop {
                match reader_socket.recv(&mut buf).await {
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                        let event = TransportEvent::Message { topic: topic.clone(), payload: Payload::Text(text) };
                        if reader_events.send(event).is_err() {
                            return;
                        }
                    }
                    // ICMP port unreachable from an earlier send; the peer may come up later
                    Err(err) if err.kind() == ErrorKind::ConnectionRefused => {
                        debug!(%err, "UDP peer unreachable");
                    }
                    Err(err) => {
                        let _ = reader_events.send(TransportEvent::ConnectionLost { reason: err.to_string() });
                        return;
                    }
                }
            }
        });

        let transport = Arc::new(Self {
            socket,
            peer,
            open: AtomicBool::new(true),
            reader: Mutex::new(Some(reader)),
            events: Mutex::new(Some(event_tx)),
        });
        Ok(Connection { transport, events: event_rx })
    }

    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

impl Transport for UdpTransport {
    fn kind(&self) -> &'static str {
        "udp"
    }

    fn send(&self, _topic: &str, payload: Payload) -> TransportResult<()> {
        if !self.open.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        let text = payload.as_text();
        match self.socket.try_send(text.as_bytes()) {
            Ok(_) => Ok(()),
            Err(err) => Err(TransportError::SendFailed(err.to_string())),
        }
    }

    // Datagrams arrive whether or not anyone asked.
    fn subscribe(&self, topic: &str) -> TransportResult<()> {
        debug!(topic, "UDP subscribe is a no-op");
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        debug!(topic, "UDP unsubscribe is a no-op");
        Ok(())
    }

    fn disconnect(&self) {
        if !self.open.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
        if let Some(tx) = self.events.lock().take() {
            let _ = tx.send(TransportEvent::ConnectionLost { reason: "closed by client".to_string() });
        }
        info!(peer = %self.peer, "UDP transport closed");
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.lock().take() {
            reader.abort();
        }
    }
}
