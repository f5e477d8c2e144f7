use std::collections::HashSet;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use protocol::rosbridge::{self, RosbridgeOp};
use protocol::Payload;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::{Connection, Transport, TransportError, TransportEvent, TransportResult};

/// rosbridge v2 client over WebSocket.
///
/// Outbound topics are advertised on first use with `publish_type`; text
/// payloads are wrapped as `std_msgs/String`.
///
/// The reader and writer tasks are detached. Dropping the last handle closes
/// the outbound channel, so the writer still sends a close frame and the
/// reader still reports `ConnectionLost` once the peer answers.
pub struct RosbridgeTransport {
    publish_type: String,
    subscribe_type: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    advertised: Mutex<HashSet<String>>,
}

impl RosbridgeTransport {
    pub async fn connect(
        url: &str,
        publish_type: &str,
        subscribe_type: &str,
    ) -> TransportResult<Connection> {
        let url = if url.starts_with("ws://") || url.starts_with("wss://") {
            url.to_string()
        } else {
            format!("ws://{url}")
        };
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        info!(%url, "Connected to rosbridge");

        let (mut sink, mut source) = stream.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let _ = event_tx.send(TransportEvent::Connected);

        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(err) = sink.send(frame).await {
                    warn!(%err, "rosbridge write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(Message::Text(text))) => match rosbridge::decode(&text) {
                        Ok(RosbridgeOp::Publish { topic, msg }) => {
                            let event = TransportEvent::Message { topic, payload: Payload::Json(msg) };
                            if event_tx.send(event).is_err() {
                                return;
                            }
                        }
                        Ok(other) => debug!(?other, "Ignoring rosbridge op"),
                        Err(err) => warn!(?err, "Failed to decode rosbridge frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "connection closed".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => break err.to_string(),
                    None => break "stream ended".to_string(),
                }
            };
            let _ = event_tx.send(TransportEvent::ConnectionLost { reason });
        });

        let transport = Arc::new(Self {
            publish_type: publish_type.to_string(),
            subscribe_type: subscribe_type.to_string(),
            outbound: Mutex::new(Some(out_tx)),
            advertised: Mutex::new(HashSet::new()),
        });
        Ok(Connection { transport, events: event_rx })
    }

    fn push(&self, op: &RosbridgeOp) -> TransportResult<()> {
        let text = rosbridge::encode(op)?;
        let outbound = self.outbound.lock();
        let tx = outbound.as_ref().ok_or(TransportError::NotConnected)?;
        tx.send(Message::text(text)).map_err(|_| TransportError::NotConnected)
    }

    fn ensure_advertised(&self, topic: &str) -> TransportResult<()> {
        if !self.advertised.lock().insert(topic.to_string()) {
            return Ok(());
        }
        let result = self.push(&RosbridgeOp::Advertise {
            topic: topic.to_string(),
            msg_type: self.publish_type.clone(),
            id: None,
        });
        if result.is_err() {
            self.advertised.lock().remove(topic);
        }
        result
    }
}

impl Transport for RosbridgeTransport {
    fn kind(&self) -> &'static str {
        "rosbridge"
    }

    fn send(&self, topic: &str, payload: Payload) -> TransportResult<()> {
        self.ensure_advertised(topic)?;
        let msg = match payload {
            Payload::Json(value) => value,
            Payload::Text(text) => serde_json::json!({ "data": text }),
        };
        self.push(&RosbridgeOp::Publish { topic: topic.to_string(), msg })
    }

    fn subscribe(&self, topic: &str) -> TransportResult<()> {
        self.push(&RosbridgeOp::Subscribe {
            topic: topic.to_string(),
            msg_type: Some(self.subscribe_type.clone()),
            id: None,
        })
    }

    fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        self.push(&RosbridgeOp::Unsubscribe { topic: topic.to_string() })
    }

    fn disconnect(&self) {
        // Dropping the sender ends the writer, which sends a close frame;
        // the reader then reports ConnectionLost.
        if self.outbound.lock().take().is_some() {
            info!("Closing rosbridge connection");
        }
    }
}
