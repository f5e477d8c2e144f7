use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use protocol::Payload;
use tokio::sync::mpsc;
use tracing::debug;

use super::{EventStream, Transport, TransportError, TransportEvent, TransportResult};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub topic: String,
    pub payload: Payload,
}

/// In-process stand-in for a broker. Records every send and delivers
/// messages only on subscribed topics, like a pub/sub server would.
pub struct LoopbackTransport {
    echo: bool,
    state: Mutex<LoopbackState>,
}

struct LoopbackState {
    sent: Vec<SentMessage>,
    subscriptions: HashSet<String>,
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
}

impl LoopbackTransport {
    pub fn open(echo: bool) -> (Arc<Self>, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(TransportEvent::Connected);
        let transport = Arc::new(Self {
            echo,
            state: Mutex::new(LoopbackState {
                sent: Vec::new(),
                subscriptions: HashSet::new(),
                events: Some(tx),
            }),
        });
        (transport, rx)
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().sent.clone()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.state.lock().subscriptions.contains(topic)
    }

    /// Deliver a message as if a peer had published it. Returns false if nobody is subscribed.
    pub fn inject(&self, topic: &str, payload: Payload) -> bool {
        let state = self.state.lock();
        deliver(&state, topic, payload)
    }
}

fn deliver(state: &LoopbackState, topic: &str, payload: Payload) -> bool {
    if !state.subscriptions.contains(topic) {
        return false;
    }
    match &state.events {
        Some(tx) => tx
            .send(TransportEvent::Message { topic: topic.to_string(), payload })
            .is_ok(),
        None => false,
    }
}

impl Transport for LoopbackTransport {
    fn kind(&self) -> &'static str {
        "loopback"
    }

    fn send(&self, topic: &str, payload: Payload) -> TransportResult<()> {
        let mut state = self.state.lock();
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        state.sent.push(SentMessage { topic: topic.to_string(), payload: payload.clone() });
        if self.echo {
            deliver(&state, topic, payload);
        }
        Ok(())
    }

    fn subscribe(&self, topic: &str) -> TransportResult<()> {
        self.state.lock().subscriptions.insert(topic.to_string());
        debug!(topic, "loopback subscribed");
        Ok(())
    }

    fn unsubscribe(&self, topic: &str) -> TransportResult<()> {
        self.state.lock().subscriptions.remove(topic);
        debug!(topic, "loopback unsubscribed");
        Ok(())
    }

    fn disconnect(&self) {
        if let Some(tx) = self.state.lock().events.take() {
            let _ = tx.send(TransportEvent::ConnectionLost { reason: "closed by client".to_string() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_reports_connected() {
        let (_t, mut events) = LoopbackTransport::open(false);
        assert_eq!(events.try_recv().unwrap(), TransportEvent::Connected);
    }

    #[test]
    fn echo_only_reaches_subscribers() {
        let (t, mut events) = LoopbackTransport::open(true);
        let _ = events.try_recv();
        t.send("a", "1,2".into()).unwrap();
        assert!(events.try_recv().is_err());

        t.subscribe("a").unwrap();
        t.send("a", "3,4".into()).unwrap();
        assert_eq!(
            events.try_recv().unwrap(),
            TransportEvent::Message { topic: "a".into(), payload: "3,4".into() }
        );
        assert_eq!(t.sent().len(), 2);
    }

    #[test]
    fn send_after_disconnect_fails() {
        let (t, mut events) = LoopbackTransport::open(false);
        let _ = events.try_recv();
        t.disconnect();
        assert!(matches!(events.try_recv().unwrap(), TransportEvent::ConnectionLost { .. }));
        assert!(matches!(t.send("a", "0,0".into()), Err(TransportError::NotConnected)));
        // second disconnect is harmless
        t.disconnect();
    }
}
