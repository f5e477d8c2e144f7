use std::sync::Arc;
use std::time::Duration;

use joystick::{DirectionalState, Dpad, Joystick, JoystickMapper, StickReading, Vector2};
use parking_lot::{Mutex, RwLock};
use protocol::{InboundFormat, OutboundFormat};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, TransportConfig};
use crate::display::{Display, DisplaySink, PlotSample};
use crate::send_loop::SendLoop;
use crate::transport::{self, EventStream, Transport, TransportError, TransportEvent, TransportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// State shared between the session and its send task.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlState {
    pub vector: Vector2,
    /// Frames handed to the transport since the session started.
    pub tick: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("subscribe to a topic before receiving data published to it")]
    NotSubscribed,
    #[error("no transport attached")]
    NoTransport,
    #[error(transparent)]
    Transport(#[from] TransportError),
}

type TransportSlot = Arc<RwLock<Option<Arc<dyn Transport>>>>;
type StickCallback = Box<dyn FnMut(StickReading) + Send>;

/// Everything one operator page used to keep in globals: the current
/// command vector, the input widgets, the send loop and the connection.
pub struct Session {
    id: Uuid,
    send_topic: String,
    send_format: OutboundFormat,
    receive_topic: String,
    receive_format: InboundFormat,
    control: Arc<Mutex<ControlState>>,
    joystick: Joystick<StickCallback>,
    dpad: Dpad,
    transport: TransportSlot,
    send_loop: SendLoop,
    connection: ConnectionState,
    subscribed: bool,
    receiving: bool,
    display: Display,
    started_at: Instant,
}

impl Session {
    pub fn new(cfg: &Config) -> Self {
        let control = Arc::new(Mutex::new(ControlState::default()));
        let stick_control = Arc::clone(&control);
        let on_stick: StickCallback = Box::new(move |reading: StickReading| {
            stick_control.lock().vector = reading.vector();
        });
        Self {
            id: Uuid::new_v4(),
            send_topic: cfg.send.topic.clone(),
            send_format: cfg.send.format,
            receive_topic: cfg.receive.topic.clone(),
            receive_format: cfg.receive.format.clone(),
            control,
            joystick: Joystick::new(JoystickMapper::new(cfg.joystick.radius), on_stick),
            dpad: Dpad::default(),
            transport: Arc::new(RwLock::new(None)),
            send_loop: SendLoop::new(cfg.send.interval()),
            connection: ConnectionState::Disconnected,
            subscribed: false,
            receiving: false,
            display: Display::new(cfg.display.plot_capacity, cfg.display.log_capacity),
            started_at: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_sending(&self) -> bool {
        self.send_loop.is_active()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn is_receiving(&self) -> bool {
        self.receiving
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn vector(&self) -> Vector2 {
        self.control.lock().vector
    }

    pub fn ticks(&self) -> u64 {
        self.control.lock().tick
    }

    pub fn stick(&self) -> StickReading {
        self.joystick.reading()
    }

    pub fn send_interval(&self) -> Duration {
        self.send_loop.period()
    }

    // --- input -------------------------------------------------------------

    pub fn drag(&mut self, dx: f32, dy: f32) -> StickReading {
        self.joystick.drag(dx, dy)
    }

    pub fn release_stick(&mut self) -> StickReading {
        self.joystick.release()
    }

    pub fn press(&mut self, direction: DirectionalState) -> Vector2 {
        let v = self.dpad.press(direction);
        self.control.lock().vector = v;
        v
    }

    pub fn release_button(&mut self) -> Vector2 {
        let v = self.dpad.release();
        self.control.lock().vector = v;
        v
    }

    pub fn direction(&self) -> DirectionalState {
        self.dpad.state()
    }

    // --- connection --------------------------------------------------------

    /// Connect (or reconnect) through `config`. On failure the session is
    /// left disconnected and usable; the caller may simply try again.
    pub async fn connect(&mut self, config: &TransportConfig, timeout: Duration) -> TransportResult<EventStream> {
        self.detach();
        self.connection = ConnectionState::Connecting;
        info!(session = %self.id, transport = config.kind(), "Connecting");
        let result = match tokio::time::timeout(timeout, transport::connect(config)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::ConnectFailed(format!(
                "timed out after {}s",
                timeout.as_secs_f32()
            ))),
        };
        match result {
            Ok(conn) => {
                self.attach(conn.transport);
                Ok(conn.events)
            }
            Err(err) => {
                self.connection = ConnectionState::Disconnected;
                error!(session = %self.id, %err, "Connection failed");
                Err(err)
            }
        }
    }

    /// Use an already-open transport. Its `Connected` event still has to be
    /// fed through [`Session::handle_event`].
    pub fn attach(&mut self, transport: Arc<dyn Transport>) {
        self.reset_flags();
        debug!(session = %self.id, kind = transport.kind(), "Transport attached");
        *self.transport.write() = Some(transport);
        if self.connection == ConnectionState::Disconnected {
            self.connection = ConnectionState::Connecting;
        }
    }

    pub fn disconnect(&mut self) {
        self.detach();
        self.connection = ConnectionState::Disconnected;
    }

    fn detach(&mut self) {
        self.reset_flags();
        let previous = self.transport.write().take();
        if let Some(previous) = previous {
            previous.disconnect();
        }
    }

    fn reset_flags(&mut self) {
        self.send_loop.stop();
        self.subscribed = false;
        self.receiving = false;
    }

    // --- transmission loop -------------------------------------------------

    /// Send now and then every interval. Returns false if already sending.
    ///
    /// Sends go out whatever the connection state; a dead link just logs a
    /// warning per frame.
    pub fn start_sending(&mut self) -> bool {
        let transport = Arc::clone(&self.transport);
        let control = Arc::clone(&self.control);
        let topic = self.send_topic.clone();
        let format = self.send_format;
        let started = self.send_loop.start(move || {
            let vector = {
                let mut control = control.lock();
                control.tick = control.tick.wrapping_add(1);
                control.vector
            };
            send_frame(&transport, &topic, format, vector);
        });
        if started {
            info!(session = %self.id, topic = %self.send_topic, "Sending started");
        }
        started
    }

    /// Returns false if nothing was being sent.
    pub fn stop_sending(&mut self) -> bool {
        let stopped = self.send_loop.stop();
        if stopped {
            info!(session = %self.id, ticks = self.ticks(), "Sending stopped");
        }
        stopped
    }

    /// Returns whether the session is sending afterwards.
    pub fn toggle_sending(&mut self) -> bool {
        if self.is_sending() {
            self.stop_sending();
            false
        } else {
            self.start_sending()
        }
    }

    // --- receiving ---------------------------------------------------------

    /// Subscribe to or unsubscribe from the receive topic. Returns the new subscription state.
    pub fn toggle_subscription(&mut self) -> Result<bool, SessionError> {
        let transport = self.transport.read().clone().ok_or(SessionError::NoTransport)?;
        if self.subscribed {
            transport.unsubscribe(&self.receive_topic)?;
            self.subscribed = false;
        } else {
            transport.subscribe(&self.receive_topic)?;
            self.subscribed = true;
        }
        info!(session = %self.id, topic = %self.receive_topic, subscribed = self.subscribed, "Subscription toggled");
        Ok(self.subscribed)
    }

    /// Start or stop handing inbound data to the display. Starting clears the message log.
    pub fn toggle_receiving(&mut self) -> Result<bool, SessionError> {
        if self.receiving {
            self.receiving = false;
            return Ok(false);
        }
        if !self.subscribed {
            return Err(SessionError::NotSubscribed);
        }
        self.display.clear_log();
        self.receiving = true;
        Ok(true)
    }

    /// Apply one transport event. Returns the plotted sample for inbound data
    /// that reached the display.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<PlotSample> {
        match event {
            TransportEvent::Connected => {
                self.connection = ConnectionState::Connected;
                info!(session = %self.id, "Connection made");
                None
            }
            TransportEvent::ConnectionLost { reason } => {
                self.connection = ConnectionState::Disconnected;
                error!(session = %self.id, %reason, "Connection lost");
                None
            }
            TransportEvent::Message { topic, payload } => {
                if !self.receiving {
                    debug!(%topic, "Dropping message while not receiving");
                    return None;
                }
                let sample = self.receive_format.decode(&payload);
                self.display.log(format!("Topic: {topic} | Data: {payload}"));
                let plotted = PlotSample {
                    t_secs: self.started_at.elapsed().as_secs_f32(),
                    x: sample.x,
                    y: sample.y,
                };
                self.display.plot(plotted);
                Some(plotted)
            }
        }
    }
}

fn send_frame(slot: &TransportSlot, topic: &str, format: OutboundFormat, vector: Vector2) {
    let payload = match format.encode(vector) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(?err, "Failed to encode frame");
            return;
        }
    };
    let transport = slot.read().clone();
    match transport {
        Some(transport) => {
            if let Err(err) = transport.send(topic, payload) {
                warn!(%err, topic, "Send failed");
            }
        }
        None => warn!(topic, "No transport attached; frame dropped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::loopback::LoopbackTransport;
    use protocol::Payload;

    fn config() -> Config {
        let mut cfg = Config::default();
        cfg.send.topic = "CRAWLAB".into();
        cfg.receive.topic = "CRAWLAB/test".into();
        cfg
    }

    fn pump(session: &mut Session, events: &mut EventStream) -> Vec<PlotSample> {
        let mut plotted = Vec::new();
        while let Ok(event) = events.try_recv() {
            plotted.extend(session.handle_event(event));
        }
        plotted
    }

    #[test]
    fn stick_drag_updates_clamped_vector() {
        let mut session = Session::new(&config());
        let reading = session.drag(150.0, 40.0);
        assert_eq!(reading.magnitude, 60.0);
        assert_eq!(session.vector(), Vector2::new(100.0, -40.0));
        session.release_stick();
        assert!(session.vector().is_zero());
    }

    #[test]
    fn dpad_press_and_release() {
        let mut session = Session::new(&config());
        session.press(DirectionalState::Down);
        assert_eq!(session.vector(), Vector2::new(0.0, -100.0));
        assert_eq!(session.direction(), DirectionalState::Down);
        session.release_button();
        assert!(session.vector().is_zero());
    }

    #[tokio::test(start_paused = true)]
    async fn sends_current_vector_every_interval() {
        let mut session = Session::new(&config());
        let (lb, mut events) = LoopbackTransport::open(false);
        session.attach(lb.clone());
        pump(&mut session, &mut events);
        assert_eq!(session.connection(), ConnectionState::Connected);

        session.press(DirectionalState::Up);
        assert!(session.start_sending());
        assert!(!session.start_sending());
        tokio::time::sleep(Duration::from_millis(60)).await;
        session.release_button();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(session.stop_sending());
        tokio::time::sleep(Duration::from_millis(200)).await;

        let sent: Vec<_> = lb.sent().into_iter().map(|m| m.payload).collect();
        assert_eq!(
            sent,
            vec![Payload::from("0,100"), Payload::from("0,100"), Payload::from("0,0")]
        );
        assert_eq!(session.ticks(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn sending_without_transport_is_attempted_not_fatal() {
        let mut session = Session::new(&config());
        assert!(session.start_sending());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(session.ticks(), 3);
        assert!(!session.toggle_sending());
        assert!(!session.is_sending());
    }

    #[tokio::test]
    async fn receiving_requires_subscription() {
        let mut session = Session::new(&config());
        assert!(matches!(session.toggle_receiving(), Err(SessionError::NotSubscribed)));
        assert!(matches!(session.toggle_subscription(), Err(SessionError::NoTransport)));

        let (lb, mut events) = LoopbackTransport::open(false);
        session.attach(lb.clone());
        pump(&mut session, &mut events);
        assert!(session.toggle_subscription().unwrap());
        assert!(lb.is_subscribed("CRAWLAB/test"));
        assert!(session.toggle_receiving().unwrap());
    }

    #[tokio::test]
    async fn inbound_pairs_reach_plot_only_while_receiving() {
        let mut session = Session::new(&config());
        let (lb, mut events) = LoopbackTransport::open(false);
        session.attach(lb.clone());
        session.toggle_subscription().unwrap();

        lb.inject("CRAWLAB/test", "1,2".into());
        assert!(pump(&mut session, &mut events).is_empty());

        session.toggle_receiving().unwrap();
        lb.inject("CRAWLAB/test", "30,-40".into());
        lb.inject("CRAWLAB/test", "garbage".into());
        let plotted = pump(&mut session, &mut events);
        assert_eq!(plotted.len(), 2);
        assert_eq!((plotted[0].x, plotted[0].y), (30.0, -40.0));
        assert!(plotted[1].x.is_nan());
        assert_eq!(session.display().samples().len(), 2);
        let newest = session.display().log_lines().next().unwrap();
        assert_eq!(newest, "Topic: CRAWLAB/test | Data: garbage");
    }

    #[tokio::test]
    async fn turning_receiving_back_on_clears_log_but_keeps_plot() {
        let mut session = Session::new(&config());
        let (lb, mut events) = LoopbackTransport::open(false);
        session.attach(lb.clone());
        session.toggle_subscription().unwrap();

        assert!(session.toggle_receiving().unwrap());
        lb.inject("CRAWLAB/test", "1,2".into());
        pump(&mut session, &mut events);
        assert_eq!(session.display().log_lines().count(), 1);

        assert!(!session.toggle_receiving().unwrap());
        lb.inject("CRAWLAB/test", "3,4".into());
        pump(&mut session, &mut events);
        assert_eq!(session.display().log_lines().count(), 1);

        assert!(session.toggle_receiving().unwrap());
        assert_eq!(session.display().log_lines().count(), 0);
        assert_eq!(session.display().samples().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_times_out_against_silent_peer() {
        // accepts TCP but never answers the WebSocket handshake
        let silent = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("ws://{}", silent.local_addr().unwrap());

        let mut session = Session::new(&config());
        let err = session
            .connect(&TransportConfig::rosbridge(url), Duration::from_secs(2))
            .await
            .err()
            .unwrap();
        assert!(matches!(&err, TransportError::ConnectFailed(msg) if msg.contains("timed out")));
        assert_eq!(session.connection(), ConnectionState::Disconnected);

        // still usable afterwards
        session.press(DirectionalState::Right);
        assert!(session.start_sending());
        assert_eq!(session.ticks(), 1);
    }

    #[tokio::test]
    async fn plot_history_is_capped() {
        let mut session = Session::new(&config());
        let (lb, mut events) = LoopbackTransport::open(false);
        session.attach(lb.clone());
        session.toggle_subscription().unwrap();
        session.toggle_receiving().unwrap();
        for i in 0..101 {
            lb.inject("CRAWLAB/test", format!("{i},0").into());
        }
        pump(&mut session, &mut events);
        let samples = session.display().samples();
        assert_eq!(samples.len(), 100);
        assert_eq!(samples.iter().next().map(|s| s.x), Some(1.0));
    }

    #[tokio::test(start_paused = true)]
    async fn connection_lost_keeps_session_usable() {
        let mut session = Session::new(&config());
        let mut events = session
            .connect(&TransportConfig::Loopback { echo: true }, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(session.connection(), ConnectionState::Connecting);
        pump(&mut session, &mut events);
        assert_eq!(session.connection(), ConnectionState::Connected);

        session.start_sending();
        session.disconnect();
        assert!(!session.is_sending());
        pump(&mut session, &mut events);
        assert_eq!(session.connection(), ConnectionState::Disconnected);

        // reconnect on the same session
        let mut events = session
            .connect(&TransportConfig::Loopback { echo: false }, Duration::from_secs(1))
            .await
            .unwrap();
        pump(&mut session, &mut events);
        assert_eq!(session.connection(), ConnectionState::Connected);
    }
}
