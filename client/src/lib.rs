use std::time::Duration;

use anyhow::Result;
use protocol::{OutboundFormat, TwistScaling};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

pub mod args;
pub mod commands;
pub mod config;
pub mod display;
pub mod send_loop;
pub mod session;
pub mod transport;

pub use args::Args;
pub use commands::{Command, CommandError};
pub use config::{load_config, Config, TransportConfig};
pub use session::{ConnectionState, Session, SessionError};

use transport::{EventStream, TransportEvent};

const ROSBRIDGE_CMD_TOPIC: &str = "/cmd_vel";

/// Fold command-line overrides into the loaded config.
///
/// `--url` against a config that is not already rosbridge also switches the
/// outbound side to a `Twist` on `/cmd_vel`, which is what the advertised
/// `geometry_msgs/Twist` type expects.
pub fn apply_overrides(cfg: &mut Config, args: &Args) {
    if let Some(url) = &args.url {
        match &mut cfg.transport {
            TransportConfig::Rosbridge { url: configured, .. } => *configured = url.clone(),
            _ => {
                cfg.transport = TransportConfig::rosbridge(url.clone());
                cfg.send.topic = ROSBRIDGE_CMD_TOPIC.to_string();
                cfg.send.format = OutboundFormat::Twist(TwistScaling::default());
            }
        }
    }
    if let Some(ms) = args.interval_ms {
        cfg.send.interval_ms = ms;
    }
}

pub async fn run(args: Args, cfg: Config) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    drive(
        cfg,
        Duration::from_secs(args.connect_timeout_secs),
        args.autostart,
        stdin,
    )
    .await
}

enum Step {
    Line(Option<String>),
    Event(Option<TransportEvent>),
}

enum Flow {
    Continue,
    Quit,
}

/// Run a session against lines from `input` until `quit` or end of input.
pub async fn drive<R>(cfg: Config, connect_timeout: Duration, autostart: bool, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut session = Session::new(&cfg);
    info!(session = %session.id(), transport = cfg.transport.kind(), "Session created");

    let mut events = session.connect(&cfg.transport, connect_timeout).await.ok();
    if autostart && events.is_some() {
        session.start_sending();
    }

    let mut lines = input.lines();
    loop {
        let step = tokio::select! {
            line = lines.next_line() => Step::Line(line?),
            event = next_event(&mut events) => Step::Event(event),
        };
        match step {
            Step::Line(None) => break,
            Step::Line(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(cmd) => {
                        if let Flow::Quit = execute(&mut session, &cfg, connect_timeout, &mut events, cmd).await {
                            break;
                        }
                    }
                    Err(err) => println!("error: {err}"),
                }
            }
            Step::Event(Some(event)) => {
                if session.handle_event(event).is_some() {
                    if let Some(line) = session.display().log_lines().next() {
                        println!("{line}");
                    }
                }
            }
            Step::Event(None) => events = None,
        }
    }

    session.disconnect();
    info!(session = %session.id(), ticks = session.ticks(), "Session finished");
    Ok(())
}

async fn next_event(events: &mut Option<EventStream>) -> Option<TransportEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn execute(
    session: &mut Session,
    cfg: &Config,
    connect_timeout: Duration,
    events: &mut Option<EventStream>,
    cmd: Command,
) -> Flow {
    match cmd {
        Command::Drag { dx, dy } => {
            let reading = session.drag(dx, dy);
            println!(
                "magnitude {:.1} angle {:.1} -> {}",
                reading.magnitude,
                reading.angle_deg,
                session.vector()
            );
        }
        Command::Release => {
            session.release_stick();
            println!("stick centered -> {}", session.vector());
        }
        Command::Press(dir) => println!("{dir:?} -> {}", session.press(dir)),
        Command::Unpress => println!("released -> {}", session.release_button()),
        Command::Start => {
            if !session.start_sending() {
                println!("already sending");
            }
        }
        Command::Stop => {
            if !session.stop_sending() {
                println!("not sending");
            }
        }
        Command::Toggle => println!("sending: {}", session.toggle_sending()),
        Command::Subscribe => match session.toggle_subscription() {
            Ok(on) => println!("subscribed: {on}"),
            Err(err) => println!("error: {err}"),
        },
        Command::Receive => match session.toggle_receiving() {
            Ok(on) => println!("receiving: {on}"),
            Err(err) => println!("error: {err}"),
        },
        Command::Connect => match session.connect(&cfg.transport, connect_timeout).await {
            Ok(stream) => *events = Some(stream),
            Err(err) => {
                *events = None;
                println!("error: {err}");
            }
        },
        Command::Disconnect => session.disconnect(),
        Command::Status => println!("{}", status_line(session)),
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}

pub fn status_line(session: &Session) -> String {
    let latest = session
        .display()
        .samples()
        .latest()
        .map(|s| format!("{},{}", s.x, s.y))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "connection={:?} sending={} subscribed={} receiving={} vector={} ticks={} samples={} latest={}",
        session.connection(),
        session.is_sending(),
        session.is_subscribed(),
        session.is_receiving(),
        session.vector(),
        session.ticks(),
        session.display().samples().len(),
        latest,
    )
}
