use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "teleop")]
#[command(about = "Joystick teleoperation client for a remote robot", long_about = None)]
pub struct Args {
    /// Optional TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// rosbridge WebSocket URL; overrides the configured transport
    #[arg(long)]
    pub url: Option<String>,
    /// Milliseconds between command frames
    #[arg(long)]
    pub interval_ms: Option<u64>,
    /// Seconds to wait for connect before giving up
    #[arg(long, default_value_t = 5)]
    pub connect_timeout_secs: u64,
    /// Start sending as soon as the connection is up
    #[arg(long, default_value_t = false)]
    pub autostart: bool,
}
