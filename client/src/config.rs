use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use protocol::{InboundFormat, OutboundFormat};
use serde::{Deserialize, Serialize};

/// Client configuration, usually read from a TOML file. Every field has a default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub send: SendConfig,
    pub receive: ReceiveConfig,
    pub joystick: JoystickConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportConfig {
    /// In-process transport; with `echo` every send to a subscribed topic comes straight back.
    Loopback {
        #[serde(default)]
        echo: bool,
    },
    /// rosbridge v2 server over WebSocket.
    Rosbridge {
        url: String,
        #[serde(default = "default_publish_type")]
        publish_type: String,
        #[serde(default = "default_subscribe_type")]
        subscribe_type: String,
    },
    /// Plain datagrams carrying the payload text.
    Udp {
        #[serde(default = "default_udp_bind")]
        bind: String,
        peer: String,
    },
}

fn default_publish_type() -> String {
    "geometry_msgs/Twist".to_string()
}

fn default_subscribe_type() -> String {
    "std_msgs/String".to_string()
}

fn default_udp_bind() -> String {
    "0.0.0.0:0".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig::Loopback { echo: false }
    }
}

impl TransportConfig {
    pub fn rosbridge(url: impl Into<String>) -> Self {
        TransportConfig::Rosbridge {
            url: url.into(),
            publish_type: default_publish_type(),
            subscribe_type: default_subscribe_type(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TransportConfig::Loopback { .. } => "loopback",
            TransportConfig::Rosbridge { .. } => "rosbridge",
            TransportConfig::Udp { .. } => "udp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SendConfig {
    pub topic: String,
    /// Resend period; 50 ms matches the interactive remotes, 100 ms the broadcast ones.
    pub interval_ms: u64,
    pub format: OutboundFormat,
}

impl Default for SendConfig {
    fn default() -> Self {
        Self { topic: "CRAWLAB".to_string(), interval_ms: 50, format: OutboundFormat::CommaPair }
    }
}

impl SendConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveConfig {
    pub topic: String,
    pub format: InboundFormat,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self { topic: "CRAWLAB/test".to_string(), format: InboundFormat::CommaPair }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoystickConfig {
    /// Stick travel radius in pixels.
    pub radius: f32,
}

impl Default for JoystickConfig {
    fn default() -> Self {
        // 120 px widget
        Self { radius: 60.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Samples kept for plotting.
    pub plot_capacity: usize,
    /// Received lines kept in the message log.
    pub log_capacity: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { plot_capacity: 100, log_capacity: 500 }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg = toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::TwistScaling;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.send.interval(), Duration::from_millis(50));
        assert_eq!(cfg.display.plot_capacity, 100);
    }

    #[test]
    fn loads_rosbridge_twist_setup_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[transport]
kind = "rosbridge"
url = "ws://husky.local:9090"

[send]
topic = "/cmd_vel"
interval_ms = 100

[send.format]
kind = "twist"
max_angular = 0.75

[receive.format]
kind = "named_fields"
"#
        )
        .unwrap();

        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.transport, TransportConfig::rosbridge("ws://husky.local:9090"));
        assert_eq!(cfg.send.topic, "/cmd_vel");
        assert_eq!(cfg.send.interval(), Duration::from_millis(100));
        assert_eq!(
            cfg.send.format,
            OutboundFormat::Twist(TwistScaling { max_forward: 1.0, max_angular: 0.75 })
        );
        assert_eq!(cfg.receive.format, InboundFormat::named_fields());
        assert_eq!(cfg.receive.topic, "CRAWLAB/test");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("reading config"));
    }
}
