//! Wire formats for teleop payloads.
//!
//! Outbound encoders flatten the current [`joystick::Vector2`] into whatever a
//! given transport expects. Inbound decoding is lenient: anything that does
//! not parse turns into NaN rather than an error, and is displayed as such.

use std::borrow::Cow;
use std::fmt;

mod outbound;
pub use outbound::{OutboundFormat, Twist, TwistScaling, Vector3, VelocityCommand};
mod inbound;
pub use inbound::{parse_int_lenient, InboundFormat, Sample};
pub mod rosbridge;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body of one transport message: plain text or a structured object.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Json(serde_json::Value),
}

impl Payload {
    /// Text view of the payload.
    ///
    /// JSON strings are unquoted and a `std_msgs/String`-shaped object
    /// (`{"data": "..."}`) yields its `data` field; other JSON is rendered
    /// compactly.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Payload::Text(s) => Cow::Borrowed(s.as_str()),
            Payload::Json(serde_json::Value::String(s)) => Cow::Borrowed(s.as_str()),
            Payload::Json(value) => match value.get("data").and_then(|d| d.as_str()) {
                Some(data) => Cow::Borrowed(data),
                None => Cow::Owned(value.to_string()),
            },
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Text(s) => f.write_str(s),
            Payload::Json(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(v: serde_json::Value) -> Self {
        Payload::Json(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_view_unwraps_string_message() {
        let p = Payload::Json(json!({"data": "12,-4"}));
        assert_eq!(p.as_text(), "12,-4");
        let p = Payload::Json(json!("7,8"));
        assert_eq!(p.as_text(), "7,8");
        let p = Payload::Json(json!({"x": 1}));
        assert_eq!(p.as_text(), r#"{"x":1}"#);
    }
}
