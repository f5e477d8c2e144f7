//! rosbridge v2 operations, one JSON object per WebSocket text frame.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RosbridgeOp {
    Advertise {
        topic: String,
        #[serde(rename = "type")]
        msg_type: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Unadvertise {
        topic: String,
    },
    Publish {
        topic: String,
        msg: serde_json::Value,
    },
    Subscribe {
        topic: String,
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        msg_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Unsubscribe {
        topic: String,
    },
    /// Anything else the bridge sends (status, service responses, ...).
    #[serde(other)]
    Other,
}

pub fn encode(op: &RosbridgeOp) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(op)?)
}

pub fn decode(text: &str) -> Result<RosbridgeOp, ProtocolError> {
    Ok(serde_json::from_str(text)?)
}
