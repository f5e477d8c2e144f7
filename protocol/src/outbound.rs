use joystick::{Vector2, VECTOR_LIMIT};
use serde::{Deserialize, Serialize};

use crate::{Payload, ProtocolError};

/// Full-scale speeds a [`Vector2`] maps onto when sent as a Twist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwistScaling {
    /// m/s at `y = 100`.
    #[serde(default = "default_max_forward")]
    pub max_forward: f64,
    /// rad/s at `x = -100` (stick left turns counter-clockwise).
    #[serde(default = "default_max_angular")]
    pub max_angular: f64,
}

fn default_max_forward() -> f64 {
    1.0
}

fn default_max_angular() -> f64 {
    0.5
}

impl Default for TwistScaling {
    fn default() -> Self {
        Self { max_forward: default_max_forward(), max_angular: default_max_angular() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// `geometry_msgs/Twist`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    pub fn from_vector(v: Vector2, scaling: TwistScaling) -> Self {
        let limit = f64::from(VECTOR_LIMIT);
        // + 0.0 keeps a centered stick from producing -0.0 on the wire
        Self {
            linear: Vector3 { x: f64::from(v.y()) * scaling.max_forward / limit + 0.0, ..Vector3::default() },
            angular: Vector3 { z: -f64::from(v.x()) * scaling.max_angular / limit + 0.0, ..Vector3::default() },
        }
    }
}

/// `{"vel": {"x": .., "y": ..}}`, the Socket.IO `velocity_commands` body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VelocityCommand {
    pub vel: Vector2,
}

/// How the current vector is flattened for the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutboundFormat {
    /// `"x,y"` as text.
    #[default]
    CommaPair,
    /// [`VelocityCommand`] as JSON.
    VelocityObject,
    /// [`Twist`] as JSON.
    Twist(TwistScaling),
}

impl OutboundFormat {
    pub fn encode(&self, v: Vector2) -> Result<Payload, ProtocolError> {
        match self {
            OutboundFormat::CommaPair => Ok(Payload::Text(v.to_string())),
            OutboundFormat::VelocityObject => {
                Ok(Payload::Json(serde_json::to_value(VelocityCommand { vel: v })?))
            }
            OutboundFormat::Twist(scaling) => {
                Ok(Payload::Json(serde_json::to_value(Twist::from_vector(v, *scaling))?))
            }
        }
    }
}
