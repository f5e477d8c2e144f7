//! Input mapping for a virtual joystick and a four-way D-pad.
//!
//! This crate does no I/O. It turns drag gestures and button states into a
//! bounded velocity vector that the client forwards over a transport.

mod vector;
pub use vector::{Vector2, VECTOR_LIMIT};
mod mapper;
pub use mapper::{Joystick, JoystickMapper, StickReading};
mod dpad;
pub use dpad::{DirectionParseError, DirectionalState, Dpad};
