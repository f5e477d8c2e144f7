use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Vector2, VECTOR_LIMIT};

/// Which D-pad button is held. Only one at a time; a new press replaces the old one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionalState {
    #[default]
    Neutral,
    Up,
    Down,
    Left,
    Right,
}

impl DirectionalState {
    /// Full-scale command for this button.
    pub fn vector(self) -> Vector2 {
        match self {
            Self::Neutral => Vector2::ZERO,
            Self::Up => Vector2::new(0.0, VECTOR_LIMIT),
            Self::Down => Vector2::new(0.0, -VECTOR_LIMIT),
            Self::Left => Vector2::new(-VECTOR_LIMIT, 0.0),
            Self::Right => Vector2::new(VECTOR_LIMIT, 0.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown direction `{0}` (expected up, down, left or right)")]
pub struct DirectionParseError(pub String);

impl FromStr for DirectionalState {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(Self::Up),
            "down" | "d" => Ok(Self::Down),
            "left" | "l" => Ok(Self::Left),
            "right" | "r" => Ok(Self::Right),
            "neutral" | "none" => Ok(Self::Neutral),
            other => Err(DirectionParseError(other.to_string())),
        }
    }
}

/// Four-way button pad.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dpad {
    state: DirectionalState,
}

impl Dpad {
    pub fn state(&self) -> DirectionalState {
        self.state
    }

    pub fn vector(&self) -> Vector2 {
        self.state.vector()
    }

    pub fn press(&mut self, direction: DirectionalState) -> Vector2 {
        self.state = direction;
        self.vector()
    }

    /// Button released, or the pointer left it while held.
    pub fn release(&mut self) -> Vector2 {
        self.press(DirectionalState::Neutral)
    }
}
