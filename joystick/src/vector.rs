use serde::Serialize;
use std::fmt;

/// Largest magnitude either component of a [`Vector2`] may take.
pub const VECTOR_LIMIT: f32 = 100.0;

/// Velocity command in percent of full scale, upward-positive `y`.
///
/// Components are clamped to `[-VECTOR_LIMIT, VECTOR_LIMIT]` on construction,
/// so every value of this type is in range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector2 {
    x: f32,
    y: f32,
}

impl Vector2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x: clamp_component(x), y: clamp_component(y) }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

fn clamp_component(v: f32) -> f32 {
    if v.is_nan() {
        return 0.0;
    }
    // + 0.0 folds -0.0 into 0.0 so "x,y" never prints "-0"
    v.clamp(-VECTOR_LIMIT, VECTOR_LIMIT) + 0.0
}

/// Comma-joined form, `"x,y"`.
impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}
