use crate::Vector2;

/// One joystick sample in widget pixels.
///
/// `x`/`y` are the raw displacement with `y` flipped to upward-positive;
/// only `magnitude` is capped by the stick radius.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StickReading {
    pub magnitude: f32,
    /// Heading in `[0, 360)`, 0° along +x, counter-clockwise.
    pub angle_deg: f32,
    pub x: f32,
    pub y: f32,
}

impl StickReading {
    pub const CENTERED: Self = Self { magnitude: 0.0, angle_deg: 0.0, x: 0.0, y: 0.0 };

    pub fn is_centered(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Displacement as a velocity command, clamped to the vector limit.
    pub fn vector(&self) -> Vector2 {
        Vector2::new(self.x, self.y)
    }
}

/// Pure drag-to-reading conversion for a circular stick of fixed radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickMapper {
    radius: f32,
}

impl JoystickMapper {
    pub fn new(radius: f32) -> Self {
        Self { radius: radius.abs() }
    }

    /// Stick drawn in a square widget of edge `size`; the bound is the inscribed circle.
    pub fn for_widget(size: f32) -> Self {
        Self::new(size / 2.0)
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Map a screen-space drag (`dy` grows downward) to a reading.
    pub fn map(&self, dx: f32, dy: f32) -> StickReading {
        // + 0.0 and 0.0 - fold -0.0 away so a reading on an axis reports 0, not -0
        let x = dx + 0.0;
        let y = 0.0 - dy;
        if x == 0.0 && y == 0.0 {
            return StickReading::CENTERED;
        }
        StickReading {
            magnitude: x.hypot(y).min(self.radius),
            angle_deg: heading_degrees(x, y),
            x,
            y,
        }
    }
}

/// atan(y/x) folded into the full circle, taken modulo 360 so that the
/// positive x axis reports 0 rather than 360 and the negative y axis 270.
fn heading_degrees(x: f32, y: f32) -> f32 {
    let deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative angles
    if deg >= 360.0 { 0.0 } else { deg }
}

/// Stateful stick that reports every change to a caller-supplied callback.
pub struct Joystick<F> {
    mapper: JoystickMapper,
    on_change: F,
    last: StickReading,
}

impl<F> Joystick<F>
where
    F: FnMut(StickReading),
{
    pub fn new(mapper: JoystickMapper, on_change: F) -> Self {
        Self { mapper, on_change, last: StickReading::CENTERED }
    }

    pub fn mapper(&self) -> JoystickMapper {
        self.mapper
    }

    pub fn reading(&self) -> StickReading {
        self.last
    }

    pub fn drag(&mut self, dx: f32, dy: f32) -> StickReading {
        let reading = self.mapper.map(dx, dy);
        self.report(reading)
    }

    /// Drag ended: the stick springs back to center.
    pub fn release(&mut self) -> StickReading {
        self.report(StickReading::CENTERED)
    }

    fn report(&mut self, reading: StickReading) -> StickReading {
        self.last = reading;
        (self.on_change)(reading);
        reading
    }
}
