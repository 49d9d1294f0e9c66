//! Cartesian/polar conversion for pointing-device samples.
//!
//! Device samples arrive in device-native units; the scale factor maps them
//! into visual degrees before the polar conversion. Angles are radians,
//! measured counter-clockwise from +x.

use serde::{Deserialize, Serialize};

/// A position in visual degrees, origin at screen centre, y up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Point::new(x, y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Polar {
    pub angle: f64,
    pub radius: f64,
}

impl Polar {
    /// Scales a raw device sample and converts it to polar form.
    pub fn from_device(x: f64, y: f64, scale: f64) -> Self {
        let (sx, sy) = (x * scale, y * scale);
        Polar {
            angle: sy.atan2(sx),
            radius: sx.hypot(sy),
        }
    }

    pub fn from_point(point: Point) -> Self {
        Self::from_device(point.x, point.y, 1.0)
    }

    /// Same radius, angle shifted by `by` radians.
    pub fn rotated(self, by: f64) -> Self {
        Polar {
            angle: self.angle + by,
            radius: self.radius,
        }
    }

    /// Cartesian position in the scaled (visual-degree) space.
    pub fn to_cartesian(self) -> Point {
        let (sin, cos) = self.angle.sin_cos();
        Point::new(self.radius * cos, self.radius * sin)
    }

    /// Undoes [`Polar::from_device`], returning device-native units.
    pub fn to_device(self, scale: f64) -> (f64, f64) {
        let p = self.to_cartesian();
        (p.x / scale, p.y / scale)
    }
}
