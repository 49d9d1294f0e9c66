use crate::transform::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const GREEN: Rgba = Rgba([0, 128, 0, 255]);
    pub const RED: Rgba = Rgba([255, 0, 0, 255]);
    pub const GRAY: Rgba = Rgba([132, 132, 132, 255]);
}

/// How a target circle is painted. `fill: None` draws the outline only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStyle {
    pub fill: Option<Rgba>,
    pub line: Rgba,
}

impl TargetStyle {
    /// Resting target at the origin.
    pub const HOLLOW: TargetStyle = TargetStyle {
        fill: None,
        line: Rgba::WHITE,
    };
    pub const GO: TargetStyle = TargetStyle {
        fill: Some(Rgba::GREEN),
        line: Rgba::GREEN,
    };
    pub const STOP: TargetStyle = TargetStyle {
        fill: Some(Rgba::RED),
        line: Rgba::RED,
    };
}

/// "Target visible with style X at position Y."
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPose {
    pub position: Point,
    pub style: TargetStyle,
}

impl TargetPose {
    pub fn resting(origin: Point) -> Self {
        Self {
            position: origin,
            style: TargetStyle::HOLLOW,
        }
    }

    pub fn with_style(self, style: TargetStyle) -> Self {
        Self { style, ..self }
    }
}
