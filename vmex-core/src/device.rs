//! Collaborator seams: the pointing device, the screen and the abort key.

use crate::stimulus::TargetPose;
use crate::transform::Point;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("pointing device disconnected")]
    Disconnected,
    #[error("pointing device unavailable: {0}")]
    Unavailable(String),
}

/// Polled once per rendered frame. Coordinates are device-native, y up.
pub trait PointingDevice {
    fn position(&mut self) -> Result<(f64, f64), DeviceError>;
}

/// Per-frame drawing surface. Positions are visual degrees. Draw calls queue
/// visuals for the current frame; `commit_frame` presents them and waits for
/// the next refresh.
pub trait Screen {
    fn draw_cursor(&mut self, position: Point);
    fn draw_target(&mut self, pose: &TargetPose);
    fn draw_text(&mut self, text: &str, position: Point, height: f64);
    fn commit_frame(&mut self);
}

pub trait AbortSignal {
    fn poll_abort(&mut self) -> bool;
}

impl<D: PointingDevice + ?Sized> PointingDevice for &mut D {
    fn position(&mut self) -> Result<(f64, f64), DeviceError> {
        (**self).position()
    }
}

impl<S: Screen + ?Sized> Screen for &mut S {
    fn draw_cursor(&mut self, position: Point) {
        (**self).draw_cursor(position)
    }
    fn draw_target(&mut self, pose: &TargetPose) {
        (**self).draw_target(pose)
    }
    fn draw_text(&mut self, text: &str, position: Point, height: f64) {
        (**self).draw_text(text, position, height)
    }
    fn commit_frame(&mut self) {
        (**self).commit_frame()
    }
}

impl<A: AbortSignal + ?Sized> AbortSignal for &mut A {
    fn poll_abort(&mut self) -> bool {
        (**self).poll_abort()
    }
}
