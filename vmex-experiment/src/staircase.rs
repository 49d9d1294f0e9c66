//! One-up/one-down tracking of the stop-signal delay.

use crate::config::StopSignalSettings;
use vmex_core::MovementFlags;

#[derive(Debug, Clone, PartialEq)]
pub struct Staircase {
    ssd: f64,
    step: f64,
    floor: Option<f64>,
    ceiling: Option<f64>,
}

impl Staircase {
    /// Unbounded staircase.
    pub fn new(initial: f64, step: f64) -> Self {
        Self {
            ssd: initial,
            step,
            floor: None,
            ceiling: None,
        }
    }

    pub fn with_bounds(mut self, floor: Option<f64>, ceiling: Option<f64>) -> Self {
        self.floor = floor;
        self.ceiling = ceiling;
        self.ssd = self.clamp(self.ssd);
        self
    }

    pub fn from_settings(settings: &StopSignalSettings) -> Self {
        Self::new(settings.ssd_init, settings.ssd_step)
            .with_bounds(settings.ssd_min, settings.ssd_max)
    }

    /// Current delay in seconds.
    pub fn current(&self) -> f64 {
        self.ssd
    }

    /// Applies the outcome of one stop trial. A completed reach shortens the
    /// delay; a withheld one lengthens it.
    pub fn update(&mut self, movement: MovementFlags) -> f64 {
        let next = if movement.full_mov {
            self.ssd - self.step
        } else {
            self.ssd + self.step
        };
        self.ssd = self.clamp(next);
        self.ssd
    }

    fn clamp(&self, ssd: f64) -> f64 {
        let ssd = self.floor.map_or(ssd, |lo| ssd.max(lo));
        self.ceiling.map_or(ssd, |hi| ssd.min(hi))
    }
}
