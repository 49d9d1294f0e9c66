use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, Result};
use rand::Rng;
use vmex_core::{PointingDevice, Screen};
use vmex_timing::Timer;

/// Passes `frame_rate` through when it can time a frame: finite and above
/// zero.
pub fn check_frame_rate(frame_rate: f64) -> Result<f64> {
    if frame_rate.is_finite() && frame_rate > 0.0 {
        Ok(frame_rate)
    } else {
        Err(ExperimentError::config(format!(
            "frame rate must be a positive number of Hz, got {frame_rate}"
        )))
    }
}

/// Subject id (zero-padded to four digits) and session number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInfo {
    pub id: String,
    pub session: u32,
}

impl SubjectInfo {
    pub fn new(subject: u32, session: u32) -> Self {
        Self {
            id: format!("{subject:04}"),
            session,
        }
    }

    /// `ses<session>_<id>`, the stem shared by every file of the session.
    pub fn stem(&self) -> String {
        format!("ses{}_{}", self.session, self.id)
    }
}

/// Everything a trial needs, passed explicitly instead of living in globals.
pub struct SessionContext<D, S, T, R>
where
    D: PointingDevice,
    S: Screen,
    T: Timer,
    R: Rng,
{
    pub config: ExperimentConfig,
    pub subject: SubjectInfo,
    /// Refresh rate in whole hertz.
    pub frame_rate: f64,
    pub device: D,
    pub screen: S,
    pub timer: T,
    pub rng: R,
}

impl<D, S, T, R> SessionContext<D, S, T, R>
where
    D: PointingDevice,
    S: Screen,
    T: Timer,
    R: Rng,
{
    pub fn new(
        config: ExperimentConfig,
        subject: SubjectInfo,
        frame_rate: f64,
        device: D,
        screen: S,
        timer: T,
        rng: R,
    ) -> Self {
        Self {
            config,
            subject,
            frame_rate,
            device,
            screen,
            timer,
            rng,
        }
    }

    /// Number of refreshes covering `seconds`.
    pub fn frames_for(&self, seconds: f64) -> usize {
        (self.frame_rate * seconds).round().max(0.0) as usize
    }
}
