//! Runs one frame-sampled trial phase.
//!
//! Each refresh: read the device, log the raw sample, rotate the feedback
//! angle by the trial's perturbation, draw what the phase shows, present.
//! During the go phase the radius is also scored against the movement
//! thresholds, and cursor feedback is masked while the reach is in transit.

use crate::context::SessionContext;
use crate::error::Result;
use rand::Rng;
use tracing::debug;
use vmex_core::{
    DeviceSample, MovementFlags, MovementZone, PointingDevice, Polar, Screen, TargetPose,
    TargetStyle, TrialPhase,
};
use vmex_timing::Timer;

#[derive(Debug, Clone, PartialEq)]
pub struct PhasePlan {
    pub phase: TrialPhase,
    pub frames: usize,
    /// Radians added to the displayed cursor angle. Recorded samples are raw.
    pub perturbation: f64,
    pub target: TargetPose,
    /// Frame at which the target switches to the stop style, go phase only.
    pub stop_cue_frame: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseOutcome {
    /// Seconds on the experiment clock.
    pub onset: f64,
    pub samples: Vec<DeviceSample>,
    /// Set for the go phase only.
    pub movement: Option<MovementFlags>,
}

impl<D, S, T, R> SessionContext<D, S, T, R>
where
    D: PointingDevice,
    S: Screen,
    T: Timer,
    R: Rng,
{
    pub fn run_phase(&mut self, plan: &PhasePlan) -> Result<PhaseOutcome> {
        let scale = self.config.scaling;
        let starting_radius = self.config.starting_radius;
        let hidden_radius = self.config.hidden_radius;

        let onset = self.timer.now_secs();
        let mut samples = Vec::with_capacity(plan.frames);
        let mut movement = MovementFlags::default();
        let mut target = plan.target;

        for frame in 0..plan.frames {
            let (x, y) = self.device.position()?;
            samples.push(DeviceSample {
                x,
                y,
                timestamp: self.timer.now_secs(),
            });

            let polar = Polar::from_device(x, y, scale);
            let cursor = polar.rotated(plan.perturbation).to_cartesian();

            if plan.stop_cue_frame == Some(frame) {
                target = target.with_style(TargetStyle::STOP);
                debug!(frame, "stop cue shown");
            }
            if plan.phase.shows_target() {
                self.screen.draw_target(&target);
            }

            if plan.phase.evaluates_movement() {
                let zone = MovementZone::classify(polar.radius, starting_radius, hidden_radius);
                movement.observe(zone);
                if zone.shows_feedback() {
                    self.screen.draw_cursor(cursor);
                }
            } else if plan.phase.shows_cursor() {
                self.screen.draw_cursor(cursor);
            }

            self.screen.commit_frame();
        }

        debug!(
            phase = plan.phase.label(),
            onset,
            frames = plan.frames,
            "phase complete"
        );

        Ok(PhaseOutcome {
            onset,
            samples,
            movement: plan.phase.evaluates_movement().then_some(movement),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::context::SubjectInfo;
    use crate::sim::{HeadlessScreen, ScriptedDevice};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use vmex_core::Point;
    use vmex_timing::ManualTimer;

    const FRAME_RATE: f64 = 60.0;

    fn context<F>(
        device: F,
    ) -> SessionContext<ScriptedDevice<F>, HeadlessScreen, ManualTimer, StdRng>
    where
        F: FnMut(usize) -> (f64, f64),
    {
        let timer = ManualTimer::new();
        // Radii in these tests are given directly in degrees.
        let config = ExperimentConfig {
            scaling: 1.0,
            starting_radius: 1.0,
            hidden_radius: 10.0,
            ..ExperimentConfig::default()
        };
        SessionContext::new(
            config,
            SubjectInfo::new(1, 1),
            FRAME_RATE,
            ScriptedDevice::new(device),
            HeadlessScreen::new(timer.clone(), FRAME_RATE),
            timer,
            StdRng::seed_from_u64(0),
        )
    }

    fn go_plan(frames: usize) -> PhasePlan {
        PhasePlan {
            phase: TrialPhase::Go,
            frames,
            perturbation: 0.0,
            target: TargetPose {
                position: Point::new(10.0, 0.0),
                style: TargetStyle::GO,
            },
            stop_cue_frame: None,
        }
    }

    #[test]
    fn one_sample_and_one_commit_per_frame() {
        let mut ctx = context(|_| (0.0, 0.0));
        let plan = PhasePlan {
            phase: TrialPhase::Fixation,
            frames: 45,
            perturbation: 0.0,
            target: TargetPose::resting(Point::ORIGIN),
            stop_cue_frame: None,
        };
        let outcome = ctx.run_phase(&plan).unwrap();
        assert_eq!(outcome.samples.len(), 45);
        assert_eq!(ctx.screen.commits, 45);
        assert_eq!(ctx.screen.cursor_draws, 0);
        assert!(outcome.movement.is_none());
        assert!(
            outcome
                .samples
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
        );
    }

    #[test]
    fn resting_near_center_sets_no_flags() {
        let mut ctx = context(|_| (0.5, 0.0));
        let movement = ctx.run_phase(&go_plan(45)).unwrap().movement.unwrap();
        assert_eq!(movement, MovementFlags::default());
        assert_eq!(ctx.screen.cursor_draws, 45);
    }

    #[test]
    fn reach_from_center_to_target_sets_both_flags() {
        let frames = 45;
        let mut ctx = context(move |i| (0.5 + 9.0 * i as f64 / (frames - 1) as f64, 0.0));
        let movement = ctx.run_phase(&go_plan(frames)).unwrap().movement.unwrap();
        assert!(movement.start_mov);
        assert!(movement.full_mov);
        // Feedback was hidden for every in-transit frame.
        assert!(ctx.screen.cursor_draws < frames);
    }

    #[test]
    fn perturbation_rotates_feedback_not_samples() {
        let mut ctx = context(|_| (0.5, 0.0));
        let plan = PhasePlan {
            phase: TrialPhase::Ready,
            frames: 1,
            perturbation: std::f64::consts::FRAC_PI_2,
            target: TargetPose::resting(Point::ORIGIN),
            stop_cue_frame: None,
        };
        let outcome = ctx.run_phase(&plan).unwrap();
        assert_eq!((outcome.samples[0].x, outcome.samples[0].y), (0.5, 0.0));
        let shown = ctx.screen.last_cursor.unwrap();
        assert!(shown.x.abs() < 1e-12);
        assert!((shown.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stop_cue_switches_style_and_keeps_sampling() {
        let mut ctx = context(move |i| if i < 20 { (0.0, 0.0) } else { (9.5, 0.0) });
        let plan = PhasePlan {
            stop_cue_frame: Some(12),
            ..go_plan(45)
        };
        let outcome = ctx.run_phase(&plan).unwrap();
        assert_eq!(outcome.samples.len(), 45);
        let styles = &ctx.screen.target_styles;
        assert!(styles[..12].iter().all(|s| *s == TargetStyle::GO));
        assert!(styles[12..].iter().all(|s| *s == TargetStyle::STOP));
        assert!(outcome.movement.unwrap().full_mov);
    }

    #[test]
    fn device_loss_aborts_the_phase() {
        let mut ctx = context(|_| (0.0, 0.0));
        ctx.device.disconnect_after(3);
        let err = ctx.run_phase(&go_plan(10)).unwrap_err();
        assert!(matches!(err, crate::ExperimentError::Device(_)));
        assert_eq!(ctx.screen.commits, 3);
    }
}
