//! Headless collaborators: a screen that only counts and advances the clock,
//! scripted and simulated pointing devices, a canned abort signal and an
//! in-memory trial sink. Used by `--simulate` runs and by the tests.

use crate::error::Result;
use crate::persistence::TrialSink;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use vmex_core::{
    AbortSignal, DeviceError, JoystickTrace, Point, PointingDevice, Polar, Screen, TargetPose,
    TargetStyle, TrialRecord,
};
use vmex_timing::ManualTimer;

/// Each committed frame advances the shared clock by one refresh period. A
/// rate with no usable period leaves the clock standing still.
#[derive(Debug)]
pub struct HeadlessScreen {
    timer: ManualTimer,
    frame_period: Duration,
    pending_target: Option<TargetPose>,
    visible_target: Rc<Cell<Option<TargetPose>>>,
    pub commits: usize,
    pub cursor_draws: usize,
    pub last_cursor: Option<Point>,
    pub target_styles: Vec<TargetStyle>,
    pub texts: Vec<String>,
}

impl HeadlessScreen {
    pub fn new(timer: ManualTimer, frame_rate: f64) -> Self {
        Self {
            timer,
            frame_period: Duration::try_from_secs_f64(frame_rate.recip()).unwrap_or_default(),
            pending_target: None,
            visible_target: Rc::new(Cell::new(None)),
            commits: 0,
            cursor_draws: 0,
            last_cursor: None,
            target_styles: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// The target shown on the last presented frame, if any.
    pub fn visible_target(&self) -> Rc<Cell<Option<TargetPose>>> {
        Rc::clone(&self.visible_target)
    }
}

impl Screen for HeadlessScreen {
    fn draw_cursor(&mut self, position: Point) {
        self.cursor_draws += 1;
        self.last_cursor = Some(position);
    }

    fn draw_target(&mut self, pose: &TargetPose) {
        self.target_styles.push(pose.style);
        self.pending_target = Some(*pose);
    }

    fn draw_text(&mut self, text: &str, _position: Point, _height: f64) {
        self.texts.push(text.to_owned());
    }

    fn commit_frame(&mut self) {
        self.visible_target.set(self.pending_target.take());
        self.commits += 1;
        self.timer.advance(self.frame_period);
    }
}

/// Position as a function of how many times the device has been polled.
pub struct ScriptedDevice<F> {
    script: F,
    polls: usize,
    disconnect_after: Option<usize>,
}

impl<F> ScriptedDevice<F>
where
    F: FnMut(usize) -> (f64, f64),
{
    pub fn new(script: F) -> Self {
        Self {
            script,
            polls: 0,
            disconnect_after: None,
        }
    }

    /// Every poll after the first `polls` fails.
    pub fn disconnect_after(&mut self, polls: usize) {
        self.disconnect_after = Some(polls);
    }

    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl<F> PointingDevice for ScriptedDevice<F>
where
    F: FnMut(usize) -> (f64, f64),
{
    fn position(&mut self) -> std::result::Result<(f64, f64), DeviceError> {
        if self.disconnect_after.is_some_and(|limit| self.polls >= limit) {
            return Err(DeviceError::Disconnected);
        }
        let position = (self.script)(self.polls);
        self.polls += 1;
        Ok(position)
    }
}

/// A stand-in subject that watches the headless screen: it reaches toward a
/// go target after a reaction delay, and on seeing the stop cue withholds
/// with probability `stop_success`.
pub struct SimulatedReacher {
    seen: Rc<Cell<Option<TargetPose>>>,
    scale: f64,
    rng: StdRng,
    reaction_frames: usize,
    speed: f64,
    stop_success: f64,
    reach: Option<Reach>,
}

struct Reach {
    angle: f64,
    radius: f64,
    extent: f64,
    frames_seen: usize,
    withholding: Option<bool>,
}

impl SimulatedReacher {
    /// `speed` is degrees per frame; `scale` converts degrees back to
    /// device units.
    pub fn new(seen: Rc<Cell<Option<TargetPose>>>, scale: f64, seed: u64) -> Self {
        Self {
            seen,
            scale,
            rng: StdRng::seed_from_u64(seed),
            reaction_frames: 15,
            speed: 1.0,
            stop_success: 0.5,
            reach: None,
        }
    }

    pub fn with_stop_success(mut self, p: f64) -> Self {
        self.stop_success = p.clamp(0.0, 1.0);
        self
    }
}

impl PointingDevice for SimulatedReacher {
    fn position(&mut self) -> std::result::Result<(f64, f64), DeviceError> {
        let target = self.seen.get().filter(|pose| pose.style != TargetStyle::HOLLOW);
        let Some(target) = target else {
            self.reach = None;
            return Ok((0.0, 0.0));
        };

        let goal = Polar::from_point(target.position);
        let reach = self.reach.get_or_insert(Reach {
            angle: goal.angle,
            radius: 0.0,
            extent: goal.radius,
            frames_seen: 0,
            withholding: None,
        });
        reach.frames_seen += 1;

        if target.style == TargetStyle::STOP && reach.withholding.is_none() {
            reach.withholding = Some(self.rng.random_bool(self.stop_success));
        }
        if reach.withholding == Some(true) {
            reach.radius = (reach.radius - self.speed).max(0.0);
        } else if reach.frames_seen > self.reaction_frames {
            reach.radius = (reach.radius + self.speed).min(reach.extent);
        }

        Ok(Polar {
            angle: reach.angle,
            radius: reach.radius,
        }
        .to_device(self.scale))
    }
}

/// Requests an abort once `trials` trial boundaries have passed.
#[derive(Debug, Clone, Default)]
pub struct AbortAfter {
    pub trials: Option<usize>,
    polled: usize,
}

impl AbortAfter {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn trials(trials: usize) -> Self {
        Self {
            trials: Some(trials),
            polled: 0,
        }
    }
}

impl AbortSignal for AbortAfter {
    fn poll_abort(&mut self) -> bool {
        let abort = self.trials.is_some_and(|limit| self.polled >= limit);
        self.polled += 1;
        abort
    }
}

#[derive(Debug, Default)]
pub struct MemorySink {
    pub trials: Vec<(TrialRecord, JoystickTrace)>,
}

impl TrialSink for MemorySink {
    fn record_trial(&mut self, record: &TrialRecord, trace: &JoystickTrace) -> Result<()> {
        self.trials.push((record.clone(), trace.clone()));
        Ok(())
    }
}
