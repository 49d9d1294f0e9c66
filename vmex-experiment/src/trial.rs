//! One full trial: centering gate, the four sampled phases, the inter-trial
//! interval, then the record and trace go to the sink.

use crate::context::SessionContext;
use crate::error::Result;
use crate::persistence::TrialSink;
use crate::phase_runner::{PhaseOutcome, PhasePlan};
use crate::scheduler::TrialCondition;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};
use vmex_core::{
    JoystickTrace, MovementFlags, Point, PointingDevice, Polar, Screen, TargetPose, TargetStyle,
    TrialPhase, TrialRecord,
};
use vmex_timing::Timer;

pub const RELEASE_PROMPT: &str = "Release the joystick";
const RELEASE_PROMPT_POS: Point = Point { x: -6.0, y: 0.0 };
const RELEASE_PROMPT_HEIGHT: f64 = 1.5;

impl<D, S, T, R> SessionContext<D, S, T, R>
where
    D: PointingDevice,
    S: Screen,
    T: Timer,
    R: Rng,
{
    /// Blocks until the device is back inside the starting radius, showing the
    /// release prompt on every frame it is not.
    pub fn await_centered(&mut self) -> Result<()> {
        let mut prompted = 0usize;
        loop {
            let (x, y) = self.device.position()?;
            if Polar::from_device(x, y, self.config.scaling).radius < self.config.starting_radius {
                if prompted > 0 {
                    debug!(frames = prompted, "device re-centred");
                }
                return Ok(());
            }
            self.screen.draw_text(RELEASE_PROMPT, RELEASE_PROMPT_POS, RELEASE_PROMPT_HEIGHT);
            self.screen.commit_frame();
            prompted += 1;
        }
    }

    /// Plans for fixation, ready, go and post-go, in that order.
    pub fn phase_plans(&self, condition: &TrialCondition) -> [PhasePlan; 4] {
        let resting = TargetPose::resting(self.config.origin());
        let go_target = TargetPose {
            position: Polar {
                angle: condition.target_angle(),
                radius: self.config.hidden_radius,
            }
            .to_cartesian(),
            style: TargetStyle::GO,
        };
        let go_frames = self.frames_for(self.config.go_time);
        // A negative delay never lines up with a go frame, so no cue is shown.
        let stop_cue_frame = condition
            .stop_delay()
            .filter(|ssd| *ssd >= 0.0)
            .map(|ssd| self.frames_for(ssd))
            .filter(|frame| *frame < go_frames);

        let seconds = [
            self.config.fixation_time,
            self.config.ready_time,
            self.config.go_time,
            self.config.post_go_time,
        ];
        std::array::from_fn(|slot| {
            let phase = TrialPhase::SAMPLED[slot];
            let is_go = phase == TrialPhase::Go;
            PhasePlan {
                phase,
                frames: self.frames_for(seconds[slot]),
                perturbation: condition.perturbation(),
                target: if is_go { go_target } else { resting },
                stop_cue_frame: stop_cue_frame.filter(|_| is_go),
            }
        })
    }

    /// Draws the ITI duration, shows the resting target and waits it out.
    /// Returns the onset and the drawn duration, both in seconds.
    pub fn run_inter_trial_interval(&mut self) -> (f64, f64) {
        let [low, high] = self.config.iti;
        let iti = self.rng.random_range(low..=high);
        let onset = self.timer.now_secs();
        self.screen.draw_target(&TargetPose::resting(self.config.origin()));
        self.screen.commit_frame();
        self.timer.sleep(Duration::from_secs_f64(iti));
        debug!(
            phase = TrialPhase::InterTrialInterval.label(),
            onset,
            duration = iti,
            "phase complete"
        );
        (onset, iti)
    }

    /// Runs trial `trial` under `condition` and hands the result to `sink`
    /// before returning it.
    pub fn run_trial<K: TrialSink + ?Sized>(
        &mut self,
        trial: usize,
        condition: &TrialCondition,
        sink: &mut K,
    ) -> Result<TrialRecord> {
        info!(
            trial,
            target_angle = condition.target_angle().to_degrees(),
            perturbation = condition.perturbation().to_degrees(),
            "trial started"
        );

        self.screen.draw_target(&TargetPose::resting(self.config.origin()));
        self.screen.commit_frame();
        self.await_centered()?;

        let plans = self.phase_plans(condition);
        let total_frames = plans.iter().map(|p| p.frames).sum();
        let mut trace = JoystickTrace::with_capacity(total_frames);
        let mut onsets = [0.0; 4];
        let mut movement = MovementFlags::default();

        for (slot, plan) in plans.iter().enumerate() {
            let PhaseOutcome {
                onset,
                samples,
                movement: phase_movement,
            } = self.run_phase(plan)?;
            onsets[slot] = onset;
            trace.extend(samples);
            if let Some(flags) = phase_movement {
                movement = flags;
            }
        }

        let (iti_onset, iti_dur) = self.run_inter_trial_interval();

        let (ssd, kind) = match *condition {
            TrialCondition::StopSignal { kind, ssd, .. } => (Some(ssd), Some(kind)),
            TrialCondition::Adaptation { .. } => (None, None),
        };
        let record = TrialRecord {
            subject_id: self.subject.id.clone(),
            trial,
            fix_dur: onsets[1] - onsets[0],
            ready_dur: onsets[2] - onsets[1],
            go_dur: onsets[3] - onsets[2],
            post_go_dur: iti_onset - onsets[3],
            iti_dur,
            target_angle: condition.target_angle(),
            cursor_displacement: match condition {
                TrialCondition::Adaptation { perturbation, .. } => Some(*perturbation),
                TrialCondition::StopSignal { .. } => None,
            },
            ssd,
            kind,
            movement,
        };

        sink.record_trial(&record, &trace)?;
        info!(
            trial,
            start_mov = movement.start_mov,
            full_mov = movement.full_mov,
            samples = trace.len(),
            "trial complete"
        );
        Ok(record)
    }
}
