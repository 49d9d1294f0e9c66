//! Per-trial conditions: target direction plus either the feedback rotation
//! (adaptation task) or the go/stop label and current delay (stop-signal task).

use crate::config::ExperimentConfig;
use crate::error::{ExperimentError, Result};
use crate::staircase::Staircase;
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;
use vmex_core::{MovementFlags, TrialKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperimentPhase {
    NoPerturbation,
    Adaptation,
    AfterEffect,
}

/// Trial-index boundaries of the adaptation task blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseBoundaries {
    /// Trials below this index are baseline.
    pub no_perturbation: usize,
    /// First adaptation trial (inclusive).
    pub adaptation_start: usize,
    /// Last adaptation trial (inclusive).
    pub adaptation_end: usize,
}

impl PhaseBoundaries {
    /// Trials between `no_perturbation` and `adaptation_start` land in
    /// `AfterEffect`; `validate` rejects configurations that open that gap.
    pub fn classify(&self, trial: usize) -> ExperimentPhase {
        if trial < self.no_perturbation {
            ExperimentPhase::NoPerturbation
        } else if (self.adaptation_start..=self.adaptation_end).contains(&trial) {
            ExperimentPhase::Adaptation
        } else {
            ExperimentPhase::AfterEffect
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.adaptation_start > self.adaptation_end {
            return Err(ExperimentError::config(format!(
                "adaptation_start ({}) is after adaptation_end ({})",
                self.adaptation_start, self.adaptation_end
            )));
        }
        if self.no_perturbation != self.adaptation_start {
            return Err(ExperimentError::config(format!(
                "no_perturbation_trials ({}) must equal adaptation_start ({}); \
                 trials in between would be scored as after-effect",
                self.no_perturbation, self.adaptation_start
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrialCondition {
    Adaptation {
        target_angle: f64,
        phase: ExperimentPhase,
        /// Radians added to the feedback angle.
        perturbation: f64,
    },
    StopSignal {
        target_angle: f64,
        kind: TrialKind,
        /// Delay in force for this trial, seconds.
        ssd: f64,
    },
}

impl TrialCondition {
    /// Radians.
    pub fn target_angle(&self) -> f64 {
        match *self {
            TrialCondition::Adaptation { target_angle, .. }
            | TrialCondition::StopSignal { target_angle, .. } => target_angle,
        }
    }

    pub fn perturbation(&self) -> f64 {
        match *self {
            TrialCondition::Adaptation { perturbation, .. } => perturbation,
            TrialCondition::StopSignal { .. } => 0.0,
        }
    }

    /// When the stop cue should appear, for stop trials only.
    pub fn stop_delay(&self) -> Option<f64> {
        match *self {
            TrialCondition::StopSignal {
                kind: TrialKind::Stop,
                ssd,
                ..
            } => Some(ssd),
            _ => None,
        }
    }
}

pub trait Schedule {
    fn len(&self) -> usize;

    fn condition(&self, trial: usize) -> TrialCondition;

    /// Called once a trial has been persisted.
    fn observe(&mut self, _condition: &TrialCondition, _movement: MovementFlags) {}
}

/// `n_directions` directions spaced by `target_angle` degrees, one block per
/// direction set, shuffled once.
pub fn shuffled_target_angles<R: Rng + ?Sized>(
    config: &ExperimentConfig,
    rng: &mut R,
) -> Vec<f64> {
    let directions: Vec<f64> = (0..config.n_directions)
        .map(|i| (config.target_angle * i as f64).to_radians())
        .collect();
    let blocks = config.n_trial / config.n_directions.max(1);
    let mut angles: Vec<f64> = directions
        .iter()
        .copied()
        .cycle()
        .take(directions.len() * blocks)
        .collect();
    angles.shuffle(rng);
    angles
}

#[derive(Debug, Clone)]
pub struct AdaptationSchedule {
    boundaries: PhaseBoundaries,
    perturbation: f64,
    target_angles: Vec<f64>,
}

impl AdaptationSchedule {
    pub fn new<R: Rng + ?Sized>(config: &ExperimentConfig, rng: &mut R) -> Self {
        Self {
            boundaries: config.boundaries(),
            perturbation: config.perturbation(),
            target_angles: shuffled_target_angles(config, rng),
        }
    }

    pub fn classify(&self, trial: usize) -> ExperimentPhase {
        self.boundaries.classify(trial)
    }

    pub fn perturbation_for(&self, phase: ExperimentPhase) -> f64 {
        match phase {
            ExperimentPhase::Adaptation => self.perturbation,
            ExperimentPhase::NoPerturbation | ExperimentPhase::AfterEffect => 0.0,
        }
    }
}

impl Schedule for AdaptationSchedule {
    fn len(&self) -> usize {
        self.target_angles.len()
    }

    fn condition(&self, trial: usize) -> TrialCondition {
        let phase = self.classify(trial);
        TrialCondition::Adaptation {
            target_angle: self.target_angles[trial],
            phase,
            perturbation: self.perturbation_for(phase),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StopSignalSchedule {
    target_angles: Vec<f64>,
    labels: Vec<TrialKind>,
    staircase: Staircase,
}

impl StopSignalSchedule {
    pub fn new<R: Rng + ?Sized>(config: &ExperimentConfig, rng: &mut R) -> Result<Self> {
        let settings = config.stop_signal()?;
        let target_angles = shuffled_target_angles(config, rng);
        let mut labels = vec![TrialKind::Go; config.n_trial - settings.stop_trials];
        labels.extend(std::iter::repeat_n(TrialKind::Stop, settings.stop_trials));
        labels.shuffle(rng);
        Ok(Self {
            target_angles,
            labels,
            staircase: Staircase::from_settings(&settings),
        })
    }

    pub fn staircase(&self) -> &Staircase {
        &self.staircase
    }

    pub fn labels(&self) -> &[TrialKind] {
        &self.labels
    }
}

impl Schedule for StopSignalSchedule {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn condition(&self, trial: usize) -> TrialCondition {
        TrialCondition::StopSignal {
            target_angle: self.target_angles[trial],
            kind: self.labels[trial],
            ssd: self.staircase.current(),
        }
    }

    fn observe(&mut self, condition: &TrialCondition, movement: MovementFlags) {
        if condition.stop_delay().is_some() {
            let before = self.staircase.current();
            let after = self.staircase.update(movement);
            debug!(before, after, full_mov = movement.full_mov, "stop-signal delay updated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn boundaries() -> PhaseBoundaries {
        PhaseBoundaries {
            no_perturbation: 80,
            adaptation_start: 80,
            adaptation_end: 230,
        }
    }

    #[test]
    fn block_edges() {
        let b = boundaries();
        assert_eq!(b.classify(0), ExperimentPhase::NoPerturbation);
        assert_eq!(b.classify(79), ExperimentPhase::NoPerturbation);
        assert_eq!(b.classify(80), ExperimentPhase::Adaptation);
        assert_eq!(b.classify(230), ExperimentPhase::Adaptation);
        assert_eq!(b.classify(231), ExperimentPhase::AfterEffect);
        assert_eq!(b.classify(usize::MAX), ExperimentPhase::AfterEffect);
    }

    #[test]
    fn classification_is_repeatable() {
        let b = boundaries();
        for trial in 0..320 {
            assert_eq!(b.classify(trial), b.classify(trial));
        }
    }

    #[test]
    fn gap_before_adaptation_falls_into_after_effect() {
        let b = PhaseBoundaries {
            no_perturbation: 60,
            adaptation_start: 80,
            adaptation_end: 230,
        };
        assert_eq!(b.classify(70), ExperimentPhase::AfterEffect);
        assert!(b.validate().is_err());
        assert!(boundaries().validate().is_ok());
    }

    #[test]
    fn perturbation_only_during_adaptation() {
        let config = ExperimentConfig::default();
        let schedule = AdaptationSchedule::new(&config, &mut StdRng::seed_from_u64(1));
        assert_eq!(schedule.condition(10).perturbation(), 0.0);
        assert!((schedule.condition(100).perturbation() - 60f64.to_radians()).abs() < 1e-12);
        assert_eq!(schedule.condition(300).perturbation(), 0.0);
    }

    #[test]
    fn target_angles_are_balanced() {
        let config = ExperimentConfig {
            n_trial: 20,
            ..ExperimentConfig::default()
        };
        let angles = shuffled_target_angles(&config, &mut StdRng::seed_from_u64(7));
        assert_eq!(angles.len(), 20);
        for i in 0..5 {
            let direction = (45.0 * i as f64).to_radians();
            assert_eq!(angles.iter().filter(|a| **a == direction).count(), 4);
        }
    }

    #[test]
    fn stop_labels_keep_configured_ratio() {
        let config = ExperimentConfig {
            n_trial: 30,
            stop_trial: Some(10),
            ..ExperimentConfig::default()
        };
        let schedule = StopSignalSchedule::new(&config, &mut StdRng::seed_from_u64(3)).unwrap();
        let stops = schedule.labels().iter().filter(|k| **k == TrialKind::Stop).count();
        assert_eq!(schedule.len(), 30);
        assert_eq!(stops, 10);
    }

    #[test]
    fn only_stop_trials_move_the_staircase() {
        let config = ExperimentConfig::default();
        let mut schedule = StopSignalSchedule::new(&config, &mut StdRng::seed_from_u64(5)).unwrap();
        let reached = MovementFlags {
            start_mov: true,
            full_mov: true,
        };
        let go = TrialCondition::StopSignal {
            target_angle: 0.0,
            kind: TrialKind::Go,
            ssd: 0.2,
        };
        schedule.observe(&go, reached);
        assert_eq!(schedule.staircase().current(), 0.2);

        let stop = TrialCondition::StopSignal {
            target_angle: 0.0,
            kind: TrialKind::Stop,
            ssd: 0.2,
        };
        schedule.observe(&stop, reached);
        assert!((schedule.staircase().current() - 0.15).abs() < 1e-12);
    }
}
