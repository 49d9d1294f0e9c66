use serde::{Deserialize, Serialize};

/// One raw pointing-device reading, in device units, stamped in seconds
/// on the experiment clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceSample {
    pub x: f64,
    pub y: f64,
    pub timestamp: f64,
}

/// Every sample of one trial, concatenated in phase order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoystickTrace {
    samples: Vec<DeviceSample>,
}

impl JoystickTrace {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            samples: Vec::with_capacity(frames),
        }
    }

    pub fn extend(&mut self, phase_samples: Vec<DeviceSample>) {
        self.samples.extend(phase_samples);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The 3xN block (x row, y row, timestamp row), row-major.
    pub fn rows(&self) -> [Vec<f64>; 3] {
        [
            self.samples.iter().map(|s| s.x).collect(),
            self.samples.iter().map(|s| s.y).collect(),
            self.samples.iter().map(|s| s.timestamp).collect(),
        ]
    }
}

/// Where the tracked radius sits relative to the two movement thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementZone {
    /// Inside the starting radius; feedback is shown.
    Center,
    /// Between the starting radius and 90% of the hidden radius; feedback is
    /// masked so the ballistic part of the reach cannot be corrected.
    Transit,
    /// At or beyond 90% of the hidden radius; feedback is shown again.
    Reached,
}

impl MovementZone {
    pub const FULL_MOVEMENT_FRACTION: f64 = 0.9;

    pub fn classify(radius: f64, starting_radius: f64, hidden_radius: f64) -> Self {
        if radius < starting_radius {
            MovementZone::Center
        } else if radius < hidden_radius * Self::FULL_MOVEMENT_FRACTION {
            MovementZone::Transit
        } else {
            MovementZone::Reached
        }
    }

    pub fn shows_feedback(&self) -> bool {
        !matches!(self, MovementZone::Transit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MovementFlags {
    pub start_mov: bool,
    pub full_mov: bool,
}

impl MovementFlags {
    /// Latches the flag for `zone`. Flags never clear within a trial.
    pub fn observe(&mut self, zone: MovementZone) {
        match zone {
            MovementZone::Center => {}
            MovementZone::Transit => self.start_mov = true,
            MovementZone::Reached => self.full_mov = true,
        }
    }
}

/// Go/stop label of a stop-signal trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrialKind {
    Go,
    Stop,
}

impl TrialKind {
    /// Matches the 1 = go / 0 = stop coding of the data files.
    pub fn code(&self) -> u8 {
        match self {
            TrialKind::Go => 1,
            TrialKind::Stop => 0,
        }
    }
}

/// Aggregated result of one trial. Built once, then handed to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub subject_id: String,
    pub trial: usize,
    pub fix_dur: f64,
    pub ready_dur: f64,
    pub go_dur: f64,
    pub post_go_dur: f64,
    pub iti_dur: f64,
    /// Radians.
    pub target_angle: f64,
    /// Feedback rotation in radians; adaptation task only.
    pub cursor_displacement: Option<f64>,
    /// Seconds; stop-signal task only.
    pub ssd: Option<f64>,
    pub kind: Option<TrialKind>,
    pub movement: MovementFlags,
}

impl TrialRecord {
    pub fn sampled_duration(&self) -> f64 {
        self.fix_dur + self.ready_dur + self.go_dur + self.post_go_dur
    }
}
