pub mod config;
pub mod context;
pub mod error;
pub mod persistence;
pub mod phase_runner;
pub mod scheduler;
pub mod session;
pub mod sim;
pub mod staircase;
pub mod trial;

pub use config::{ExperimentConfig, MonitorSettings, StopSignalSettings, TaskVariant};
pub use context::{SessionContext, SubjectInfo};
pub use error::{ExperimentError, Result};
pub use persistence::{SessionFiles, SessionWriter, TrialSink};
pub use phase_runner::{PhaseOutcome, PhasePlan};
pub use scheduler::{
    AdaptationSchedule, ExperimentPhase, PhaseBoundaries, Schedule, StopSignalSchedule,
    TrialCondition,
};
pub use session::SessionSummary;
pub use staircase::Staircase;
