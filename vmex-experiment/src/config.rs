use crate::error::{ExperimentError, Result};
use crate::scheduler::PhaseBoundaries;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vmex_core::{MovementZone, Point};

/// Which task the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskVariant {
    /// Visuomotor rotation: baseline, adaptation and after-effect blocks.
    Adaptation,
    /// Go/stop reaching with an adaptive stop-signal delay.
    StopSignal,
}

/// `[screen width cm, viewing distance cm, [width px, height px]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings(pub f64, pub f64, pub (u32, u32));

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorSettings(34.0, 60.0, (1680, 1050))
    }
}

impl MonitorSettings {
    pub fn width_cm(&self) -> f64 {
        self.0
    }

    pub fn distance_cm(&self) -> f64 {
        self.1
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.2
    }

    /// Small-angle approximation: one degree spans `distance * pi / 180` cm.
    pub fn pixels_per_degree(&self) -> f64 {
        let cm_per_degree = self.distance_cm() * std::f64::consts::PI / 180.0;
        cm_per_degree * self.resolution().0 as f64 / self.width_cm()
    }
}

/// Settings for one session, read from the JSON settings file.
///
/// Key names follow the settings files used by the lab, so `ITI` keeps its
/// upper-case spelling. Angles are given in degrees; durations in seconds;
/// radii in visual degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub n_trial: usize,
    /// Angular spacing between target directions.
    pub target_angle: f64,
    #[serde(default = "default_n_directions")]
    pub n_directions: usize,
    /// Device units to visual degrees.
    pub scaling: f64,
    pub starting_radius: f64,
    pub hidden_radius: f64,
    pub fixation_time: f64,
    pub ready_time: f64,
    pub go_time: f64,
    pub post_go_time: f64,
    #[serde(rename = "ITI")]
    pub iti: [f64; 2],
    #[serde(default)]
    pub target_origin: [f64; 2],
    #[serde(default = "default_cue_radius")]
    pub cue_radius: f64,
    #[serde(default)]
    pub monitor_settings: MonitorSettings,

    #[serde(default = "default_no_perturbation_trials")]
    pub no_perturbation_trials: usize,
    #[serde(default = "default_adaptation_start")]
    pub adaptation_start: usize,
    #[serde(default = "default_adaptation_end")]
    pub adaptation_end: usize,
    #[serde(default = "default_perturbation_angle")]
    pub perturbation_angle: f64,

    #[serde(default)]
    pub stop_trial: Option<usize>,
    #[serde(default)]
    pub ssd_init: Option<f64>,
    #[serde(default)]
    pub ssd_step: Option<f64>,
    #[serde(default)]
    pub ssd_min: Option<f64>,
    #[serde(default)]
    pub ssd_max: Option<f64>,
}

fn default_n_directions() -> usize {
    5
}
fn default_cue_radius() -> f64 {
    0.6
}
fn default_no_perturbation_trials() -> usize {
    80
}
fn default_adaptation_start() -> usize {
    80
}
fn default_adaptation_end() -> usize {
    230
}
fn default_perturbation_angle() -> f64 {
    60.0
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_trial: 310,
            target_angle: 45.0,
            n_directions: default_n_directions(),
            scaling: 12.0,
            starting_radius: 1.0,
            hidden_radius: 10.0,
            fixation_time: 0.75,
            ready_time: 1.5,
            go_time: 0.75,
            post_go_time: 1.25,
            iti: [0.5, 0.75],
            target_origin: [0.0, 0.0],
            cue_radius: default_cue_radius(),
            monitor_settings: MonitorSettings::default(),
            no_perturbation_trials: default_no_perturbation_trials(),
            adaptation_start: default_adaptation_start(),
            adaptation_end: default_adaptation_end(),
            perturbation_angle: default_perturbation_angle(),
            stop_trial: Some(100),
            ssd_init: Some(0.2),
            ssd_step: Some(0.05),
            ssd_min: None,
            ssd_max: None,
        }
    }
}

/// The stop-signal keys, present and checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopSignalSettings {
    pub stop_trials: usize,
    pub ssd_init: f64,
    pub ssd_step: f64,
    pub ssd_min: Option<f64>,
    pub ssd_max: Option<f64>,
}

impl ExperimentConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExperimentError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ExperimentError::config(e.to_string()))
    }

    /// Checks every setting the chosen task depends on. Must pass before the
    /// first trial starts.
    pub fn validate(&self, task: TaskVariant) -> Result<()> {
        if self.n_trial == 0 {
            return Err(ExperimentError::config("n_trial must be > 0"));
        }
        if self.n_directions == 0 || self.n_trial % self.n_directions != 0 {
            return Err(ExperimentError::config(format!(
                "n_trial ({}) must be a multiple of n_directions ({})",
                self.n_trial, self.n_directions
            )));
        }
        if !(self.scaling > 0.0) {
            return Err(ExperimentError::config(format!(
                "scaling must be > 0, got {}",
                self.scaling
            )));
        }
        if !(self.starting_radius > 0.0)
            || self.starting_radius >= self.hidden_radius * MovementZone::FULL_MOVEMENT_FRACTION
        {
            return Err(ExperimentError::config(format!(
                "starting_radius ({}) must be in (0, 0.9 * hidden_radius ({}))",
                self.starting_radius, self.hidden_radius
            )));
        }
        for (name, value) in [
            ("fixation_time", self.fixation_time),
            ("ready_time", self.ready_time),
            ("go_time", self.go_time),
            ("post_go_time", self.post_go_time),
        ] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(ExperimentError::config(format!(
                    "{name} must be a positive number of seconds, got {value}"
                )));
            }
        }
        let [iti_min, iti_max] = self.iti;
        if !(iti_min >= 0.0) || !(iti_min <= iti_max) || !iti_max.is_finite() {
            return Err(ExperimentError::config(format!(
                "ITI must be [min, max] with 0 <= min <= max, got [{iti_min}, {iti_max}]"
            )));
        }
        if !(self.cue_radius > 0.0) {
            return Err(ExperimentError::config("cue_radius must be > 0"));
        }

        match task {
            TaskVariant::Adaptation => self.boundaries().validate(),
            TaskVariant::StopSignal => self.stop_signal().map(|_| ()),
        }
    }

    pub fn boundaries(&self) -> PhaseBoundaries {
        PhaseBoundaries {
            no_perturbation: self.no_perturbation_trials,
            adaptation_start: self.adaptation_start,
            adaptation_end: self.adaptation_end,
        }
    }

    /// Radians.
    pub fn perturbation(&self) -> f64 {
        self.perturbation_angle.to_radians()
    }

    pub fn origin(&self) -> Point {
        Point::from(self.target_origin)
    }

    pub fn stop_signal(&self) -> Result<StopSignalSettings> {
        let missing =
            |key: &str| ExperimentError::config(format!("stop-signal task needs `{key}`"));
        let settings = StopSignalSettings {
            stop_trials: self.stop_trial.ok_or_else(|| missing("stop_trial"))?,
            ssd_init: self.ssd_init.ok_or_else(|| missing("ssd_init"))?,
            ssd_step: self.ssd_step.ok_or_else(|| missing("ssd_step"))?,
            ssd_min: self.ssd_min,
            ssd_max: self.ssd_max,
        };
        if settings.stop_trials > self.n_trial {
            return Err(ExperimentError::config(format!(
                "stop_trial ({}) exceeds n_trial ({})",
                settings.stop_trials, self.n_trial
            )));
        }
        if !(settings.ssd_step > 0.0) {
            return Err(ExperimentError::config("ssd_step must be > 0"));
        }
        if let (Some(lo), Some(hi)) = (settings.ssd_min, settings.ssd_max) {
            if lo > hi {
                return Err(ExperimentError::config(format!(
                    "ssd_min ({lo}) is above ssd_max ({hi})"
                )));
            }
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHIPPED: &str = r#"{
        "n_trial": 310,
        "target_angle": 45,
        "scaling": 12,
        "starting_radius": 1,
        "hidden_radius": 10,
        "fixation_time": 0.75,
        "ready_time": 1.5,
        "go_time": 0.75,
        "post_go_time": 1.25,
        "ITI": [0.5, 0.75],
        "target_origin": [0, 0],
        "monitor_settings": [54, 60, [1920, 1080]]
    }"#;

    #[test]
    fn parses_lab_settings_file() {
        let config = ExperimentConfig::from_json(SHIPPED).unwrap();
        assert_eq!(config.n_trial, 310);
        assert_eq!(config.iti, [0.5, 0.75]);
        assert_eq!(config.monitor_settings.resolution(), (1920, 1080));
        assert_eq!(config.n_directions, 5);
        assert_eq!(config.adaptation_start, 80);
        assert!(config.stop_trial.is_none());
        config.validate(TaskVariant::Adaptation).unwrap();
    }

    #[test]
    fn stop_signal_requires_its_keys() {
        let config = ExperimentConfig::from_json(SHIPPED).unwrap();
        let err = config.validate(TaskVariant::StopSignal).unwrap_err();
        assert!(err.to_string().contains("stop_trial"));
    }

    #[test]
    fn missing_required_key_is_a_config_error() {
        let err = ExperimentConfig::from_json(r#"{"n_trial": 10}"#).unwrap_err();
        assert!(matches!(err, ExperimentError::Config(_)));
    }

    #[test]
    fn rejects_gap_between_baseline_and_adaptation() {
        let config = ExperimentConfig {
            no_perturbation_trials: 60,
            ..ExperimentConfig::default()
        };
        assert!(config.validate(TaskVariant::Adaptation).is_err());
        // The stop-signal task has no perturbation blocks to check.
        config.validate(TaskVariant::StopSignal).unwrap();
    }

    #[test]
    fn rejects_uneven_direction_blocks() {
        let config = ExperimentConfig {
            n_trial: 12,
            ..ExperimentConfig::default()
        };
        assert!(config.validate(TaskVariant::StopSignal).is_err());
    }

    #[test]
    fn rejects_inverted_iti_and_ssd_bounds() {
        let config = ExperimentConfig {
            iti: [0.8, 0.5],
            ..ExperimentConfig::default()
        };
        assert!(config.validate(TaskVariant::Adaptation).is_err());

        let config = ExperimentConfig {
            ssd_min: Some(0.5),
            ssd_max: Some(0.1),
            ..ExperimentConfig::default()
        };
        assert!(config.validate(TaskVariant::StopSignal).is_err());
    }

    #[test]
    fn default_settings_are_valid_for_both_tasks() {
        let config = ExperimentConfig::default();
        config.validate(TaskVariant::Adaptation).unwrap();
        config.validate(TaskVariant::StopSignal).unwrap();
    }

    #[test]
    fn pixels_per_degree_matches_small_angle_rule() {
        let ppd = MonitorSettings(34.0, 60.0, (1680, 1050)).pixels_per_degree();
        assert!((ppd - 51.75).abs() < 0.05, "{ppd}");
    }
}
