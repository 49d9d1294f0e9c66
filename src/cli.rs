//! Command-line interface

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use vmex_experiment::TaskVariant;
use vmex_experiment::context::check_frame_rate;

/// Joystick reaching task: visuomotor adaptation or stop-signal.
#[derive(Parser, Debug)]
#[command(name = "visuomotor-task")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subject number, stored zero-padded to four digits
    #[arg(short, long)]
    pub subject: u32,

    /// Session number
    #[arg(long, default_value_t = 1)]
    pub session: u32,

    /// Which task to run
    #[arg(short, long, value_enum, default_value_t = Task::Adaptation)]
    pub task: Task,

    /// JSON settings file (built-in defaults when absent)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Root directory for subject data
    #[arg(short, long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Reuse an existing session directory without asking
    #[arg(long)]
    pub overwrite: bool,

    /// Skip frame-rate measurement and use this rate (Hz)
    #[arg(long, value_parser = parse_frame_rate)]
    pub frame_rate: Option<f64>,

    /// Font used for on-screen prompts
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Seed for target order, stop labels and ITI draws
    #[arg(long)]
    pub seed: Option<u64>,

    /// Blank pause after the start key, in seconds
    #[arg(long, default_value_t = 5.0)]
    pub start_delay: f64,

    /// Run headless with a simulated subject
    #[arg(long)]
    pub simulate: bool,

    /// Probability that the simulated subject withholds after a stop cue
    #[arg(long, default_value_t = 0.5)]
    pub stop_success: f64,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    Adaptation,
    StopSignal,
}

fn parse_frame_rate(value: &str) -> Result<f64, String> {
    let rate: f64 = value.parse().map_err(|e| format!("{e}"))?;
    check_frame_rate(rate).map_err(|e| e.to_string())
}

impl From<Task> for TaskVariant {
    fn from(task: Task) -> Self {
        match task {
            Task::Adaptation => TaskVariant::Adaptation,
            Task::StopSignal => TaskVariant::StopSignal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_a_stop_signal_simulation() {
        let cli = Cli::try_parse_from([
            "visuomotor-task",
            "--subject",
            "7",
            "--task",
            "stop-signal",
            "--simulate",
            "--stop-success",
            "0.8",
            "--seed",
            "3",
        ])
        .unwrap();
        assert_eq!(cli.subject, 7);
        assert_eq!(cli.session, 1);
        assert_eq!(TaskVariant::from(cli.task), TaskVariant::StopSignal);
        assert!(cli.simulate);
        assert_eq!(cli.stop_success, 0.8);
        assert_eq!(cli.start_delay, 5.0);
    }

    #[test]
    fn frame_rate_must_be_positive_and_finite() {
        let parse = |rate: &str| {
            let arg = format!("--frame-rate={rate}");
            Cli::try_parse_from(["visuomotor-task", "-s", "1", arg.as_str()])
        };
        assert_eq!(parse("120").unwrap().frame_rate, Some(120.0));
        for bad in ["0", "-60", "NaN", "inf", "fast"] {
            assert!(parse(bad).is_err(), "{bad} was accepted");
        }
    }

    #[test]
    fn subject_is_required() {
        assert!(Cli::try_parse_from(["visuomotor-task"]).is_err());
    }
}
