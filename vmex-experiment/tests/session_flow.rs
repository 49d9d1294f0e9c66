//! End-to-end sessions against the headless collaborators.

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs;
use tempfile::TempDir;
use vmex_core::TrialKind;
use vmex_experiment::sim::{AbortAfter, HeadlessScreen, MemorySink, SimulatedReacher};
use vmex_experiment::{
    ExperimentConfig, Schedule, SessionContext, SessionFiles, SessionWriter, StopSignalSchedule,
    SubjectInfo, TaskVariant,
};
use vmex_timing::ManualTimer;

const FRAME_RATE: f64 = 60.0;

fn stop_signal_config() -> ExperimentConfig {
    ExperimentConfig {
        n_trial: 20,
        stop_trial: Some(8),
        ..ExperimentConfig::default()
    }
}

fn headless(
    config: ExperimentConfig,
    stop_success: f64,
) -> SessionContext<SimulatedReacher, HeadlessScreen, ManualTimer, StdRng> {
    let timer = ManualTimer::new();
    let screen = HeadlessScreen::new(timer.clone(), FRAME_RATE);
    let device = SimulatedReacher::new(screen.visible_target(), config.scaling, 11)
        .with_stop_success(stop_success);
    SessionContext::new(
        config,
        SubjectInfo::new(21, 1),
        FRAME_RATE,
        device,
        screen,
        timer,
        StdRng::seed_from_u64(13),
    )
}

#[test]
fn stop_signal_session_writes_every_trial() {
    let config = stop_signal_config();
    config.validate(TaskVariant::StopSignal).unwrap();

    let dir = TempDir::new().unwrap();
    let subject = SubjectInfo::new(21, 1);
    let files = SessionFiles::prepare(dir.path(), &subject, |_| false).unwrap();
    let mut writer = SessionWriter::create(files.clone()).unwrap();
    writer.write_settings(&config).unwrap();

    let mut schedule = StopSignalSchedule::new(&config, &mut StdRng::seed_from_u64(1)).unwrap();
    let mut ctx = headless(config, 0.5);
    let summary = ctx
        .run_session(&mut schedule, &mut AbortAfter::never(), &mut writer)
        .unwrap();

    assert_eq!(summary.completed, 20);
    assert!(!summary.aborted);

    let table = fs::read_to_string(files.table_path()).unwrap();
    assert_eq!(table.lines().count(), 21);
    for trial in 0..20 {
        assert!(files.trace_path(trial).exists(), "missing trace {trial}");
    }
    assert!(files.settings_path().exists());
}

#[test]
fn go_trials_reach_and_staircase_follows_stop_outcomes() {
    let config = stop_signal_config();
    let mut schedule = StopSignalSchedule::new(&config, &mut StdRng::seed_from_u64(2)).unwrap();
    let ssd_init = schedule.staircase().current();
    let step = config.ssd_step.unwrap();
    let mut sink = MemorySink::default();
    let mut ctx = headless(config, 0.5);
    ctx.run_session(&mut schedule, &mut AbortAfter::never(), &mut sink)
        .unwrap();

    let mut withheld = 0i32;
    let mut completed = 0i32;
    for (record, _) in &sink.trials {
        match record.kind {
            Some(TrialKind::Go) => assert!(record.movement.full_mov, "go trial {}", record.trial),
            Some(TrialKind::Stop) if record.movement.full_mov => completed += 1,
            Some(TrialKind::Stop) => withheld += 1,
            None => panic!("stop-signal record without a label"),
        }
    }
    assert_eq!(withheld + completed, 8);
    let expected = ssd_init + step * f64::from(withheld - completed);
    assert!((schedule.staircase().current() - expected).abs() < 1e-9);
}

#[test]
fn each_record_carries_the_delay_in_force() {
    // Few enough stop trials that the delay never outlasts the reach.
    let config = ExperimentConfig {
        stop_trial: Some(3),
        ..stop_signal_config()
    };
    let mut schedule = StopSignalSchedule::new(&config, &mut StdRng::seed_from_u64(3)).unwrap();
    let mut sink = MemorySink::default();
    let mut ctx = headless(config, 1.0);
    ctx.run_session(&mut schedule, &mut AbortAfter::never(), &mut sink)
        .unwrap();

    // A subject who always withholds pushes the delay up one step per stop trial.
    let mut expected = 0.2;
    for (record, _) in &sink.trials {
        assert!((record.ssd.unwrap() - expected).abs() < 1e-9);
        if record.kind == Some(TrialKind::Stop) {
            assert!(!record.movement.full_mov, "stop trial {}", record.trial);
            expected += 0.05;
        }
    }
    assert_eq!(schedule.len(), 20);
}
