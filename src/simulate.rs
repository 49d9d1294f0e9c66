//! Headless session: a simulated subject reaches toward whatever the
//! null screen last showed, and the clock advances one refresh per frame.

use crate::cli::Cli;
use anyhow::Result;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::info;
use vmex_experiment::sim::{AbortAfter, HeadlessScreen, SimulatedReacher};
use vmex_experiment::{
    ExperimentConfig, Schedule, SessionContext, SessionSummary, SessionWriter, SubjectInfo,
};
use vmex_timing::{ManualTimer, Timer};

const SIMULATED_FRAME_RATE: f64 = 60.0;

pub fn run(
    cli: &Cli,
    config: ExperimentConfig,
    subject: SubjectInfo,
    schedule: &mut dyn Schedule,
    sink: &mut SessionWriter,
    mut rng: StdRng,
) -> Result<SessionSummary> {
    let frame_rate = cli.frame_rate.unwrap_or(SIMULATED_FRAME_RATE);
    let timer = ManualTimer::new();
    let screen = HeadlessScreen::new(timer.clone(), frame_rate);
    let device = SimulatedReacher::new(screen.visible_target(), config.scaling, rng.random())
        .with_stop_success(cli.stop_success);
    info!(frame_rate, stop_success = cli.stop_success, "running simulated session");

    let mut ctx = SessionContext::new(config, subject, frame_rate, device, screen, timer, rng);
    let summary = ctx.run_session(schedule, &mut AbortAfter::never(), sink)?;
    info!(
        frames = ctx.screen.commits,
        simulated_secs = ctx.timer.now_secs(),
        "simulation finished"
    );
    Ok(summary)
}
