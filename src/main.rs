mod cli;
mod frontend;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vmex_experiment::{
    AdaptationSchedule, ExperimentConfig, Schedule, SessionFiles, SessionWriter,
    StopSignalSchedule, SubjectInfo, TaskVariant,
};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();
}

/// Interactive y/N on the terminal; anything but yes keeps the old data.
fn confirm_overwrite(dir: &Path) -> bool {
    eprint!(
        "Session directory {} already exists. Continue and overwrite? [y/N] ",
        dir.display()
    );
    let _ = io::stderr().flush();
    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}

fn build_schedule<R: Rng>(
    task: TaskVariant,
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<Box<dyn Schedule>> {
    Ok(match task {
        TaskVariant::Adaptation => Box::new(AdaptationSchedule::new(config, rng)),
        TaskVariant::StopSignal => Box::new(StopSignalSchedule::new(config, rng)?),
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let task = TaskVariant::from(cli.task);
    let config = match &cli.config {
        Some(path) => ExperimentConfig::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => ExperimentConfig::default(),
    };
    config.validate(task)?;

    let subject = SubjectInfo::new(cli.subject, cli.session);
    let files = SessionFiles::prepare(&cli.data_dir, &subject, |dir| {
        cli.overwrite || confirm_overwrite(dir)
    })?;
    let mut writer = SessionWriter::create(files)?;
    writer.write_settings(&config)?;

    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut schedule = build_schedule(task, &config, &mut rng)?;
    info!(
        ?task,
        subject = %subject.id,
        session = subject.session,
        trials = schedule.len(),
        data_dir = %writer.files().data_dir.display(),
        "session prepared"
    );

    let summary = if cli.simulate {
        simulate::run(&cli, config, subject, schedule.as_mut(), &mut writer, rng)?
    } else {
        frontend::run(&cli, config, subject, schedule.as_mut(), &mut writer, rng)?
    };

    if summary.aborted {
        warn!(completed = summary.completed, "session ended early");
    } else {
        info!(completed = summary.completed, "all trials saved");
    }
    Ok(())
}
