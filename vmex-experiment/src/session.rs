use crate::context::{SessionContext, check_frame_rate};
use crate::error::Result;
use crate::persistence::TrialSink;
use crate::scheduler::Schedule;
use rand::Rng;
use tracing::{info, warn};
use vmex_core::{AbortSignal, PointingDevice, Screen};
use vmex_timing::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    /// Trials that ran to completion and were persisted.
    pub completed: usize,
    pub aborted: bool,
}

impl<D, S, T, R> SessionContext<D, S, T, R>
where
    D: PointingDevice,
    S: Screen,
    T: Timer,
    R: Rng,
{
    /// Runs every scheduled trial in order. A frame rate that is not a
    /// positive number of Hz is refused before the first trial. The abort signal is checked once
    /// before each trial; a trial that has started always runs to the end.
    pub fn run_session<C, A, K>(
        &mut self,
        schedule: &mut C,
        abort: &mut A,
        sink: &mut K,
    ) -> Result<SessionSummary>
    where
        C: Schedule + ?Sized,
        A: AbortSignal + ?Sized,
        K: TrialSink + ?Sized,
    {
        check_frame_rate(self.frame_rate)?;
        let n_trial = self.config.n_trial.min(schedule.len());
        info!(
            subject = %self.subject.id,
            session = self.subject.session,
            n_trial,
            frame_rate = self.frame_rate,
            "session started"
        );

        for trial in 0..n_trial {
            if abort.poll_abort() {
                warn!(trial, "session aborted by operator");
                return Ok(SessionSummary {
                    completed: trial,
                    aborted: true,
                });
            }
            let condition = schedule.condition(trial);
            let record = self.run_trial(trial, &condition, sink)?;
            schedule.observe(&condition, record.movement);
        }

        info!(completed = n_trial, "session finished");
        Ok(SessionSummary {
            completed: n_trial,
            aborted: false,
        })
    }
}
