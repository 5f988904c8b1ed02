use std::time::Instant;

use thiserror::Error;
use tracing::{error, info};

use super::control::WaitControl;
use super::job::{JobName, JobOutcome, JobRequest, JobState};
use super::scheduler::{Scheduler, SchedulerError};

/// Failure of a submit/wait cycle, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum JobError {
    /// The scheduler did not accept the job. Never retried.
    #[error("submission of job {job} failed: {source}")]
    Submission {
        /// Generated job name.
        job: JobName,
        /// Backend failure.
        #[source]
        source: SchedulerError,
    },

    /// The wait-for-completion call itself failed or was interrupted.
    #[error("waiting for job {job} failed: {source}")]
    Wait {
        /// Generated job name.
        job: JobName,
        /// Backend failure.
        #[source]
        source: SchedulerError,
    },
}

impl JobError {
    /// Terminal state the job was left in.
    pub fn state(&self) -> JobState {
        match self {
            JobError::Submission { .. } => JobState::SubmissionFailed,
            JobError::Wait { .. } => JobState::WaitFailed,
        }
    }

    /// Name of the affected job.
    pub fn job(&self) -> &JobName {
        match self {
            JobError::Submission { job, .. } | JobError::Wait { job, .. } => job,
        }
    }
}

/// Submits one job and blocks until the scheduler reports it as ended.
///
/// The runner never inspects the tool's own exit code and never retries.
/// Referenced input files are the caller's responsibility.
#[derive(Debug)]
pub struct ClusterJobRunner<S> {
    scheduler: S,
    control: WaitControl,
}

impl<S: Scheduler> ClusterJobRunner<S> {
    /// Runner with an unbounded wait.
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            control: WaitControl::unbounded(),
        }
    }

    /// Replace the wait bounds.
    pub fn with_wait_control(mut self, control: WaitControl) -> Self {
        self.control = control;
        self
    }

    /// Backend in use.
    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Submit `request` and wait for the end signal.
    pub fn submit_and_wait(&self, request: JobRequest) -> Result<JobOutcome, JobError> {
        let mut state = JobState::Created;
        let job = request.name().clone();
        info!(job = %job, queue = request.queue(), threads = request.threads(), "submitting job");

        if let Err(source) = self.scheduler.submit(&request) {
            advance(&mut state, JobState::SubmissionFailed);
            error!(job = %job, error = %source, "submission rejected");
            return Err(JobError::Submission { job, source });
        }
        advance(&mut state, JobState::Submitted);
        let submitted_at = Instant::now();

        info!(job = %job, "waiting for job to end");
        if let Err(source) = self.scheduler.wait(&job, &self.control) {
            advance(&mut state, JobState::WaitFailed);
            error!(job = %job, error = %source, "wait failed");
            return Err(JobError::Wait { job, source });
        }
        advance(&mut state, JobState::Ended);

        let elapsed = submitted_at.elapsed();
        info!(job = %job, ?elapsed, "job ended");
        Ok(JobOutcome {
            name: job,
            queue: request.queue().to_string(),
            state,
            elapsed,
        })
    }
}

fn advance(state: &mut JobState, next: JobState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal job transition {state:?} -> {next:?}"
    );
    *state = next;
}
