use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use uuid::Uuid;

/// Hex characters appended to the prefix. 48 random bits keep same-run
/// collisions out of reach even for tens of thousands of submissions.
pub const JOB_SUFFIX_LEN: usize = 12;

/// Scheduler-visible job name: a fixed prefix plus a random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobName(String);

impl JobName {
    /// Generate a fresh name such as `blast3f9c0a1b7e42`.
    pub fn generate(prefix: &str) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        // The trailing node field of a v4 UUID carries no version/variant bits.
        let suffix = &uuid[uuid.len() - JOB_SUFFIX_LEN..];
        Self(format!("{prefix}{suffix}"))
    }

    /// Name as passed to the scheduler.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work for the scheduler. Lives only for the duration of a
/// submit/wait cycle.
#[derive(Debug, Clone)]
pub struct JobRequest {
    name: JobName,
    command: String,
    queue: String,
    threads: u32,
    log_file: Option<PathBuf>,
}

impl JobRequest {
    /// Build a request with a freshly generated name.
    pub fn new(prefix: &str, command: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            name: JobName::generate(prefix),
            command: command.into(),
            queue: queue.into(),
            threads: 1,
            log_file: None,
        }
    }

    /// Slots reserved on the execution host.
    pub fn with_threads(mut self, threads: u32) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// File receiving the job's stdout and stderr.
    pub fn with_log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Unique job name.
    pub fn name(&self) -> &JobName {
        &self.name
    }

    /// Shell command executed by the job.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Target queue.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Requested slots.
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Log destination, if any.
    pub fn log_file(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }
}

/// Lifecycle of a request as observed by the runner.
///
/// `Created → Submitted → Ended`, or one of the two failure terminals.
/// `Ended` says nothing about whether the tool itself succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Built, not yet handed to the scheduler.
    Created,
    /// Accepted by the scheduler.
    Submitted,
    /// Scheduler reported the job as ended.
    Ended,
    /// Scheduler refused the submission.
    SubmissionFailed,
    /// The wait call failed or was interrupted.
    WaitFailed,
}

impl JobState {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Ended | JobState::SubmissionFailed | JobState::WaitFailed
        )
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Created, JobState::Submitted)
                | (JobState::Created, JobState::SubmissionFailed)
                | (JobState::Submitted, JobState::Ended)
                | (JobState::Submitted, JobState::WaitFailed)
        )
    }
}

/// Result of a completed submit/wait cycle.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    /// Name the job ran under.
    pub name: JobName,
    /// Queue it ran on.
    pub queue: String,
    /// Always [`JobState::Ended`] for a returned outcome.
    pub state: JobState,
    /// Wall time spent between submission and the end signal.
    pub elapsed: Duration,
}
