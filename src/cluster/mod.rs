//! Cluster job orchestration.
//!
//! A [`JobRequest`] is handed to a [`Scheduler`] by the
//! [`ClusterJobRunner`], which then blocks on the scheduler's
//! wait-for-completion call. That wait is the only suspension point and
//! can be bounded through [`WaitControl`].

mod control;
mod job;
mod runner;
mod scheduler;

pub use control::{CancellationToken, Interrupt, WaitControl};
pub use job::{JobName, JobOutcome, JobRequest, JobState, JOB_SUFFIX_LEN};
pub use runner::{ClusterJobRunner, JobError};
pub use scheduler::{LsfScheduler, Scheduler, SchedulerError};
