//! Pipeline orchestration.
//!
//! The [`PipelineDriver`] composes discovery, configuration output and job
//! execution. Execution either goes through the external workflow engine
//! or, in direct mode, through one scheduler job per sample.

mod driver;
mod workflow;

pub use driver::{PipelineDriver, PlannedJob, RunReport, JOB_PREFIX};
pub use workflow::{
    cluster_log_dir, SnakemakeEngine, WorkflowEngine, WorkflowError, WorkflowInvocation,
};
