//! # Juno BLAST
//!
//! Drives BLAST searches for a directory of sequencing samples on a shared
//! batch scheduler.
//!
//! ## Flow
//!
//! 1. **Discovery**: the input directory is scanned (non-recursively),
//!    every file is classified by name, and recognized files are grouped
//!    into a [`Manifest`] of per-sample records
//! 2. **Configuration**: the manifest and the resolved run parameters are
//!    written as YAML for the workflow engine
//! 3. **Execution**: either the workflow engine runs the batch, or one
//!    job per sample is submitted and awaited through a [`Scheduler`]
//!
//! Discovery always finishes before the first submission, and the first
//! failure aborts the run.
//!
//! ## Usage Example
//!
//! ```no_run
//! use juno_blast::{PipelineDriver, RunSettings, SampleManifestBuilder};
//! use juno_blast::cluster::LsfScheduler;
//! use juno_blast::pipeline::SnakemakeEngine;
//!
//! let settings = RunSettings::new("assemblies", "output").with_db_dir("/mnt/db/juno/blast");
//! let driver = PipelineDriver::new(
//!     settings,
//!     SampleManifestBuilder::new(),
//!     LsfScheduler::new(),
//!     SnakemakeEngine::new(),
//! );
//! let report = driver.run()?;
//! println!("{} samples", report.manifest.len());
//! # Ok::<(), juno_blast::PipelineError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod blast;      // blastn command construction
pub mod cluster;    // scheduler submit/wait
pub mod config;     // run settings and YAML output
pub mod pipeline;   // orchestration
pub mod samples;    // input discovery

pub use blast::{BlastError, BlastParameters};
pub use cluster::{ClusterJobRunner, JobError, JobRequest, Scheduler, SchedulerError};
pub use config::{ConfigError, ExecutionMode, PipelineConfig, RunSettings};
pub use pipeline::{PipelineDriver, RunReport, WorkflowError};
pub use samples::{DiscoveryError, FileRole, InputMode, Manifest, SampleManifestBuilder, SampleRecord};

use std::fmt;

use thiserror::Error;

/// Step of an invocation, used to tell the user where to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scanning the input directory.
    Discovery,
    /// Writing the sample sheet, parameters or output directories.
    Configuration,
    /// Checking the database and query files before submission.
    Preflight,
    /// Handing a job to the scheduler.
    Submission,
    /// Waiting for the scheduler to report a job as ended.
    Wait,
    /// Running the external workflow engine.
    Workflow,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discovery => "discovery",
            Stage::Configuration => "configuration",
            Stage::Preflight => "pre-flight",
            Stage::Submission => "submission",
            Stage::Wait => "wait",
            Stage::Workflow => "workflow",
        };
        f.write_str(name)
    }
}

/// Failure category, independent of where it was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input directory, database or query.
    InvalidInput,
    /// No usable samples, or none usable by the chosen execution.
    EmptyManifest,
    /// Scheduler refused a job.
    Submission,
    /// Wait-for-completion failed.
    Wait,
    /// Local file output failed.
    Io,
    /// Workflow engine failed.
    Workflow,
}

/// Aggregate failure of one invocation.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Sample discovery failed
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Configuration files could not be written
    #[error("configuration failed: {0}")]
    Configuration(#[from] ConfigError),

    /// Database or query checks failed
    #[error("pre-flight check failed: {0}")]
    Preflight(#[from] BlastError),

    /// A cluster job failed to submit or to end
    #[error("{} failed: {0}", .0.stage())]
    Job(#[from] JobError),

    /// The workflow engine failed
    #[error("workflow failed: {0}")]
    Workflow(#[from] WorkflowError),
}

impl JobError {
    /// Stage corresponding to this failure.
    pub fn stage(&self) -> Stage {
        match self {
            JobError::Submission { .. } => Stage::Submission,
            JobError::Wait { .. } => Stage::Wait,
        }
    }
}

impl PipelineError {
    /// Stage that failed.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Discovery(_) => Stage::Discovery,
            PipelineError::Configuration(_) => Stage::Configuration,
            PipelineError::Preflight(_) => Stage::Preflight,
            PipelineError::Job(err) => err.stage(),
            PipelineError::Workflow(_) => Stage::Workflow,
        }
    }

    /// Category of the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Discovery(DiscoveryError::EmptyManifest { .. }) => ErrorKind::EmptyManifest,
            PipelineError::Discovery(DiscoveryError::InvalidInput { .. }) => ErrorKind::InvalidInput,
            PipelineError::Discovery(DiscoveryError::Io { .. }) => ErrorKind::Io,
            PipelineError::Configuration(_) => ErrorKind::Io,
            PipelineError::Preflight(BlastError::NoQueries { .. }) => ErrorKind::EmptyManifest,
            PipelineError::Preflight(_) => ErrorKind::InvalidInput,
            PipelineError::Job(JobError::Submission { .. }) => ErrorKind::Submission,
            PipelineError::Job(JobError::Wait { .. }) => ErrorKind::Wait,
            PipelineError::Workflow(_) => ErrorKind::Workflow,
        }
    }
}
