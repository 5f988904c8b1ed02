use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::blast::{BlastDatabase, BlastError, BlastJob};
use crate::cluster::{
    CancellationToken, ClusterJobRunner, JobName, JobOutcome, JobRequest, Scheduler, WaitControl,
};
use crate::config::{write_yaml_file, ConfigError, ExecutionMode, RunSettings};
use crate::samples::{BuildManifest, Manifest, SampleRecord};
use crate::PipelineError;

use super::workflow::{cluster_log_dir, WorkflowEngine, WorkflowInvocation};

/// Prefix of every job name submitted by the driver.
pub const JOB_PREFIX: &str = "blast";

/// A job that was built but, because of dry-run, not submitted.
#[derive(Debug, Clone)]
pub struct PlannedJob {
    /// Sample the job belongs to.
    pub sample_id: String,
    /// Name it would have been submitted under.
    pub job: JobName,
    /// Command it would have run.
    pub command: String,
}

/// What one invocation did.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Samples discovered.
    pub manifest: Manifest,
    /// Written sample sheet.
    pub sample_sheet: PathBuf,
    /// Written user parameters.
    pub user_parameters: PathBuf,
    /// Jobs skipped because of dry-run.
    pub planned: Vec<PlannedJob>,
    /// Jobs the scheduler reported as ended.
    pub completed: Vec<JobOutcome>,
}

/// Orchestrates one pipeline invocation.
///
/// Discovery always completes before anything is submitted. The first
/// failure ends the run; there is no partial-success continuation.
#[derive(Debug)]
pub struct PipelineDriver<D, S, W> {
    settings: RunSettings,
    discovery: D,
    runner: ClusterJobRunner<S>,
    engine: W,
    snakefile: PathBuf,
    workdir: PathBuf,
}

impl<D, S, W> PipelineDriver<D, S, W>
where
    D: BuildManifest,
    S: Scheduler,
    W: WorkflowEngine,
{
    /// Assemble a driver from its collaborators.
    pub fn new(settings: RunSettings, discovery: D, scheduler: S, engine: W) -> Self {
        let control = WaitControl::unbounded().with_optional_timeout(settings.wait_timeout);
        Self {
            runner: ClusterJobRunner::new(scheduler).with_wait_control(control),
            settings,
            discovery,
            engine,
            snakefile: PathBuf::from("Snakefile"),
            workdir: PathBuf::from("."),
        }
    }

    /// Let another thread abandon in-flight scheduler waits.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        let control = WaitControl::unbounded()
            .with_optional_timeout(self.settings.wait_timeout)
            .with_token(token);
        self.runner = self.runner.with_wait_control(control);
        self
    }

    /// Workflow definition and working directory for batch mode.
    pub fn with_workflow_files(mut self, snakefile: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        self.snakefile = snakefile.into();
        self.workdir = workdir.into();
        self
    }

    /// Settings in effect.
    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Scheduler backend.
    pub fn scheduler(&self) -> &S {
        self.runner.scheduler()
    }

    /// Run discovery, write configuration, then execute.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let settings = &self.settings;
        let manifest = self
            .discovery
            .build_manifest(&settings.input_dir, settings.input_mode)?;

        let sample_sheet = settings.sample_sheet_path();
        let user_parameters = settings.user_parameters_path();
        write_yaml_file(&sample_sheet, &manifest)?;
        write_yaml_file(&user_parameters, &settings.pipeline_config())?;
        info!(
            sample_sheet = %sample_sheet.display(),
            user_parameters = %user_parameters.display(),
            "configuration written"
        );

        let mut report = RunReport {
            manifest,
            sample_sheet,
            user_parameters,
            planned: Vec::new(),
            completed: Vec::new(),
        };

        match settings.execution {
            ExecutionMode::Workflow => {
                if !settings.local && !settings.dry_run {
                    create_dir(&cluster_log_dir(&settings.output_dir))?;
                }
                let invocation = WorkflowInvocation::from_settings(
                    settings,
                    self.snakefile.clone(),
                    self.workdir.clone(),
                );
                self.engine.run(&invocation)?;
            }
            ExecutionMode::Direct => self.run_direct(&mut report)?,
        }

        info!(
            samples = report.manifest.len(),
            planned = report.planned.len(),
            completed = report.completed.len(),
            "pipeline finished"
        );
        Ok(report)
    }

    fn run_direct(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        let settings = &self.settings;
        let database = BlastDatabase::open(&settings.db_dir)?;

        // Build every job first so a bad sample fails before anything is queued.
        let mut jobs = Vec::new();
        for record in &report.manifest {
            match self.blast_job(record, &database)? {
                Some(job) => jobs.push(job),
                None => warn!(sample = record.sample_id(), "no assembly, skipping"),
            }
        }

        if jobs.is_empty() {
            return Err(BlastError::NoQueries {
                samples: report.manifest.len(),
            }
            .into());
        }

        if !settings.dry_run {
            create_dir(&settings.output_dir.join("log"))?;
        }

        for job in jobs {
            let request = JobRequest::new(JOB_PREFIX, job.command_line(), settings.queue.as_str())
                .with_threads(job.threads())
                .with_log_file(
                    settings
                        .output_dir
                        .join("log")
                        .join(format!("{}_blast.log", job.sample_id())),
                );

            if settings.dry_run {
                info!(sample = job.sample_id(), job = %request.name(), "dry-run, not submitting");
                report.planned.push(PlannedJob {
                    sample_id: job.sample_id().to_string(),
                    job: request.name().clone(),
                    command: request.command().to_string(),
                });
                continue;
            }

            let outcome = self.runner.submit_and_wait(request)?;
            report.completed.push(outcome);
        }
        Ok(())
    }

    fn blast_job(
        &self,
        record: &SampleRecord,
        database: &BlastDatabase,
    ) -> Result<Option<BlastJob>, PipelineError> {
        let Some(assembly) = record.assembly() else {
            return Ok(None);
        };
        let job = BlastJob::new(
            record.sample_id(),
            assembly,
            database.clone(),
            self.settings.blast,
            self.settings.threads,
            &self.settings.output_dir,
        )?;
        Ok(Some(job))
    }
}

fn create_dir(path: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
