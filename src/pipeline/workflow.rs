use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

use crate::config::RunSettings;

/// Failures of the external workflow engine.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The engine could not be started.
    #[error("could not start `{program}`: {source}")]
    Spawn {
        /// Engine executable.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The engine ran and reported failure.
    #[error("`{program}` exited with {status}; check the workflow logs")]
    Failed {
        /// Engine executable.
        program: String,
        /// Rendered exit status.
        status: String,
    },
}

/// Everything the engine needs for one batch run.
#[derive(Debug, Clone)]
pub struct WorkflowInvocation {
    /// Workflow definition file.
    pub snakefile: PathBuf,
    /// Working directory of the engine.
    pub workdir: PathBuf,
    /// Sample sheet written by the driver.
    pub sample_sheet: PathBuf,
    /// User parameters written by the driver.
    pub user_parameters: PathBuf,
    /// Output directory.
    pub output_dir: PathBuf,
    /// Cores granted to the engine.
    pub cores: u32,
    /// Cluster queue, unused when `local`.
    pub queue: String,
    /// Run on this host instead of the cluster.
    pub local: bool,
    /// Only print the plan.
    pub dry_run: bool,
    /// Remove a stale lock and exit.
    pub unlock: bool,
    /// Re-run incomplete jobs.
    pub rerun_incomplete: bool,
    /// Restarts of failed jobs.
    pub restart_times: u32,
}

impl WorkflowInvocation {
    /// Derive an invocation from the run settings.
    pub fn from_settings(settings: &RunSettings, snakefile: PathBuf, workdir: PathBuf) -> Self {
        Self {
            snakefile,
            workdir,
            sample_sheet: settings.sample_sheet_path(),
            user_parameters: settings.user_parameters_path(),
            output_dir: settings.output_dir.clone(),
            cores: settings.cores,
            queue: settings.queue.clone(),
            local: settings.local,
            dry_run: settings.dry_run,
            unlock: settings.unlock,
            rerun_incomplete: settings.rerun_incomplete,
            restart_times: settings.restart_times,
        }
    }
}

/// Directory receiving the per-task scheduler logs of a cluster workflow run.
pub fn cluster_log_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("log").join("cluster")
}

/// Executes a whole batch. The engine performs its own submit/wait per task.
pub trait WorkflowEngine {
    /// Run the batch to completion.
    fn run(&self, invocation: &WorkflowInvocation) -> Result<(), WorkflowError>;
}

impl<W: WorkflowEngine + ?Sized> WorkflowEngine for &W {
    fn run(&self, invocation: &WorkflowInvocation) -> Result<(), WorkflowError> {
        (**self).run(invocation)
    }
}

/// Snakemake driven through its command line.
#[derive(Debug, Clone)]
pub struct SnakemakeEngine {
    program: String,
    latency_wait: u32,
}

impl Default for SnakemakeEngine {
    fn default() -> Self {
        Self {
            program: "snakemake".to_string(),
            latency_wait: 60,
        }
    }
}

impl SnakemakeEngine {
    /// Engine using `snakemake` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Arguments for `invocation`, without the program itself.
    pub fn args(&self, invocation: &WorkflowInvocation) -> Vec<String> {
        let mut args = vec![
            "--snakefile".to_string(),
            invocation.snakefile.display().to_string(),
            "--directory".to_string(),
            invocation.workdir.display().to_string(),
            "--configfile".to_string(),
            invocation.user_parameters.display().to_string(),
            "--config".to_string(),
            format!("sample_sheet={}", invocation.sample_sheet.display()),
            "--cores".to_string(),
            invocation.cores.to_string(),
            "--use-conda".to_string(),
            "--latency-wait".to_string(),
            self.latency_wait.to_string(),
            "--keep-going".to_string(),
            "--printshellcmds".to_string(),
        ];
        if !invocation.local {
            let logs = cluster_log_dir(&invocation.output_dir);
            args.push("--cluster".to_string());
            args.push(format!(
                "bsub -q {} -n {{threads}} -o {}/{{name}}_{{wildcards}}_{{jobid}}.out -e {}/{{name}}_{{wildcards}}_{{jobid}}.err",
                invocation.queue,
                logs.display(),
                logs.display(),
            ));
            args.push("--jobs".to_string());
            args.push(invocation.cores.to_string());
        }
        if invocation.restart_times > 0 {
            args.push("--restart-times".to_string());
            args.push(invocation.restart_times.to_string());
        }
        if invocation.unlock {
            args.push("--unlock".to_string());
        }
        if invocation.rerun_incomplete {
            args.push("--rerun-incomplete".to_string());
        }
        if invocation.dry_run {
            args.push("--dryrun".to_string());
        }
        args
    }
}

impl WorkflowEngine for SnakemakeEngine {
    fn run(&self, invocation: &WorkflowInvocation) -> Result<(), WorkflowError> {
        let args = self.args(invocation);
        info!(program = %self.program, args = ?args, "starting workflow engine");
        let status = Command::new(&self.program)
            .args(&args)
            .status()
            .map_err(|source| WorkflowError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(WorkflowError::Failed {
                program: self.program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
