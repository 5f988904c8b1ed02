//! Run configuration.
//!
//! [`RunSettings`] is the immutable bundle of resolved options handed to the
//! driver. [`PipelineConfig`] is the subset written to disk for the
//! workflow engine.

mod io;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::blast::BlastParameters;
use crate::samples::InputMode;

pub use io::{render_yaml, write_yaml, write_yaml_file, ConfigError};

/// File name of the sample sheet inside the config directory.
pub const SAMPLE_SHEET_FILE: &str = "sample_sheet.yaml";
/// File name of the user parameters inside the config directory.
pub const USER_PARAMETERS_FILE: &str = "user_parameters.yaml";

/// How samples are turned into scheduler jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Hand the whole batch to the workflow engine.
    #[default]
    Workflow,
    /// Submit one BLAST job per sample and wait for each in turn.
    Direct,
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workflow" | "snakemake" => Ok(ExecutionMode::Workflow),
            "direct" => Ok(ExecutionMode::Direct),
            other => Err(format!(
                "unknown execution mode '{other}' (expected workflow or direct)"
            )),
        }
    }
}

/// Resolved options for one invocation. Built once, never mutated after
/// being handed to the driver.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Directory scanned for samples.
    pub input_dir: PathBuf,
    /// Directory receiving results.
    pub output_dir: PathBuf,
    /// Local BLAST database directory.
    pub db_dir: PathBuf,
    /// Thresholds forwarded to BLAST.
    pub blast: BlastParameters,
    /// Which files make up a sample.
    pub input_mode: InputMode,
    /// Batch or per-sample execution.
    pub execution: ExecutionMode,
    /// Cores granted to the workflow engine.
    pub cores: u32,
    /// Threads per direct BLAST job.
    pub threads: u32,
    /// Scheduler queue.
    pub queue: String,
    /// Run the workflow engine without cluster submission.
    pub local: bool,
    /// Plan only, submit nothing.
    pub dry_run: bool,
    /// Remove a stale workflow lock.
    pub unlock: bool,
    /// Re-run jobs left incomplete by an earlier run.
    pub rerun_incomplete: bool,
    /// Times the workflow engine restarts a failed job.
    pub restart_times: u32,
    /// Where the sample sheet and user parameters are written.
    pub config_dir: PathBuf,
    /// Upper bound for each scheduler wait. `None` waits forever.
    pub wait_timeout: Option<Duration>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            db_dir: PathBuf::from("/mnt/db/juno/blast"),
            blast: BlastParameters::default(),
            input_mode: InputMode::AssemblyOnly,
            execution: ExecutionMode::Workflow,
            cores: 300,
            threads: 1,
            queue: "bio".to_string(),
            local: false,
            dry_run: false,
            unlock: false,
            rerun_incomplete: false,
            restart_times: 0,
            config_dir: PathBuf::from("config"),
            wait_timeout: None,
        }
    }
}

impl RunSettings {
    /// Defaults with the given input and output directories.
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Set the database directory.
    pub fn with_db_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.db_dir = dir.into();
        self
    }

    /// Set the BLAST thresholds.
    pub fn with_blast_parameters(mut self, params: BlastParameters) -> Self {
        self.blast = params;
        self
    }

    /// Set the input mode.
    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    /// Set the execution mode.
    pub fn with_execution(mut self, execution: ExecutionMode) -> Self {
        self.execution = execution;
        self
    }

    /// Set the queue name.
    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    /// Set workflow cores and per-job threads.
    pub fn with_resources(mut self, cores: u32, threads: u32) -> Self {
        self.cores = cores.max(1);
        self.threads = threads.max(1);
        self
    }

    /// Enable or disable dry-run.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable local execution.
    pub fn with_local(mut self, local: bool) -> Self {
        self.local = local;
        self
    }

    /// Workflow engine housekeeping flags.
    pub fn with_workflow_flags(mut self, unlock: bool, rerun_incomplete: bool) -> Self {
        self.unlock = unlock;
        self.rerun_incomplete = rerun_incomplete;
        self
    }

    /// Restarts the workflow engine grants a failed job.
    pub fn with_restart_times(mut self, restart_times: u32) -> Self {
        self.restart_times = restart_times;
        self
    }

    /// Set the config directory.
    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    /// Bound every scheduler wait.
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Path of the sample sheet.
    pub fn sample_sheet_path(&self) -> PathBuf {
        self.config_dir.join(SAMPLE_SHEET_FILE)
    }

    /// Path of the user parameters file.
    pub fn user_parameters_path(&self) -> PathBuf {
        self.config_dir.join(USER_PARAMETERS_FILE)
    }

    /// Parameters written for the workflow engine.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new(&self.input_dir, &self.output_dir, &self.db_dir, self.blast)
    }
}

/// Flat run parameters consumed by the workflow engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Input directory.
    pub input_dir: String,
    /// Output directory.
    pub out: String,
    /// BLAST database directory.
    pub blast_db: String,
    /// BLAST thresholds.
    pub blast_parameters: BlastParameters,
}

impl PipelineConfig {
    /// Collect the parameters.
    pub fn new(input_dir: &Path, output_dir: &Path, db_dir: &Path, blast: BlastParameters) -> Self {
        Self {
            input_dir: input_dir.display().to_string(),
            out: output_dir.display().to_string(),
            blast_db: db_dir.display().to_string(),
            blast_parameters: blast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_cli() {
        let settings = RunSettings::default();
        assert_eq!(settings.queue, "bio");
        assert_eq!(settings.cores, 300);
        assert_eq!(settings.blast.max_hsps, 10);
        assert_eq!(settings.wait_timeout, None);
        assert_eq!(settings.sample_sheet_path(), Path::new("config/sample_sheet.yaml"));
    }

    #[test]
    fn pipeline_config_uses_original_keys() {
        let settings = RunSettings::new("in", "out").with_db_dir("db");
        let yaml = render_yaml(&settings.pipeline_config()).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(value["input_dir"].as_str(), Some("in"));
        assert_eq!(value["out"].as_str(), Some("out"));
        assert_eq!(value["blast_db"].as_str(), Some("db"));
        assert_eq!(value["blast_parameters"]["max_hsps"].as_u64(), Some(10));
        assert_eq!(value["blast_parameters"]["evalue"].as_f64(), Some(1e-10));
    }

    #[test]
    fn resources_are_clamped() {
        let settings = RunSettings::default().with_resources(0, 0);
        assert_eq!((settings.cores, settings.threads), (1, 1));
    }
}
