#![allow(dead_code)]

use std::fs::{self, File};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use juno_blast::blast::DATABASE_MARKER;
use juno_blast::cluster::{JobName, JobRequest, Scheduler, SchedulerError, WaitControl};
use juno_blast::pipeline::{WorkflowEngine, WorkflowError, WorkflowInvocation};
use tempfile::TempDir;

/// Temporary directory populated with empty files (parents created as needed).
pub fn fixture_dir(files: &[&str]) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp dir");
    for name in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture parent");
        }
        File::create(&path).expect("create fixture file");
    }
    dir
}

/// Directory that passes the BLAST database check.
pub fn fake_database() -> TempDir {
    fixture_dir(&[DATABASE_MARKER])
}

/// Canonical form of `dir.join(name)`, matching what discovery reports.
pub fn canonical(dir: &Path, name: &str) -> std::path::PathBuf {
    dir.canonicalize().expect("canonicalize").join(name)
}

/// How the recording scheduler answers the wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBehaviour {
    End,
    Fail,
    Hang,
}

/// Scheduler double that records every call.
#[derive(Debug)]
pub struct RecordingScheduler {
    reject_submit: bool,
    wait: WaitBehaviour,
    submitted: Mutex<Vec<JobRequest>>,
    waits: AtomicUsize,
}

impl RecordingScheduler {
    pub fn accepting() -> Self {
        Self::build(false, WaitBehaviour::End)
    }

    pub fn rejecting() -> Self {
        Self::build(true, WaitBehaviour::End)
    }

    pub fn with_wait(wait: WaitBehaviour) -> Self {
        Self::build(false, wait)
    }

    fn build(reject_submit: bool, wait: WaitBehaviour) -> Self {
        Self {
            reject_submit,
            wait,
            submitted: Mutex::new(Vec::new()),
            waits: AtomicUsize::new(0),
        }
    }

    pub fn submissions(&self) -> Vec<JobRequest> {
        self.submitted.lock().expect("lock").clone()
    }

    pub fn wait_calls(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }
}

impl Scheduler for RecordingScheduler {
    fn submit(&self, request: &JobRequest) -> Result<(), SchedulerError> {
        self.submitted.lock().expect("lock").push(request.clone());
        if self.reject_submit {
            return Err(SchedulerError::Rejected {
                program: "bsub".to_string(),
                status: "exit status: 255".to_string(),
                stderr: "Queue does not exist".to_string(),
            });
        }
        Ok(())
    }

    fn wait(&self, _job: &JobName, control: &WaitControl) -> Result<(), SchedulerError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        match self.wait {
            WaitBehaviour::End => Ok(()),
            WaitBehaviour::Fail => Err(SchedulerError::Rejected {
                program: "bwait".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "LSF daemon is not responding".to_string(),
            }),
            WaitBehaviour::Hang => {
                let started = Instant::now();
                loop {
                    if let Some(interrupt) = control.check(started) {
                        return Err(interrupt.into());
                    }
                    std::thread::sleep(control.poll_interval());
                }
            }
        }
    }
}

/// Workflow engine double counting invocations.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub fail: bool,
    pub invocations: Mutex<Vec<WorkflowInvocation>>,
}

impl WorkflowEngine for RecordingEngine {
    fn run(&self, invocation: &WorkflowInvocation) -> Result<(), WorkflowError> {
        self.invocations.lock().expect("lock").push(invocation.clone());
        if self.fail {
            return Err(WorkflowError::Failed {
                program: "snakemake".to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}
