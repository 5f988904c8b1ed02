use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, warn};

use super::control::{Interrupt, WaitControl};
use super::job::{JobName, JobRequest};

/// Failures reported by a scheduler backend.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler program could not be started.
    #[error("could not run `{program}`: {source}")]
    Spawn {
        /// Program that failed to launch.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Polling a running scheduler program failed.
    #[error("lost track of `{program}`: {source}")]
    Io {
        /// Program being polled.
        program: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The scheduler program exited unsuccessfully.
    #[error("`{program}` exited with {status}{}", format_stderr(.stderr))]
    Rejected {
        /// Program that failed.
        program: String,
        /// Rendered exit status.
        status: String,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// The wait exceeded the caller's timeout.
    #[error("gave up waiting after {0:?}")]
    TimedOut(Duration),

    /// The wait was cancelled by the caller.
    #[error("wait cancelled")]
    Cancelled,
}

impl From<Interrupt> for SchedulerError {
    fn from(interrupt: Interrupt) -> Self {
        match interrupt {
            Interrupt::TimedOut(limit) => SchedulerError::TimedOut(limit),
            Interrupt::Cancelled => SchedulerError::Cancelled,
        }
    }
}

fn format_stderr(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// External batch scheduler.
///
/// `submit` only reports acceptance. `wait` is the single suspension point
/// of a job; implementations must honour `control` so a hung scheduler can
/// be abandoned.
pub trait Scheduler {
    /// Hand `request` to the queue.
    fn submit(&self, request: &JobRequest) -> Result<(), SchedulerError>;

    /// Block until the scheduler reports `job` as ended.
    fn wait(&self, job: &JobName, control: &WaitControl) -> Result<(), SchedulerError>;
}

impl<S: Scheduler + ?Sized> Scheduler for &S {
    fn submit(&self, request: &JobRequest) -> Result<(), SchedulerError> {
        (**self).submit(request)
    }

    fn wait(&self, job: &JobName, control: &WaitControl) -> Result<(), SchedulerError> {
        (**self).wait(job, control)
    }
}

/// IBM Spectrum LSF backend driving `bsub` and `bwait`.
#[derive(Debug, Clone)]
pub struct LsfScheduler {
    submit_program: String,
    wait_program: String,
    wrapper: Vec<String>,
    settle_delay: Duration,
}

impl Default for LsfScheduler {
    fn default() -> Self {
        Self {
            submit_program: "bsub".to_string(),
            wait_program: "bwait".to_string(),
            wrapper: Vec::new(),
            settle_delay: Duration::ZERO,
        }
    }
}

impl LsfScheduler {
    /// Backend using `bsub`/`bwait` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the program names (site wrappers, tests).
    pub fn with_programs(submit: impl Into<String>, wait: impl Into<String>) -> Self {
        Self {
            submit_program: submit.into(),
            wait_program: wait.into(),
            ..Self::default()
        }
    }

    /// Run every scheduler program through a wrapper, e.g. `ssh headnode`
    /// or `singularity exec lsf.sif`. The first element is the executable.
    pub fn with_wrapper<I, T>(mut self, wrapper: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.wrapper = wrapper.into_iter().map(Into::into).collect();
        self
    }

    /// Pause after a successful `bsub` so the job is registered before `bwait` asks for it.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Arguments passed to the submit program, without the program itself.
    pub fn submit_args(&self, request: &JobRequest) -> Vec<String> {
        let mut args = vec![
            "-n".to_string(),
            request.threads().to_string(),
            "-q".to_string(),
            request.queue().to_string(),
            "-J".to_string(),
            request.name().to_string(),
        ];
        if let Some(log) = request.log_file() {
            let log = log.display().to_string();
            args.extend(["-o".to_string(), log.clone(), "-e".to_string(), log]);
        }
        args.push(request.command().to_string());
        args
    }

    /// Arguments passed to the wait program.
    pub fn wait_args(&self, job: &JobName) -> Vec<String> {
        vec!["-w".to_string(), format!("ended({job})")]
    }

    fn command(&self, program: &str, args: Vec<String>) -> Command {
        match self.wrapper.split_first() {
            Some((wrapper, wrapper_args)) => {
                let mut cmd = Command::new(wrapper);
                cmd.args(wrapper_args).arg(program).args(args);
                cmd
            }
            None => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        }
    }
}

impl Scheduler for LsfScheduler {
    fn submit(&self, request: &JobRequest) -> Result<(), SchedulerError> {
        let output = self
            .command(&self.submit_program, self.submit_args(request))
            .stdin(Stdio::null())
            .output()
            .map_err(|source| SchedulerError::Spawn {
                program: self.submit_program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(SchedulerError::Rejected {
                program: self.submit_program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(
            job = %request.name(),
            response = %String::from_utf8_lossy(&output.stdout).trim(),
            "bsub accepted job"
        );

        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }
        Ok(())
    }

    fn wait(&self, job: &JobName, control: &WaitControl) -> Result<(), SchedulerError> {
        let mut child = self
            .command(&self.wait_program, self.wait_args(job))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SchedulerError::Spawn {
                program: self.wait_program.clone(),
                source,
            })?;

        // A full stderr pipe blocks the child; drain it while polling.
        let stderr = child.stderr.take().map(|mut pipe| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        let started = Instant::now();
        loop {
            let polled = child.try_wait().map_err(|source| SchedulerError::Io {
                program: self.wait_program.clone(),
                source,
            })?;

            if let Some(status) = polled {
                if status.success() {
                    return Ok(());
                }
                let stderr = stderr
                    .and_then(|reader| reader.join().ok())
                    .map(|buf| tail(&String::from_utf8_lossy(&buf)))
                    .unwrap_or_default();
                return Err(SchedulerError::Rejected {
                    program: self.wait_program.clone(),
                    status: status.to_string(),
                    stderr,
                });
            }

            if let Some(interrupt) = control.check(started) {
                warn!(job = %job, ?interrupt, "abandoning scheduler wait");
                let _ = child.kill();
                let _ = child.wait();
                return Err(interrupt.into());
            }

            thread::sleep(control.poll_interval());
        }
    }
}

/// Last few lines of captured output, trimmed.
fn tail(output: &str) -> String {
    const KEEP: usize = 20;
    let lines: Vec<&str> = output.trim().lines().collect();
    lines[lines.len().saturating_sub(KEEP)..].join("\n")
}
