//! Interruption of the blocking wait step.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag used to abandon a wait from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns `true` once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Why a wait stopped before the scheduler reported the job as ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The configured timeout elapsed.
    TimedOut(Duration),
    /// The cancellation token fired.
    Cancelled,
}

/// Bounds applied to a scheduler wait.
///
/// The default has no timeout and a never-cancelled token, which keeps the
/// wait unbounded.
#[derive(Debug, Clone)]
pub struct WaitControl {
    timeout: Option<Duration>,
    poll_interval: Duration,
    token: CancellationToken,
}

impl Default for WaitControl {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(500),
            token: CancellationToken::new(),
        }
    }
}

impl WaitControl {
    /// Unbounded wait.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Give up after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Optional variant of [`with_timeout`](Self::with_timeout).
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// How often the scheduler backend re-checks the interrupt conditions.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Attach a cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Configured poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Token observed by this control.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Checks whether a wait that began at `started` must stop now.
    /// Cancellation takes precedence over the timeout.
    pub fn check(&self, started: Instant) -> Option<Interrupt> {
        if self.token.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.timeout {
            Some(limit) if started.elapsed() >= limit => Some(Interrupt::TimedOut(limit)),
            _ => None,
        }
    }
}
