//! Timeout/retry polling over an injectable time source
//!
//! Verifications observe an eventually-consistent read model, so a check
//! that does not hold yet is retried at a fixed interval until it holds or
//! the budget is spent. The loop compares the time elapsed since the first
//! attempt against the timeout *before* sleeping, so it can overshoot the
//! nominal timeout by up to one retry interval.

use parking_lot::Mutex;
use std::time::{Duration, Instant};
use tracing::trace;

use crate::verification::VerificationResult;
use flowspec_common::Result;

/// Source of time for the poll loop
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;

    fn sleep(&self, duration: Duration);
}

/// Wall-clock time with real sleeps
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Simulated time: `sleep` advances the clock instantly and is recorded
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    elapsed: Duration,
    sleeps: Vec<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualClockState::default()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        self.state.lock().elapsed += duration;
    }

    /// Simulated time since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.elapsed += duration;
        state.sleeps.push(duration);
    }
}

/// Budget of a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Total budget, measured from the first attempt
    pub timeout: Duration,
    /// Pause between two attempts
    pub retry_interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, retry_interval: Duration) -> Self {
        Self {
            timeout,
            retry_interval,
        }
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry_interval: Duration::from_millis(10),
        }
    }
}

/// Terminal state of a poll loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Fulfilled { attempts: u32 },
    TimedOut { attempts: u32, last: VerificationResult },
}

impl PollOutcome {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, PollOutcome::Fulfilled { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Fulfilled { attempts } | PollOutcome::TimedOut { attempts, .. } => {
                *attempts
            }
        }
    }

    /// Failure message of the last attempt, empty when fulfilled
    pub fn failure_message(&self) -> &str {
        match self {
            PollOutcome::Fulfilled { .. } => "",
            PollOutcome::TimedOut { last, .. } => &last.failure_message,
        }
    }
}

/// Evaluate `check` until it is fulfilled or the policy's timeout elapsed.
///
/// Errors returned by `check` end the loop immediately; they are not retried.
pub fn poll_until<F>(clock: &dyn Clock, policy: &PollPolicy, mut check: F) -> Result<PollOutcome>
where
    F: FnMut() -> Result<VerificationResult>,
{
    let start = clock.now();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let result = check()?;

        if result.is_fulfilled {
            return Ok(PollOutcome::Fulfilled { attempts });
        }

        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed < policy.timeout {
            trace!(
                "Check not fulfilled, retrying [attempt: {}, elapsed: {:?}, reason: {}]",
                attempts,
                elapsed,
                result.failure_message
            );
            clock.sleep(policy.retry_interval);
        } else {
            return Ok(PollOutcome::TimedOut {
                attempts,
                last: result,
            });
        }
    }
}
