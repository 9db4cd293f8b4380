//! # Remote Job Polling
//!
//! Remote runs and indexing jobs are awaited through a small state machine:
//!
//! ```text
//! Submitted -> Polling { attempt } -> Completed
//!                                  -> Failed(status)
//!                                  -> TimedOut
//!                                  -> Cancelled
//! ```
//!
//! Every wait is bounded by a [`PollPolicy`] (attempt count, exponential backoff,
//! overall timeout) and can be interrupted through a [`CancelSignal`].

use crate::errors::AssistantError;
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::debug;

/// Bounds and backoff for waiting on a remote job.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollPolicy {
    /// Maximum number of status checks before giving up.
    pub max_attempts: u32,
    /// Delay before the second status check, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound for a single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor applied to the delay after every check.
    pub multiplier: f64,
    /// Overall limit for the wait, in seconds. `None` disables the limit.
    pub timeout_secs: Option<u64>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            multiplier: 2.0,
            timeout_secs: Some(600),
        }
    }
}

impl PollPolicy {
    /// Delay to wait after the given (0-indexed) status check.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay_ms as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// What a single status check observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Pending,
    Done,
    Failed { status: String, detail: Option<String> },
}

/// The states a wait moves through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunPhase {
    Submitted,
    Polling { attempt: u32 },
    Completed,
    Failed { status: String, detail: Option<String> },
    TimedOut,
    Cancelled,
}

impl RunPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunPhase::Submitted | RunPhase::Polling { .. })
    }
}

/// Sender side of a cancellation signal.
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all be gone already; nothing to do then.
        let _ = self.0.send(true);
    }
}

/// Receiver side of a cancellation signal, cloned into every wait.
#[derive(Debug, Clone)]
pub struct CancelSignal(Option<watch::Receiver<bool>>);

impl CancelSignal {
    /// Creates a connected handle/signal pair.
    pub fn pair() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(Some(rx)))
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        CancelSignal(None)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Resolves once cancellation is requested; pending forever otherwise.
    async fn cancelled(&self) {
        match &self.0 {
            Some(rx) => {
                let mut rx = rx.clone();
                if rx.wait_for(|cancelled| *cancelled).await.is_err() {
                    // Handle dropped without cancelling.
                    std::future::pending::<()>().await;
                }
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

/// Drives the polling state machine for one remote job.
#[derive(Debug, Clone, Default)]
pub struct Poller {
    pub policy: PollPolicy,
    pub cancel: CancelSignal,
}

impl Poller {
    pub fn new(policy: PollPolicy, cancel: CancelSignal) -> Self {
        Self { policy, cancel }
    }

    /// Calls `probe` until it reports completion, failure, or the policy runs out.
    ///
    /// `job_id` only labels logs and errors.
    pub async fn wait<F, Fut>(&self, job_id: &str, mut probe: F) -> Result<(), AssistantError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Probe, AssistantError>>,
    {
        let started = Instant::now();
        let deadline = self.policy.timeout().map(|t| started + t);
        let mut phase = RunPhase::Submitted;
        let mut attempt = 0;

        while !phase.is_terminal() {
            if self.cancel.is_cancelled() {
                phase = RunPhase::Cancelled;
                break;
            }
            if attempt >= self.policy.max_attempts {
                return Err(AssistantError::AttemptsExhausted {
                    id: job_id.to_string(),
                    attempts: attempt,
                });
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                phase = RunPhase::TimedOut;
                break;
            }

            phase = match probe().await? {
                Probe::Done => RunPhase::Completed,
                Probe::Failed { status, detail } => RunPhase::Failed { status, detail },
                Probe::Pending => {
                    debug!(job_id, attempt, "Remote job still pending.");
                    let mut delay = self.policy.delay_for_attempt(attempt);
                    if let Some(d) = deadline {
                        delay = delay.min(d.saturating_duration_since(Instant::now()));
                    }
                    attempt += 1;
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => RunPhase::Polling { attempt },
                        _ = self.cancel.cancelled() => RunPhase::Cancelled,
                    }
                }
            };
        }

        match phase {
            RunPhase::Completed => Ok(()),
            RunPhase::Failed { status, detail } => Err(AssistantError::RunFailed {
                id: job_id.to_string(),
                status,
                detail,
            }),
            RunPhase::Cancelled => Err(AssistantError::Cancelled {
                id: job_id.to_string(),
            }),
            _ => Err(AssistantError::TimedOut {
                id: job_id.to_string(),
                elapsed_ms: started.elapsed().as_millis(),
            }),
        }
    }
}
