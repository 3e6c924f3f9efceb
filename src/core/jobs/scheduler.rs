//! Enrichment Scheduler
//!
//! In-process background runner. At most one job per profile id is in flight;
//! retryable failures are retried with capped exponential backoff.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::outcome::{FailureKind, JobOutcome, JobState};
use super::worker::EnrichmentJob;
use crate::config::JobsConfig;

// ============================================================================
// Retry Policy
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&JobsConfig::default())
    }
}

impl From<&JobsConfig> for RetryPolicy {
    fn from(config: &JobsConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: config.initial_backoff(),
            max_backoff: config.max_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` (1-based). Up to 25% jitter is
    /// added; a longer provider `retry_after` wins.
    pub fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let base = self
            .initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff);

        let jitter_cap = (base.as_millis() / 4) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };
        let backoff = (base + Duration::from_millis(jitter)).min(self.max_backoff.max(base));

        match retry_after {
            Some(wait) if wait > backoff => wait,
            _ => backoff,
        }
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Handle to a scheduled job
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub profile_id: String,
    /// True when this enqueue attached to a job that was already running
    pub deduplicated: bool,
    outcome: watch::Receiver<Option<JobOutcome>>,
}

impl JobTicket {
    /// Wait for the job's terminal outcome
    pub async fn wait(mut self) -> JobOutcome {
        let outcome = match self.outcome.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| JobOutcome::failure(&self.profile_id, 0, FailureKind::Cancelled))
    }
}

// ============================================================================
// Scheduler
// ============================================================================

struct InFlight {
    cancel: CancellationToken,
    outcome: watch::Receiver<Option<JobOutcome>>,
}

struct Inner {
    job: EnrichmentJob,
    policy: RetryPolicy,
    in_flight: Mutex<HashMap<String, InFlight>>,
    last_outcomes: RwLock<HashMap<String, JobOutcome>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

#[derive(Clone)]
pub struct EnrichmentScheduler {
    inner: Arc<Inner>,
}

impl EnrichmentScheduler {
    pub fn new(job: EnrichmentJob, policy: RetryPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                job,
                policy,
                in_flight: Mutex::new(HashMap::new()),
                last_outcomes: RwLock::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Schedule enrichment for a profile. If one is already running for the
    /// same id, the returned ticket follows that job instead.
    pub fn enqueue(&self, profile_id: &str) -> JobTicket {
        let mut in_flight = self.inner.lock_in_flight();

        if let Some(existing) = in_flight.get(profile_id) {
            debug!(profile_id, "Enrichment already in flight, attaching");
            return JobTicket {
                profile_id: profile_id.to_string(),
                deduplicated: true,
                outcome: existing.outcome.clone(),
            };
        }

        let cancel = self.inner.shutdown.child_token();
        let (tx, rx) = watch::channel(None);
        in_flight.insert(
            profile_id.to_string(),
            InFlight {
                cancel: cancel.clone(),
                outcome: rx.clone(),
            },
        );
        drop(in_flight);

        info!(profile_id, "Enrichment enqueued");
        let inner = self.inner.clone();
        let id = profile_id.to_string();
        self.inner.tracker.spawn(async move {
            let outcome = inner.drive(&id, &cancel).await;
            inner.finish(&id, outcome, tx);
        });

        JobTicket {
            profile_id: profile_id.to_string(),
            deduplicated: false,
            outcome: rx,
        }
    }

    /// Cancel the in-flight job for a profile. Returns false if none was running.
    pub fn cancel(&self, profile_id: &str) -> bool {
        match self.inner.lock_in_flight().get(profile_id) {
            Some(job) => {
                info!(profile_id, "Cancelling enrichment");
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, profile_id: &str) -> bool {
        self.inner.lock_in_flight().contains_key(profile_id)
    }

    pub fn in_flight_count(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    /// Terminal outcome of the most recent job for a profile
    pub fn last_outcome(&self, profile_id: &str) -> Option<JobOutcome> {
        self.inner
            .last_outcomes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(profile_id)
            .cloned()
    }

    /// Cancel everything and wait for running jobs to wind down
    pub async fn shutdown(&self) {
        info!(in_flight = self.in_flight_count(), "Shutting down enrichment scheduler");
        self.inner.shutdown.cancel();
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
    }
}

impl Inner {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<String, InFlight>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn drive(&self, profile_id: &str, cancel: &CancellationToken) -> JobOutcome {
        let mut attempt = 1;
        loop {
            let outcome = self.job.run_attempt(profile_id, attempt, cancel).await;

            if outcome.state != JobState::RetryableFailure || cancel.is_cancelled() {
                return outcome;
            }
            if attempt >= self.policy.max_attempts {
                warn!(profile_id, attempts = attempt, "Retry budget exhausted");
                return outcome;
            }

            let delay = self.policy.delay(attempt, outcome.retry_after);
            info!(profile_id, attempt, delay_ms = delay.as_millis() as u64, "Retrying enrichment after backoff");

            tokio::select! {
                _ = cancel.cancelled() => {
                    return JobOutcome::failure(profile_id, attempt, FailureKind::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    fn finish(&self, profile_id: &str, outcome: JobOutcome, tx: watch::Sender<Option<JobOutcome>>) {
        info!(profile_id, state = outcome.state.as_str(), attempts = outcome.attempts, "Enrichment finished");

        self.last_outcomes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(profile_id.to_string(), outcome.clone());
        self.lock_in_flight().remove(profile_id);

        // Receivers may all be gone
        let _ = tx.send(Some(outcome));
    }
}
