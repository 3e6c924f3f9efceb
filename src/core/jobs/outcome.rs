//! Job outcome types

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::profile::Tier;

// ============================================================================
// Types
// ============================================================================

/// Enrichment job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting to run
    Pending,
    /// Currently running
    Running,
    /// Enrichment stored
    Success,
    /// Failed, another attempt may succeed
    RetryableFailure,
    /// Failed, retrying will not help
    PermanentFailure,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending | JobState::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Success => "success",
            JobState::RetryableFailure => "retryable_failure",
            JobState::PermanentFailure => "permanent_failure",
        }
    }
}

/// Why a job failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConsentDenied,
    ProfileNotFound,
    Unauthorized,
    RateLimited,
    Unreachable,
    InvalidResponse,
    Timeout,
    NoProviderAvailable,
    Storage,
    Cancelled,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited
                | FailureKind::Unreachable
                | FailureKind::Timeout
                | FailureKind::Storage
                | FailureKind::Cancelled
        )
    }

    /// The user has to fix provider settings before this can succeed
    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            FailureKind::Unauthorized | FailureKind::InvalidResponse | FailureKind::NoProviderAvailable
        )
    }

    pub fn summary(&self) -> &'static str {
        match self {
            FailureKind::ConsentDenied => "AI enrichment consent not granted",
            FailureKind::ProfileNotFound => "Profile not found",
            FailureKind::Unauthorized => "Provider rejected credentials, check provider settings",
            FailureKind::RateLimited => "Provider rate limited the request",
            FailureKind::Unreachable => "Provider unreachable",
            FailureKind::InvalidResponse => "Provider returned an unusable response, check provider settings",
            FailureKind::Timeout => "Provider timed out",
            FailureKind::NoProviderAvailable => "No text provider available, check provider settings",
            FailureKind::Storage => "Could not read or write profile data",
            FailureKind::Cancelled => "Enrichment cancelled",
        }
    }

    pub fn state(&self) -> JobState {
        if self.is_retryable() {
            JobState::RetryableFailure
        } else {
            JobState::PermanentFailure
        }
    }
}

/// Terminal result of one job, across all of its attempts
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub profile_id: String,
    pub state: JobState,
    pub failure: Option<FailureKind>,
    /// Human-readable; never contains provider response bodies
    pub summary: String,
    pub attempts: u32,
    pub retry_after: Option<Duration>,
    pub needs_attention: bool,
    pub tier: Option<Tier>,
    /// Success whose narrative was dropped because a newer one was already stored
    pub superseded: bool,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn success(profile_id: &str, attempts: u32, tier: Tier, summary: String) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            state: JobState::Success,
            failure: None,
            summary,
            attempts,
            retry_after: None,
            needs_attention: false,
            tier: Some(tier),
            superseded: false,
            finished_at: Utc::now(),
        }
    }

    pub fn superseded(profile_id: &str, attempts: u32, tier: Tier, summary: String) -> Self {
        Self {
            superseded: true,
            ..Self::success(profile_id, attempts, tier, summary)
        }
    }

    pub fn failure(profile_id: &str, attempts: u32, kind: FailureKind) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            state: kind.state(),
            failure: Some(kind),
            summary: kind.summary().to_string(),
            attempts,
            retry_after: None,
            needs_attention: kind.needs_attention(),
            tier: None,
            superseded: false,
            finished_at: Utc::now(),
        }
    }

    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn is_success(&self) -> bool {
        self.state == JobState::Success
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (profile {}, attempts {})",
            self.state.as_str(),
            self.summary,
            self.profile_id,
            self.attempts
        )?;
        if let Some(delay) = self.retry_after {
            write!(f, ", retry after {}s", delay.as_secs())?;
        }
        Ok(())
    }
}
