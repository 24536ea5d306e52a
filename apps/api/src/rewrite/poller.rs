use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api_client::TrackerApi;
use crate::config::Config;
use crate::models::tracker::{JobState, JobStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl From<&Config> for PollConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.poll_interval(),
            max_attempts: config.poll_max_attempts.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("job still running after {attempts} status checks")]
    Timeout { attempts: u32 },

    #[error("job failed: {0}")]
    Failed(String),

    #[error("polling cancelled")]
    Cancelled,
}

/// Polls `process_id` until the job completes, fails, or `max_attempts`
/// checks have been made.
///
/// Each attempt waits one interval before asking, and the next wait only
/// starts once the previous response is handled, so polls never overlap.
/// A transport error counts as an attempt. Setting `cancel` to `true` (or
/// dropping its sender) stops polling at the next wait.
pub async fn poll_until_complete(
    api: &dyn TrackerApi,
    process_id: &str,
    config: &PollConfig,
    cancel: &mut watch::Receiver<bool>,
    mut on_attempt: impl FnMut(u32) + Send,
) -> Result<(), PollError> {
    for attempt in 1..=config.max_attempts {
        if *cancel.borrow() {
            return Err(PollError::Cancelled);
        }

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = cancelled(cancel) => {
                info!(process_id, attempt, "Rewrite polling cancelled");
                return Err(PollError::Cancelled);
            }
        }

        on_attempt(attempt);
        match api.poll_job_status(process_id).await {
            Ok(JobStatus {
                state: JobState::Complete,
                ..
            }) => {
                info!(process_id, attempt, "Rewrite job complete");
                return Ok(());
            }
            Ok(JobStatus {
                state: JobState::Failed,
                message,
            }) => {
                let message = message.unwrap_or_else(|| "rewrite job reported failure".to_string());
                warn!(process_id, attempt, %message, "Rewrite job failed");
                return Err(PollError::Failed(message));
            }
            Ok(_) => debug!(process_id, attempt, "Rewrite job still running"),
            Err(e) => warn!(process_id, attempt, error = %e, "Status check failed"),
        }
    }

    warn!(
        process_id,
        attempts = config.max_attempts,
        "Giving up on rewrite job"
    );
    Err(PollError::Timeout {
        attempts: config.max_attempts,
    })
}

/// Resolves once cancellation is requested or the sender is gone.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if rx.changed().await.is_err() || *rx.borrow() {
            return;
        }
    }
}
