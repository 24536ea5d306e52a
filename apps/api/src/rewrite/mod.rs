/// Rewrite job workflow: submit the curated keywords, poll the job, then fetch
/// the resulting document pair exactly once.
pub mod poller;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::info;

use crate::api_client::{TrackerApi, TrackerApiError};
use crate::keywords::KeywordSelection;
use crate::models::tracker::DocumentPair;

pub use poller::{poll_until_complete, PollConfig, PollError};

/// Progress of a rewrite job as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RewriteStatus {
    #[default]
    Idle,
    /// Accepted by this service, not yet submitted to the tracker.
    Queued,
    Submitted {
        process_id: String,
    },
    Running {
        process_id: String,
        attempt: u32,
        max_attempts: u32,
    },
    Complete,
    Failed {
        message: String,
    },
    TimedOut {
        attempts: u32,
    },
    Cancelled,
}

impl RewriteStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RewriteStatus::Queued | RewriteStatus::Submitted { .. } | RewriteStatus::Running { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Api(#[from] TrackerApiError),
}

impl From<&RewriteError> for RewriteStatus {
    fn from(e: &RewriteError) -> Self {
        match e {
            RewriteError::Poll(PollError::Timeout { attempts }) => RewriteStatus::TimedOut {
                attempts: *attempts,
            },
            RewriteError::Poll(PollError::Failed(message)) => RewriteStatus::Failed {
                message: message.clone(),
            },
            RewriteError::Poll(PollError::Cancelled) => RewriteStatus::Cancelled,
            RewriteError::Api(e) => RewriteStatus::Failed {
                message: e.to_string(),
            },
        }
    }
}

/// Runs one rewrite job to completion and returns the new document pair.
///
/// `status` receives `Submitted` and one `Running` per poll; terminal states
/// are left to the caller, which publishes them once it has installed the result.
pub async fn run_rewrite(
    api: &dyn TrackerApi,
    job_id: &str,
    selection: &KeywordSelection,
    config: &PollConfig,
    cancel: &mut watch::Receiver<bool>,
    status: &watch::Sender<RewriteStatus>,
) -> Result<DocumentPair, RewriteError> {
    let job = api
        .submit_rewrite_job(job_id, &selection.keyword_final, &selection.focus_final)
        .await?;
    info!(job_id, process_id = %job.process_id, "Rewrite job submitted");
    status.send_replace(RewriteStatus::Submitted {
        process_id: job.process_id.clone(),
    });

    let max_attempts = config.max_attempts;
    poll_until_complete(api, &job.process_id, config, cancel, |attempt| {
        status.send_replace(RewriteStatus::Running {
            process_id: job.process_id.clone(),
            attempt,
            max_attempts,
        });
    })
    .await?;

    Ok(api.fetch_baseline_and_rewrite(job_id).await?)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api_client::mock::{Call, MockTrackerApi};
    use crate::models::tracker::JobState;

    fn selection() -> KeywordSelection {
        KeywordSelection {
            keyword_final: vec!["SQL".into()],
            focus_final: vec!["Python".into()],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_job_fetches_pair_once() {
        let api = MockTrackerApi::new("<p>old</p>", "<p>new</p>").with_statuses(
            &[JobState::Running, JobState::Running],
            JobState::Complete,
        );
        let (_cancel_tx, mut cancel) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(RewriteStatus::Idle);

        let pair = run_rewrite(
            &api,
            "job-1",
            &selection(),
            &PollConfig::default(),
            &mut cancel,
            &status_tx,
        )
        .await
        .unwrap();

        assert_eq!(pair.rewritten_html, "<p>new</p>");
        let calls: Vec<Call> = api.calls().into_iter().map(|(_, c)| c).collect();
        assert_eq!(
            calls,
            vec![
                Call::Submit {
                    job_id: "job-1".into(),
                    keywords: vec!["SQL".into()],
                    focus_terms: vec!["Python".into()],
                },
                Call::Poll("proc-job-1".into()),
                Call::Poll("proc-job-1".into()),
                Call::Poll("proc-job-1".into()),
                Call::Fetch("job-1".into()),
            ]
        );
        let polls: Vec<_> = api
            .calls()
            .into_iter()
            .filter(|(_, c)| matches!(c, Call::Poll(_)))
            .map(|(at, _)| at)
            .collect();
        for pair in polls.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }
        assert_eq!(
            *status_rx.borrow(),
            RewriteStatus::Running {
                process_id: "proc-job-1".into(),
                attempt: 3,
                max_attempts: 120,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_never_fetches() {
        let api = MockTrackerApi::new("", "").with_statuses(&[], JobState::Running);
        let (_cancel_tx, mut cancel) = watch::channel(false);
        let (status_tx, _status_rx) = watch::channel(RewriteStatus::Idle);

        let err = run_rewrite(
            &api,
            "job-1",
            &selection(),
            &PollConfig::default(),
            &mut cancel,
            &status_tx,
        )
        .await
        .unwrap_err();

        assert_eq!(
            RewriteStatus::from(&err),
            RewriteStatus::TimedOut { attempts: 120 }
        );
        assert_eq!(api.count(|c| matches!(c, Call::Poll(_))), 120);
        assert_eq!(api.count(|c| matches!(c, Call::Fetch(_))), 0);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_value(RewriteStatus::Running {
            process_id: "p".into(),
            attempt: 2,
            max_attempts: 120,
        })
        .unwrap();
        assert_eq!(json["state"], "running");
        assert_eq!(json["attempt"], 2);
        assert!(RewriteStatus::Submitted {
            process_id: "p".into()
        }
        .is_active());
        assert!(!RewriteStatus::Complete.is_active());
    }
}
