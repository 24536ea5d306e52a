use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::document::normalize::visible_text;
use crate::errors::AppError;
use crate::keywords::{
    BoundingBoxLines, DragSelection, KeywordSelection, KeywordSelectionEngine, LineGrouping,
    SingleLine,
};
use crate::review::session::{
    KeywordSession, KeywordView, ReviewDocuments, ReviewSession, RewriteTracker,
};
use crate::rewrite::{run_rewrite, PollConfig, RewriteStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(alias = "jobId")]
    pub job_id: String,
    #[serde(alias = "resumeId")]
    pub resume_id: String,
}

fn validate_ids(req: &OpenSessionRequest) -> Result<(), AppError> {
    if req.job_id.trim().is_empty() || req.resume_id.trim().is_empty() {
        return Err(AppError::Validation(
            "job_id and resume_id must not be empty".into(),
        ));
    }
    Ok(())
}

/// Fetches the document pair for a job and opens a review session over it.
pub async fn open_review(state: &AppState, req: OpenSessionRequest) -> Result<Uuid, AppError> {
    validate_ids(&req)?;
    let pair = state.api.fetch_baseline_and_rewrite(&req.job_id).await?;
    let documents = ReviewDocuments::build_blocking(
        pair.original_html,
        pair.rewritten_html,
        state.config.diff_strategy,
    )
    .await?;

    let id = Uuid::new_v4();
    info!(
        %id,
        job_id = %req.job_id,
        additions = documents.diff.additions.len(),
        removals = documents.diff.removals.len(),
        "Review session opened"
    );
    state
        .sessions
        .reviews
        .insert(
            id,
            ReviewSession {
                id,
                job_id: req.job_id,
                resume_id: req.resume_id,
                created_at: Utc::now(),
                saved_at: None,
                baseline_score: pair.baseline_score,
                rewrite_score: pair.rewrite_score,
                documents,
                rewrite: None,
            },
        )
        .await;
    Ok(id)
}

/// Keyword lists for a rewrite: taken from a keyword session when one is
/// named, otherwise from the request body.
#[derive(Debug, Default, Deserialize)]
pub struct StartRewriteRequest {
    #[serde(default, alias = "keywordSession")]
    pub keyword_session: Option<Uuid>,
    #[serde(default)]
    pub selection: Option<KeywordSelection>,
}

/// Submits a rewrite job for the review's job and tracks it in the
/// background. When the job completes, the review's documents are rebuilt
/// from the new pair. At most one job runs per review.
pub async fn start_rewrite(
    state: &AppState,
    review_id: Uuid,
    req: StartRewriteRequest,
) -> Result<RewriteStatus, AppError> {
    let selection = match (req.keyword_session, req.selection) {
        (Some(keyword_id), _) => {
            state
                .sessions
                .keywords
                .read(keyword_id, |s| s.engine.finalize())
                .await?
        }
        (None, Some(selection)) => selection,
        (None, None) => {
            return Err(AppError::Validation(
                "either keyword_session or selection is required".into(),
            ))
        }
    };
    if selection.keyword_final.is_empty() && selection.focus_final.is_empty() {
        return Err(AppError::Validation("keyword selection is empty".into()));
    }

    let (status_tx, status_rx) = watch::channel(RewriteStatus::Queued);
    let (cancel_tx, mut cancel_rx) = watch::channel(false);

    let job_id = state
        .sessions
        .reviews
        .update(review_id, |session| {
            if session.rewrite_status().is_active() {
                return Err(AppError::Conflict(format!(
                    "a rewrite job is already running for review {review_id}"
                )));
            }
            session.rewrite = Some(RewriteTracker {
                status: status_rx,
                cancel: cancel_tx,
            });
            Ok(session.job_id.clone())
        })
        .await??;

    let api = state.api.clone();
    let reviews = state.sessions.reviews.clone();
    let poll = PollConfig::from(&state.config);
    let strategy = state.config.diff_strategy;

    tokio::spawn(async move {
        let result = run_rewrite(
            api.as_ref(),
            &job_id,
            &selection,
            &poll,
            &mut cancel_rx,
            &status_tx,
        )
        .await;

        let pair = match result {
            Ok(pair) => pair,
            Err(e) => {
                warn!(%review_id, %job_id, error = %e, "Rewrite job did not complete");
                status_tx.send_replace(RewriteStatus::from(&e));
                return;
            }
        };

        let (baseline_score, rewrite_score) = (pair.baseline_score, pair.rewrite_score);
        let documents = match ReviewDocuments::build_blocking(
            pair.original_html,
            pair.rewritten_html,
            strategy,
        )
        .await
        {
            Ok(documents) => documents,
            Err(e) => {
                warn!(%review_id, error = %e, "Rebuilding review documents failed");
                status_tx.send_replace(RewriteStatus::Failed {
                    message: e.to_string(),
                });
                return;
            }
        };

        let installed = reviews
            .update(review_id, |session| {
                session.documents = documents;
                session.baseline_score = baseline_score;
                session.rewrite_score = rewrite_score;
                session.saved_at = None;
            })
            .await;
        match installed {
            Ok(()) => {
                info!(%review_id, %job_id, "Rewrite installed");
                status_tx.send_replace(RewriteStatus::Complete);
            }
            Err(_) => warn!(%review_id, "Review closed before the rewrite finished"),
        }
    });

    Ok(RewriteStatus::Queued)
}

/// Current rewrite status. A timed-out or failed job is reported as an error
/// so the caller surfaces it to the user.
pub async fn rewrite_status(state: &AppState, review_id: Uuid) -> Result<RewriteStatus, AppError> {
    let status = state
        .sessions
        .reviews
        .read(review_id, ReviewSession::rewrite_status)
        .await?;
    match status {
        RewriteStatus::TimedOut { attempts } => Err(AppError::PollTimeout { attempts }),
        RewriteStatus::Failed { message } => Err(AppError::PollFailed(message)),
        other => Ok(other),
    }
}

/// Stops polling for the review's rewrite job, if one is running.
pub async fn cancel_rewrite(state: &AppState, review_id: Uuid) -> Result<bool, AppError> {
    state
        .sessions
        .reviews
        .read(review_id, |session| match &session.rewrite {
            Some(tracker) if tracker.current().is_active() => {
                tracker.cancel.send_replace(true);
                true
            }
            _ => false,
        })
        .await
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub html: String,
    pub accepted: usize,
    pub rejected: usize,
    pub saved_at: DateTime<Utc>,
}

/// Rebuilds the final document from the current decisions and persists it.
/// A rejected save leaves the session untouched so the user can retry.
pub async fn save(state: &AppState, review_id: Uuid) -> Result<SaveResponse, AppError> {
    let (resume_id, reconciler) = state
        .sessions
        .reviews
        .read(review_id, |s| {
            (s.resume_id.clone(), s.documents.reconciler.clone())
        })
        .await?;
    let document = tokio::task::spawn_blocking(move || reconciler.reconstruct())
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    state
        .api
        .persist_final_document(&resume_id, &document.html)
        .await
        .map_err(|e| AppError::SaveFailure(e.to_string()))?;

    let saved_at = Utc::now();
    state
        .sessions
        .reviews
        .update(review_id, |s| s.saved_at = Some(saved_at))
        .await?;
    info!(
        %review_id,
        %resume_id,
        accepted = document.accepted,
        rejected = document.rejected,
        "Final document saved"
    );

    Ok(SaveResponse {
        html: document.html,
        accepted: document.accepted,
        rejected: document.rejected,
        saved_at,
    })
}

/// Loads the qualification text and any saved classification, and opens a
/// keyword session with the initial highlighting applied.
pub async fn open_keywords(
    state: &AppState,
    req: OpenSessionRequest,
) -> Result<KeywordView, AppError> {
    validate_ids(&req)?;
    let (extraction, prior) = tokio::try_join!(
        state.api.fetch_keyword_extraction(&req.job_id),
        state.api.fetch_prior_classification(&req.resume_id),
    )?;

    let engine = KeywordSelectionEngine::initial(
        &visible_text(&extraction.qualification_text),
        &extraction.keywords,
        &prior,
    );
    let id = Uuid::new_v4();
    let session = KeywordSession {
        id,
        job_id: req.job_id,
        resume_id: req.resume_id,
        created_at: Utc::now(),
        engine,
    };
    let view = session.view();
    info!(%id, keywords = view.keywords.len(), "Keyword session opened");
    state.sessions.keywords.insert(id, session).await;
    Ok(view)
}

/// A completed drag over the qualification text. `tops` maps segment index
/// to the rendered top offset of its word; without it the text is treated
/// as a single line.
#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub anchor: usize,
    pub head: usize,
    #[serde(default)]
    pub tops: Option<HashMap<usize, f64>>,
}

#[derive(Debug, Serialize)]
pub struct SelectResponse {
    pub added: Option<String>,
    pub session: KeywordView,
}

pub async fn select_keyword(
    state: &AppState,
    keyword_id: Uuid,
    req: SelectRequest,
) -> Result<SelectResponse, AppError> {
    state
        .sessions
        .keywords
        .update(keyword_id, |session| {
            let lines: Box<dyn LineGrouping> = match req.tops {
                Some(tops) => Box::new(BoundingBoxLines::new(tops)),
                None => Box::new(SingleLine),
            };
            let added = DragSelection::begin(&session.engine, req.anchor).and_then(|mut drag| {
                drag.drag_to(&session.engine, lines.as_ref(), req.head);
                drag.finish(&mut session.engine)
            });
            SelectResponse {
                added,
                session: session.view(),
            }
        })
        .await
}
