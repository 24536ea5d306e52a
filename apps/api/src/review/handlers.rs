use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::diff::{ChangePhrase, DiffStrategy, PhraseDiff};
use crate::errors::AppError;
use crate::highlight::{ChangeMarker, MarkerState};
use crate::keywords::{KeywordEvent, KeywordSelection};
use crate::reconcile::{ChangeReconciler, ChangeSummary, ClientMessage, ReconciledDocument};
use crate::review::session::{KeywordView, ReviewDocuments, ReviewView};
use crate::review::workflow::{
    self, OpenSessionRequest, SaveResponse, SelectRequest, SelectResponse, StartRewriteRequest,
};
use crate::rewrite::RewriteStatus;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DiffRequest {
    #[serde(alias = "originalHtml")]
    pub original_html: String,
    #[serde(alias = "rewrittenHtml")]
    pub rewritten_html: String,
    #[serde(default)]
    pub strategy: Option<DiffStrategy>,
}

#[derive(Serialize)]
pub struct DiffResponse {
    pub diff: PhraseDiff,
    pub original_html: String,
    pub rewritten_html: String,
    pub redline_html: String,
    pub markers: Vec<ChangeMarker>,
    pub unplaced: Vec<ChangePhrase>,
}

/// POST /api/v1/diff
/// One-shot diff and render of a document pair; nothing is stored.
pub async fn handle_diff(
    State(state): State<AppState>,
    Json(req): Json<DiffRequest>,
) -> Result<Json<DiffResponse>, AppError> {
    let strategy = req.strategy.unwrap_or(state.config.diff_strategy);
    let documents =
        ReviewDocuments::build_blocking(req.original_html, req.rewritten_html, strategy).await?;
    Ok(Json(DiffResponse {
        redline_html: documents.reconciler.annotated_html(),
        markers: documents.reconciler.markers(),
        diff: documents.diff,
        original_html: documents.annotated_original,
        rewritten_html: documents.annotated_rewritten,
        unplaced: documents.unplaced,
    }))
}

/// POST /api/v1/reviews
pub async fn handle_open_review(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<ReviewView>), AppError> {
    let id = workflow::open_review(&state, req).await?;
    let view = state.sessions.reviews.read(id, |s| s.view()).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/reviews/:id
pub async fn handle_get_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReviewView>, AppError> {
    Ok(Json(state.sessions.reviews.read(id, |s| s.view()).await?))
}

/// DELETE /api/v1/reviews/:id
/// Dropping the session also stops any rewrite polling it owns.
pub async fn handle_close_review(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.reviews.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct DecisionResponse {
    pub changed: usize,
    pub markers: Vec<ChangeMarker>,
    pub summary: ChangeSummary,
}

impl DecisionResponse {
    fn from_reconciler(changed: usize, reconciler: &ChangeReconciler) -> Self {
        Self {
            changed,
            markers: reconciler.markers(),
            summary: reconciler.summary(),
        }
    }
}

#[derive(Deserialize)]
pub struct ToggleRequest {
    #[serde(alias = "changeId")]
    pub change_id: String,
    /// Explicit target state; flips the current state when absent.
    #[serde(default)]
    pub state: Option<MarkerState>,
}

/// POST /api/v1/reviews/:id/toggle
pub async fn handle_toggle(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<DecisionResponse>, AppError> {
    let response = state
        .sessions
        .reviews
        .update(id, |s| {
            let reconciler = &mut s.documents.reconciler;
            let changed = match req.state {
                Some(target) => reconciler.set_state(&req.change_id, target)?,
                None => {
                    reconciler.toggle(&req.change_id)?;
                    true
                }
            };
            Ok::<_, AppError>(DecisionResponse::from_reconciler(
                usize::from(changed),
                reconciler,
            ))
        })
        .await??;
    Ok(Json(response))
}

/// POST /api/v1/reviews/:id/message
/// Accepts the messages posted by the highlight script inside a rendered frame.
pub async fn handle_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(message): Json<ClientMessage>,
) -> Result<Json<DecisionResponse>, AppError> {
    let response = state
        .sessions
        .reviews
        .update(id, |s| {
            let reconciler = &mut s.documents.reconciler;
            let changed = reconciler.apply_message(&message);
            DecisionResponse::from_reconciler(changed, reconciler)
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/reviews/:id/accept-all
pub async fn handle_accept_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DecisionResponse>, AppError> {
    set_all(&state, id, MarkerState::Accepted).await
}

/// POST /api/v1/reviews/:id/reject-all
pub async fn handle_reject_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DecisionResponse>, AppError> {
    set_all(&state, id, MarkerState::Rejected).await
}

async fn set_all(
    state: &AppState,
    id: Uuid,
    target: MarkerState,
) -> Result<Json<DecisionResponse>, AppError> {
    let response = state
        .sessions
        .reviews
        .update(id, |s| {
            let reconciler = &mut s.documents.reconciler;
            let changed = reconciler
                .markers()
                .iter()
                .filter(|m| m.state != target)
                .count();
            match target {
                MarkerState::Accepted => reconciler.accept_all(),
                MarkerState::Rejected => reconciler.reject_all(),
            }
            DecisionResponse::from_reconciler(changed, reconciler)
        })
        .await?;
    Ok(Json(response))
}

/// GET /api/v1/reviews/:id/reconstruct
/// Preview of the final document under the current decisions.
pub async fn handle_reconstruct(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReconciledDocument>, AppError> {
    let reconciler = state
        .sessions
        .reviews
        .read(id, |s| s.documents.reconciler.clone())
        .await?;
    let document = tokio::task::spawn_blocking(move || reconciler.reconstruct())
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    Ok(Json(document))
}

/// POST /api/v1/reviews/:id/save
pub async fn handle_save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SaveResponse>, AppError> {
    Ok(Json(workflow::save(&state, id).await?))
}

/// POST /api/v1/reviews/:id/rewrite
pub async fn handle_start_rewrite(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StartRewriteRequest>,
) -> Result<(StatusCode, Json<RewriteStatus>), AppError> {
    let status = workflow::start_rewrite(&state, id, req).await?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

/// GET /api/v1/reviews/:id/rewrite
pub async fn handle_rewrite_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RewriteStatus>, AppError> {
    Ok(Json(workflow::rewrite_status(&state, id).await?))
}

#[derive(Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

/// DELETE /api/v1/reviews/:id/rewrite
pub async fn handle_cancel_rewrite(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let cancelled = workflow::cancel_rewrite(&state, id).await?;
    Ok(Json(CancelResponse { cancelled }))
}

/// POST /api/v1/keywords
pub async fn handle_open_keywords(
    State(state): State<AppState>,
    Json(req): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<KeywordView>), AppError> {
    let view = workflow::open_keywords(&state, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/keywords/:id
pub async fn handle_get_keywords(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<KeywordView>, AppError> {
    Ok(Json(state.sessions.keywords.read(id, |s| s.view()).await?))
}

/// DELETE /api/v1/keywords/:id
pub async fn handle_close_keywords(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.keywords.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct KeywordEventResponse {
    pub changed: bool,
    pub session: KeywordView,
}

/// POST /api/v1/keywords/:id/events
pub async fn handle_keyword_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(event): Json<KeywordEvent>,
) -> Result<Json<KeywordEventResponse>, AppError> {
    let response = state
        .sessions
        .keywords
        .update(id, |s| KeywordEventResponse {
            changed: s.engine.apply(&event),
            session: s.view(),
        })
        .await?;
    Ok(Json(response))
}

/// POST /api/v1/keywords/:id/select
pub async fn handle_select(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, AppError> {
    Ok(Json(workflow::select_keyword(&state, id, req).await?))
}

/// GET /api/v1/keywords/:id/final
pub async fn handle_final_keywords(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<KeywordSelection>, AppError> {
    Ok(Json(
        state.sessions.keywords.read(id, |s| s.engine.finalize()).await?,
    ))
}
