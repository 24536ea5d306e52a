use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::diff::{diff_with, ChangePhrase, DiffStrategy, PhraseDiff};
use crate::errors::AppError;
use crate::highlight::assets::KEYWORD_STYLE;
use crate::highlight::{render_additions, render_redline, render_removals, ChangeMarker};
use crate::keywords::{Keyword, KeywordSelection, KeywordSelectionEngine, Segment};
use crate::reconcile::{ChangeReconciler, ChangeSummary};
use crate::rewrite::RewriteStatus;

/// Everything derived from one document pair: the phrase diff, both
/// side-by-side views, and the reconciler over the redline view.
pub struct ReviewDocuments {
    pub diff: PhraseDiff,
    pub annotated_original: String,
    pub annotated_rewritten: String,
    pub unplaced: Vec<ChangePhrase>,
    pub reconciler: ChangeReconciler,
}

impl ReviewDocuments {
    pub fn build(original_html: &str, rewritten_html: &str, strategy: DiffStrategy) -> Self {
        let diff = diff_with(original_html, rewritten_html, strategy);
        let original_view = render_removals(original_html, &diff.removals);
        let rewritten_view = render_additions(rewritten_html, &diff.additions);

        let mut unplaced = original_view.unplaced.clone();
        unplaced.extend(rewritten_view.unplaced.iter().cloned());

        let reconciler =
            ChangeReconciler::new(original_html, render_redline(original_html, rewritten_html));

        Self {
            annotated_original: original_view.html(),
            annotated_rewritten: rewritten_view.html(),
            diff,
            unplaced,
            reconciler,
        }
    }

    /// `build` on the blocking pool; a large résumé pair can take a while to align.
    pub async fn build_blocking(
        original_html: String,
        rewritten_html: String,
        strategy: DiffStrategy,
    ) -> Result<Self, AppError> {
        tokio::task::spawn_blocking(move || Self::build(&original_html, &rewritten_html, strategy))
            .await
            .map_err(|e| AppError::Internal(e.into()))
    }
}

/// Handle on a background rewrite job.
pub struct RewriteTracker {
    pub status: watch::Receiver<RewriteStatus>,
    pub cancel: watch::Sender<bool>,
}

impl RewriteTracker {
    pub fn current(&self) -> RewriteStatus {
        self.status.borrow().clone()
    }
}

pub struct ReviewSession {
    pub id: Uuid,
    pub job_id: String,
    pub resume_id: String,
    pub created_at: DateTime<Utc>,
    pub saved_at: Option<DateTime<Utc>>,
    pub baseline_score: Option<f64>,
    pub rewrite_score: Option<f64>,
    pub documents: ReviewDocuments,
    pub rewrite: Option<RewriteTracker>,
}

impl ReviewSession {
    pub fn rewrite_status(&self) -> RewriteStatus {
        self.rewrite
            .as_ref()
            .map(RewriteTracker::current)
            .unwrap_or_default()
    }

    pub fn view(&self) -> ReviewView {
        let reconciler = &self.documents.reconciler;
        ReviewView {
            id: self.id,
            job_id: self.job_id.clone(),
            resume_id: self.resume_id.clone(),
            created_at: self.created_at,
            saved_at: self.saved_at,
            baseline_score: self.baseline_score,
            rewrite_score: self.rewrite_score,
            diff: self.documents.diff.clone(),
            original_html: self.documents.annotated_original.clone(),
            rewritten_html: self.documents.annotated_rewritten.clone(),
            redline_html: reconciler.annotated_html(),
            markers: reconciler.markers(),
            summary: reconciler.summary(),
            unplaced: self.documents.unplaced.clone(),
            rewrite: self.rewrite_status(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub job_id: String,
    pub resume_id: String,
    pub created_at: DateTime<Utc>,
    pub saved_at: Option<DateTime<Utc>>,
    pub baseline_score: Option<f64>,
    pub rewrite_score: Option<f64>,
    pub diff: PhraseDiff,
    /// Original document with removal markers.
    pub original_html: String,
    /// Rewritten document with addition markers.
    pub rewritten_html: String,
    pub redline_html: String,
    pub markers: Vec<ChangeMarker>,
    pub summary: ChangeSummary,
    pub unplaced: Vec<ChangePhrase>,
    pub rewrite: RewriteStatus,
}

pub struct KeywordSession {
    pub id: Uuid,
    pub job_id: String,
    pub resume_id: String,
    pub created_at: DateTime<Utc>,
    pub engine: KeywordSelectionEngine,
}

impl KeywordSession {
    pub fn view(&self) -> KeywordView {
        KeywordView {
            id: self.id,
            job_id: self.job_id.clone(),
            resume_id: self.resume_id.clone(),
            created_at: self.created_at,
            segments: self.engine.segments().to_vec(),
            keywords: self.engine.keywords().to_vec(),
            html: self.engine.render_html(),
            style: KEYWORD_STYLE,
            selection: self.engine.finalize(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KeywordView {
    pub id: Uuid,
    pub job_id: String,
    pub resume_id: String,
    pub created_at: DateTime<Utc>,
    pub segments: Vec<Segment>,
    pub keywords: Vec<Keyword>,
    pub html: String,
    /// Stylesheet for `html`.
    pub style: &'static str,
    pub selection: KeywordSelection,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeKind;

    const ORIGINAL: &str = "<html><body><p>Led team of five. Built a cache.</p></body></html>";
    const REWRITTEN: &str =
        "<html><body><p>Managed team of five. Built a high-performance cache.</p></body></html>";

    #[test]
    fn test_build_produces_all_views() {
        let documents = ReviewDocuments::build(ORIGINAL, REWRITTEN, DiffStrategy::WordLcs);

        assert_eq!(documents.diff.addition_texts(), vec!["Managed", "high-performance"]);
        assert_eq!(documents.diff.removal_texts(), vec!["Led"]);
        assert!(documents.annotated_original.contains("data-change-id=\"del-0\""));
        assert!(documents.annotated_rewritten.contains("data-change-id=\"ins-0\""));
        assert!(documents.unplaced.is_empty());

        let markers = documents.reconciler.markers();
        assert_eq!(
            markers.iter().filter(|m| m.kind == ChangeKind::Removal).count(),
            1
        );
        assert_eq!(
            markers.iter().filter(|m| m.kind == ChangeKind::Addition).count(),
            2
        );
    }

    #[tokio::test]
    async fn test_build_blocking_matches_build() {
        let documents =
            ReviewDocuments::build_blocking(ORIGINAL.into(), REWRITTEN.into(), DiffStrategy::WordLcs)
                .await
                .unwrap();
        assert_eq!(
            documents.reconciler.reconstruct().html,
            ReviewDocuments::build(ORIGINAL, REWRITTEN, DiffStrategy::WordLcs)
                .reconciler
                .reconstruct()
                .html
        );
    }
}
