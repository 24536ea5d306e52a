//! In-memory `TrackerApi` for tests. Status responses are scripted, and every
//! call is logged with the (possibly paused) tokio clock.
use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{TrackerApi, TrackerApiError};
use crate::keywords::KeywordSelection;
use crate::models::tracker::{DocumentPair, JobState, JobStatus, KeywordExtraction, RewriteJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch(String),
    Submit {
        job_id: String,
        keywords: Vec<String>,
        focus_terms: Vec<String>,
    },
    Poll(String),
    Keywords(String),
    Classification(String),
    Persist(String),
}

pub struct MockTrackerApi {
    pub pair: DocumentPair,
    pub extraction: KeywordExtraction,
    pub prior: KeywordSelection,
    statuses: Mutex<VecDeque<JobState>>,
    repeat: JobState,
    fail_persist: bool,
    calls: Mutex<Vec<(Instant, Call)>>,
    persisted: Mutex<Vec<(String, String)>>,
}

impl MockTrackerApi {
    pub fn new(original_html: &str, rewritten_html: &str) -> Self {
        Self {
            pair: DocumentPair {
                original_html: original_html.to_string(),
                rewritten_html: rewritten_html.to_string(),
                baseline_score: Some(0.61),
                rewrite_score: Some(0.78),
            },
            extraction: KeywordExtraction {
                qualification_text: String::new(),
                keywords: Vec::new(),
            },
            prior: KeywordSelection::default(),
            statuses: Mutex::new(VecDeque::new()),
            repeat: JobState::Complete,
            fail_persist: false,
            calls: Mutex::new(Vec::new()),
            persisted: Mutex::new(Vec::new()),
        }
    }

    /// Status responses returned in order; once exhausted, `repeat` is returned forever.
    pub fn with_statuses(mut self, statuses: &[JobState], repeat: JobState) -> Self {
        self.statuses = Mutex::new(statuses.iter().copied().collect());
        self.repeat = repeat;
        self
    }

    pub fn with_extraction(mut self, qualification_text: &str, keywords: &[&str]) -> Self {
        self.extraction = KeywordExtraction {
            qualification_text: qualification_text.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        };
        self
    }

    pub fn failing_persist(mut self) -> Self {
        self.fail_persist = true;
        self
    }

    pub fn calls(&self) -> Vec<(Instant, Call)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|(_, c)| matches(c)).count()
    }

    pub fn persisted(&self) -> Vec<(String, String)> {
        self.persisted.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push((Instant::now(), call));
    }
}

#[async_trait]
impl TrackerApi for MockTrackerApi {
    async fn fetch_baseline_and_rewrite(&self, job_id: &str) -> Result<DocumentPair, TrackerApiError> {
        self.record(Call::Fetch(job_id.to_string()));
        if job_id == "missing" {
            return Err(TrackerApiError::Api {
                status: 404,
                message: "job not found".into(),
            });
        }
        Ok(self.pair.clone())
    }

    async fn submit_rewrite_job(
        &self,
        job_id: &str,
        keywords: &[String],
        focus_terms: &[String],
    ) -> Result<RewriteJob, TrackerApiError> {
        self.record(Call::Submit {
            job_id: job_id.to_string(),
            keywords: keywords.to_vec(),
            focus_terms: focus_terms.to_vec(),
        });
        Ok(RewriteJob {
            process_id: format!("proc-{job_id}"),
        })
    }

    async fn poll_job_status(&self, process_id: &str) -> Result<JobStatus, TrackerApiError> {
        self.record(Call::Poll(process_id.to_string()));
        let state = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.repeat);
        let message = (state == JobState::Failed).then(|| "rewrite model error".to_string());
        Ok(JobStatus { state, message })
    }

    async fn fetch_keyword_extraction(
        &self,
        job_id: &str,
    ) -> Result<KeywordExtraction, TrackerApiError> {
        self.record(Call::Keywords(job_id.to_string()));
        Ok(self.extraction.clone())
    }

    async fn fetch_prior_classification(
        &self,
        resume_id: &str,
    ) -> Result<KeywordSelection, TrackerApiError> {
        self.record(Call::Classification(resume_id.to_string()));
        Ok(self.prior.clone())
    }

    async fn persist_final_document(&self, resume_id: &str, html: &str) -> Result<(), TrackerApiError> {
        self.record(Call::Persist(resume_id.to_string()));
        if self.fail_persist {
            return Err(TrackerApiError::Api {
                status: 500,
                message: "storage unavailable".into(),
            });
        }
        self.persisted
            .lock()
            .unwrap()
            .push((resume_id.to_string(), html.to_string()));
        Ok(())
    }
}
