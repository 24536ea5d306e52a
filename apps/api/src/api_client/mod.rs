/// Tracker backend client: the single point of contact with the job tracker's
/// REST API (document pairs, rewrite jobs, keyword lists, final documents).
///
/// Handlers and background tasks depend on the `TrackerApi` trait, never on
/// `reqwest` directly, so tests can substitute an in-memory backend.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::keywords::KeywordSelection;
use crate::models::tracker::{
    DocumentPair, FinalDocument, JobStatus, KeywordExtraction, RewriteJob, RewriteRequest,
};

#[cfg(test)]
pub mod mock;

#[derive(Debug, Error)]
pub enum TrackerApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[async_trait]
pub trait TrackerApi: Send + Sync {
    async fn fetch_baseline_and_rewrite(&self, job_id: &str) -> Result<DocumentPair, TrackerApiError>;

    async fn submit_rewrite_job(
        &self,
        job_id: &str,
        keywords: &[String],
        focus_terms: &[String],
    ) -> Result<RewriteJob, TrackerApiError>;

    async fn poll_job_status(&self, process_id: &str) -> Result<JobStatus, TrackerApiError>;

    async fn fetch_keyword_extraction(&self, job_id: &str)
        -> Result<KeywordExtraction, TrackerApiError>;

    async fn fetch_prior_classification(
        &self,
        resume_id: &str,
    ) -> Result<KeywordSelection, TrackerApiError>;

    async fn persist_final_document(&self, resume_id: &str, html: &str)
        -> Result<(), TrackerApiError>;
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// `TrackerApi` over HTTP. Requests are not retried: a failed fetch or save is
/// reported to the user, who decides whether to try again.
#[derive(Clone)]
pub struct HttpTrackerApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTrackerApi {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TrackerApiError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<String, TrackerApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.map(|b| b.message).or(e.message))
                .unwrap_or(body);
            return Err(TrackerApiError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, TrackerApiError> {
        let body = self.send(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl TrackerApi for HttpTrackerApi {
    async fn fetch_baseline_and_rewrite(&self, job_id: &str) -> Result<DocumentPair, TrackerApiError> {
        debug!(job_id, "Fetching résumé pair");
        self.send_json(self.request(Method::GET, &format!("jobs/{job_id}/resume-comparison")))
            .await
    }

    async fn submit_rewrite_job(
        &self,
        job_id: &str,
        keywords: &[String],
        focus_terms: &[String],
    ) -> Result<RewriteJob, TrackerApiError> {
        debug!(
            job_id,
            keywords = keywords.len(),
            focus_terms = focus_terms.len(),
            "Submitting rewrite job"
        );
        let body = RewriteRequest {
            keywords,
            focus_terms,
        };
        self.send_json(
            self.request(Method::POST, &format!("jobs/{job_id}/resume-rewrite"))
                .json(&body),
        )
        .await
    }

    async fn poll_job_status(&self, process_id: &str) -> Result<JobStatus, TrackerApiError> {
        self.send_json(self.request(
            Method::GET,
            &format!("resume-rewrite/{process_id}/status"),
        ))
        .await
    }

    async fn fetch_keyword_extraction(
        &self,
        job_id: &str,
    ) -> Result<KeywordExtraction, TrackerApiError> {
        self.send_json(self.request(Method::GET, &format!("jobs/{job_id}/keywords")))
            .await
    }

    async fn fetch_prior_classification(
        &self,
        resume_id: &str,
    ) -> Result<KeywordSelection, TrackerApiError> {
        self.send_json(self.request(
            Method::GET,
            &format!("resumes/{resume_id}/keyword-classification"),
        ))
        .await
    }

    async fn persist_final_document(&self, resume_id: &str, html: &str) -> Result<(), TrackerApiError> {
        debug!(resume_id, bytes = html.len(), "Persisting final document");
        self.send(
            self.request(Method::PUT, &format!("resumes/{resume_id}/final"))
                .json(&FinalDocument { html }),
        )
        .await
        .map(|_| ())
    }
}
