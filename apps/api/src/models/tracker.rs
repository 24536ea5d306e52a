use serde::{Deserialize, Serialize};

/// Baseline and rewritten résumé HTML for one job application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPair {
    #[serde(alias = "originalHtml")]
    pub original_html: String,
    #[serde(alias = "rewrittenHtml")]
    pub rewritten_html: String,
    #[serde(default, alias = "baselineScore")]
    pub baseline_score: Option<f64>,
    #[serde(default, alias = "rewriteScore")]
    pub rewrite_score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteJob {
    #[serde(alias = "processId")]
    pub process_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[serde(alias = "RUNNING", alias = "Running", alias = "pending", alias = "PENDING")]
    Running,
    #[serde(alias = "COMPLETE", alias = "Complete", alias = "completed", alias = "COMPLETED")]
    Complete,
    #[serde(alias = "FAILED", alias = "Failed", alias = "error", alias = "ERROR")]
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(alias = "status")]
    pub state: JobState,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordExtraction {
    #[serde(alias = "qualificationText")]
    pub qualification_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RewriteRequest<'a> {
    pub keywords: &'a [String],
    pub focus_terms: &'a [String],
}

#[derive(Debug, Serialize)]
pub(crate) struct FinalDocument<'a> {
    pub html: &'a str,
}
