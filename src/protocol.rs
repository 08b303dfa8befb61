//! HTTP request/response bodies (serde ready).
//! Read models for the browsing pages live in `catalog`; this file holds the rest.

use serde::{Deserialize, Serialize};

use crate::domain::{QuestionRecord, TestCaseResult};

#[derive(Debug, Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

/// Body of `POST /problems/:question_id/run_code`.
#[derive(Debug, Deserialize)]
pub struct RunCodeIn {
    pub source_code: String,
    /// Editor language tag; absent or unknown means Python.
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunCodeOut {
    pub test_case_results: Vec<TestCaseResult>,
}

#[derive(Debug, Serialize)]
pub struct ProblemsOut {
    pub problems: Vec<QuestionRecord>,
}

#[derive(Debug, Deserialize)]
pub struct UploaderQuery {
    pub uploaded_by: Option<String>,
}

/// Returned alongside the 303 on question creation.
#[derive(Debug, Serialize)]
pub struct CreateOut {
    pub job_id: String,
    pub status_url: String,
}
