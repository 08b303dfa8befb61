//! Judge0 (RapidAPI) client: submit a run, then fetch its verdict by token.
//!
//! Source, stdin and the returned streams travel base64-encoded so arbitrary bytes survive
//! the JSON round trip.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Settings;
use crate::error::{AppError, AppResult};
use crate::ports::{Judge, JudgeVerdict};

const SERVICE: &str = "Judge0";

#[derive(Clone)]
pub struct Judge0 {
    client: reqwest::Client,
    base_url: String,
    host: String,
    api_key: Option<String>,
}

impl Judge0 {
    pub fn new(settings: &Settings) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: settings.judge_url.trim_end_matches('/').to_string(),
            host: settings.rapidapi_host.clone(),
            api_key: settings.rapidapi_key.clone(),
        })
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = builder.header("x-rapidapi-host", &self.host);
        match &self.api_key {
            Some(key) => builder.header("x-rapidapi-key", key),
            None => builder,
        }
    }
}

#[async_trait]
impl Judge for Judge0 {
    #[instrument(level = "info", skip(self, source_code, stdin), fields(code_len = source_code.len(), stdin_len = stdin.len()))]
    async fn submit(&self, source_code: &str, language_id: u32, stdin: &str) -> AppResult<String> {
        let url = format!("{}/submissions?base64_encoded=true&wait=true", self.base_url);
        let payload = SubmissionRequest {
            language_id,
            source_code: STANDARD.encode(source_code),
            stdin: STANDARD.encode(stdin),
        };
        let res = self
            .request(self.client.post(&url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        let status = res.status();
        if status != StatusCode::CREATED {
            let body = res.text().await.unwrap_or_default();
            error!(target: "grading", %status, body = %crate::util::trunc_for_log(&body, 300), "Failed to submit code to Judge0");
            return Err(AppError::upstream(SERVICE, "Failed to submit code to Judge0"));
        }
        let created: SubmissionCreated = res
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("unreadable submission response: {e}")))?;
        info!(target: "grading", token = %created.token, "Submission accepted");
        Ok(created.token)
    }

    #[instrument(level = "info", skip(self))]
    async fn fetch(&self, token: &str) -> AppResult<JudgeVerdict> {
        let url = format!("{}/submissions/{}?base64_encoded=true", self.base_url, token);
        let res = self
            .request(self.client.get(&url))
            .send()
            .await
            .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;

        let status = res.status();
        if status != StatusCode::OK {
            error!(target: "grading", %status, %token, "Failed to fetch result from Judge0");
            return Err(AppError::upstream(SERVICE, "Failed to fetch result from Judge0"));
        }
        let raw: SubmissionResult = res
            .json()
            .await
            .map_err(|e| AppError::upstream(SERVICE, format!("unreadable result: {e}")))?;
        raw.decode()
    }
}

#[derive(Serialize)]
struct SubmissionRequest {
    language_id: u32,
    source_code: String,
    stdin: String,
}

#[derive(Deserialize)]
struct SubmissionCreated {
    token: String,
}

#[derive(Deserialize)]
struct SubmissionResult {
    #[serde(default)]
    stdout: Option<String>,
    #[serde(default)]
    stderr: Option<String>,
    #[serde(default)]
    compile_output: Option<String>,
    #[serde(default)]
    status: Option<SubmissionStatus>,
}

#[derive(Deserialize)]
struct SubmissionStatus {
    #[serde(default)]
    description: Option<String>,
}

impl SubmissionResult {
    fn decode(self) -> AppResult<JudgeVerdict> {
        Ok(JudgeVerdict {
            stdout: decode_stream(self.stdout)?,
            stderr: decode_stream(self.stderr)?,
            compile_output: decode_stream(self.compile_output)?,
            status: self.status.and_then(|s| s.description),
        })
    }
}

/// Judge0 wraps base64 output at 60 columns; whitespace is dropped before decoding.
fn decode_stream(field: Option<String>) -> AppResult<Option<String>> {
    let Some(encoded) = field else { return Ok(None) };
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AppError::upstream(SERVICE, format!("invalid base64 stream: {e}")))?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64_streams() {
        let encoded = STANDARD.encode("0 1\n");
        let wrapped = format!("{}\n", encoded);
        assert_eq!(decode_stream(Some(wrapped)).unwrap().as_deref(), Some("0 1\n"));
        assert_eq!(decode_stream(None).unwrap(), None);
    }

    #[test]
    fn result_decoding_keeps_status_description() {
        let body = serde_json::json!({
            "stdout": STANDARD.encode("42\n"),
            "stderr": null,
            "status": { "id": 3, "description": "Accepted" }
        });
        let raw: SubmissionResult = serde_json::from_value(body).unwrap();
        let v = raw.decode().unwrap();
        assert_eq!(v.stdout.as_deref(), Some("42\n"));
        assert_eq!(v.stderr, None);
        assert_eq!(v.status.as_deref(), Some("Accepted"));
    }

    #[test]
    fn garbage_stream_is_upstream_error() {
        assert!(matches!(decode_stream(Some("!!!".into())), Err(AppError::Upstream { .. })));
    }

    #[test]
    fn submission_payload_is_base64() {
        let p = SubmissionRequest { language_id: 71, source_code: STANDARD.encode("print(1)"), stdin: STANDARD.encode("") };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["language_id"], 71);
        assert_eq!(v["source_code"], "cHJpbnQoMSk=");
        assert_eq!(v["stdin"], "");
    }
}
