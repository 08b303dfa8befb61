//! Seams to the external services. The pipelines only talk to these traits; `main` and the
//! batch binary wire in the network-backed implementations.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, warn};

use crate::domain::QuestionRecord;
use crate::error::{AppError, AppResult};

/// Which model a completion runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Strong,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".into(), content: content.into() }
    }
}

#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, tier: ModelTier, messages: &[ChatMessage]) -> AppResult<String>;
}

#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Synthesize `text` to MP3 bytes.
    async fn synthesize(&self, text: &str) -> AppResult<Vec<u8>>;
}

#[async_trait]
pub trait AttachmentSink: Send + Sync {
    /// Hand a user attachment to the completion provider; returns its opaque file id.
    async fn upload_attachment(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String>;
}

/// What the judge reported for one run. Streams are already decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JudgeVerdict {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: Option<String>,
}

#[async_trait]
pub trait Judge: Send + Sync {
    /// Submit one run; returns the submission token.
    async fn submit(&self, source_code: &str, language_id: u32, stdin: &str) -> AppResult<String>;
    async fn fetch(&self, token: &str) -> AppResult<JudgeVerdict>;
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an object and return its public URL.
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> AppResult<String>;

    /// Read an object. A missing key is `AppError::NotFound`.
    async fn get(&self, key: &str) -> AppResult<Vec<u8>>;

    async fn exists(&self, key: &str) -> AppResult<bool>;

    fn public_url(&self, key: &str) -> String;

    /// Read an object as UTF-8 text. Failures are logged and reported as `None`,
    /// leaving the caller to decide whether absence is fatal.
    async fn fetch_text(&self, key: &str) -> Option<String> {
        match self.get(key).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Some(text),
                Err(e) => {
                    error!(target: "storage", %key, error = %e, "Object is not valid UTF-8");
                    None
                }
            },
            Err(AppError::NotFound(_)) => {
                warn!(target: "storage", %key, "Object not found");
                None
            }
            Err(e) => {
                error!(target: "storage", %key, error = %e, "Error fetching object");
                None
            }
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Unconditional write; an existing record with the same id is overwritten.
    async fn put(&self, record: &QuestionRecord) -> AppResult<()>;
    async fn get(&self, question_id: &str) -> AppResult<Option<QuestionRecord>>;
    async fn scan(&self) -> AppResult<Vec<QuestionRecord>>;
    /// Count one submission, and one successful submission when `all_passed`.
    async fn record_submission(&self, question_id: &str, all_passed: bool) -> AppResult<()>;
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run a script file, feeding `stdin` when given. A non-zero exit is `AppError::Script`.
    async fn run(&self, script: &std::path::Path, stdin: Option<&str>) -> AppResult<ScriptOutput>;
}
