//! In-memory stand-ins for the external services, shared by the unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::QuestionRecord;
use crate::error::{AppError, AppResult};
use crate::ports::{
    AttachmentSink, BlobStore, ChatMessage, Completion, Judge, JudgeVerdict, ModelTier, RecordStore,
    ScriptOutput, ScriptRunner, SpeechSynth,
};

#[derive(Default)]
pub struct MemoryBlobs {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub fail_puts: bool,
}

impl MemoryBlobs {
    pub fn with_text(pairs: &[(String, &str)]) -> Self {
        let blobs = Self::default();
        {
            let mut objects = blobs.objects.lock().unwrap();
            for (k, v) in pairs {
                objects.insert(k.clone(), (v.as_bytes().to_vec(), "text/plain".into()));
            }
        }
        blobs
    }

    pub fn text(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(b, _)| String::from_utf8_lossy(b).into_owned())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().unwrap().get(key).map(|(_, ct)| ct.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> AppResult<String> {
        if self.fail_puts {
            return Err(AppError::Storage(format!("Failed to upload {}", key)));
        }
        self.objects.lock().unwrap().insert(key.to_string(), (body, content_type.to_string()));
        Ok(self.public_url(key))
    }

    async fn get(&self, key: &str) -> AppResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .map(|(b, _)| b.clone())
            .ok_or_else(|| AppError::NotFound(format!("Object {}", key)))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("https://bucket.test/{}", key)
    }
}

#[derive(Default)]
pub struct MemoryRecords {
    pub rows: Mutex<HashMap<String, QuestionRecord>>,
    pub fail_puts: bool,
    pub fail_counters: bool,
}

impl MemoryRecords {
    pub fn with(records: Vec<QuestionRecord>) -> Self {
        let store = Self::default();
        {
            let mut rows = store.rows.lock().unwrap();
            for r in records {
                rows.insert(r.question_id.clone(), r);
            }
        }
        store
    }

    pub fn row(&self, id: &str) -> Option<QuestionRecord> {
        self.rows.lock().unwrap().get(id).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecords {
    async fn put(&self, record: &QuestionRecord) -> AppResult<()> {
        if self.fail_puts {
            return Err(AppError::Storage("Error storing metadata in DynamoDB".into()));
        }
        self.rows.lock().unwrap().insert(record.question_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, question_id: &str) -> AppResult<Option<QuestionRecord>> {
        Ok(self.row(question_id))
    }

    async fn scan(&self) -> AppResult<Vec<QuestionRecord>> {
        let mut all: Vec<QuestionRecord> = self.rows.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.question_id.cmp(&b.question_id));
        Ok(all)
    }

    async fn record_submission(&self, question_id: &str, all_passed: bool) -> AppResult<()> {
        if self.fail_counters {
            return Err(AppError::Storage("counters unavailable".into()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(question_id)
            .ok_or_else(|| AppError::Storage("conditional check failed".into()))?;
        row.num_submissions += 1;
        if all_passed {
            row.successful_submissions += 1;
        }
        Ok(())
    }
}

/// Answers each completion with the response whose needle occurs in the system prompt.
pub struct ScriptedCompletion {
    pub responses: Vec<(&'static str, String)>,
    pub calls: Mutex<Vec<(ModelTier, Vec<ChatMessage>)>>,
}

impl ScriptedCompletion {
    pub fn new(responses: Vec<(&'static str, String)>) -> Self {
        Self { responses, calls: Mutex::new(Vec::new()) }
    }

    pub fn user_prompt_of(&self, system_needle: &str) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(_, m)| m[0].content.contains(system_needle))
            .map(|(_, m)| m[1].content.clone())
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, tier: ModelTier, messages: &[ChatMessage]) -> AppResult<String> {
        self.calls.lock().unwrap().push((tier, messages.to_vec()));
        let system = messages.first().map(|m| m.content.as_str()).unwrap_or_default();
        self.responses
            .iter()
            .find(|(needle, _)| system.contains(needle))
            .map(|(_, r)| r.clone())
            .ok_or_else(|| AppError::upstream("OpenAI", "HTTP 500: no scripted response"))
    }
}

#[derive(Default)]
pub struct FakeSpeech {
    pub fail: bool,
}

#[async_trait]
impl SpeechSynth for FakeSpeech {
    async fn synthesize(&self, text: &str) -> AppResult<Vec<u8>> {
        if self.fail {
            return Err(AppError::upstream("OpenAI", "HTTP 500: tts down"));
        }
        Ok(format!("MP3:{}", text.len()).into_bytes())
    }
}

#[derive(Default)]
pub struct FakeAttachments {
    pub uploaded: Mutex<Vec<String>>,
}

#[async_trait]
impl AttachmentSink for FakeAttachments {
    async fn upload_attachment(&self, file_name: &str, _bytes: Vec<u8>) -> AppResult<String> {
        let mut up = self.uploaded.lock().unwrap();
        up.push(file_name.to_string());
        Ok(format!("file-{}", up.len()))
    }
}

/// Runs "programs" as plain functions of stdin.
pub struct FakeJudge {
    pub program: fn(&str) -> Option<String>,
    /// 1-based submission number at which submit fails.
    pub fail_submit_at: Option<usize>,
    pub fail_fetch: bool,
    pub submissions: AtomicUsize,
    pending: Mutex<HashMap<String, String>>,
}

impl FakeJudge {
    pub fn new(program: fn(&str) -> Option<String>) -> Self {
        Self { program, fail_submit_at: None, fail_fetch: false, submissions: AtomicUsize::new(0), pending: Mutex::new(HashMap::new()) }
    }

    pub fn submitted(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Judge for FakeJudge {
    async fn submit(&self, _source_code: &str, _language_id: u32, stdin: &str) -> AppResult<String> {
        let n = self.submissions.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_submit_at == Some(n) {
            return Err(AppError::upstream("Judge0", "Failed to submit code to Judge0"));
        }
        let token = format!("tok-{}", n);
        self.pending.lock().unwrap().insert(token.clone(), stdin.to_string());
        Ok(token)
    }

    async fn fetch(&self, token: &str) -> AppResult<JudgeVerdict> {
        if self.fail_fetch {
            return Err(AppError::upstream("Judge0", "Failed to fetch result from Judge0"));
        }
        let stdin = self.pending.lock().unwrap().remove(token).unwrap_or_default();
        let stdout = (self.program)(&stdin);
        let (status, stderr) = match &stdout {
            Some(_) => ("Accepted", None),
            None => ("Runtime Error (NZEC)", Some("Traceback: boom\n".to_string())),
        };
        Ok(JudgeVerdict { stdout, stderr, compile_output: None, status: Some(status.into()) })
    }
}

/// Script runner that records invocations and answers with a function of stdin.
pub struct FakeRunner {
    pub program: fn(Option<&str>) -> Result<String, String>,
    pub runs: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeRunner {
    pub fn new(program: fn(Option<&str>) -> Result<String, String>) -> Self {
        Self { program, runs: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl ScriptRunner for FakeRunner {
    async fn run(&self, script: &Path, stdin: Option<&str>) -> AppResult<ScriptOutput> {
        let body = std::fs::read_to_string(script).unwrap_or_default();
        self.runs.lock().unwrap().push((body, stdin.map(str::to_string)));
        match (self.program)(stdin) {
            Ok(stdout) => Ok(ScriptOutput { stdout, stderr: String::new() }),
            Err(stderr) => Err(AppError::Script(stderr)),
        }
    }
}
