//! Minimal OpenAI client for our use-cases.
//!
//! We call chat.completions (plain text), files (attachment upload) and audio.speech (TTS).
//! Calls are instrumented and log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::{AppError, AppResult};
use crate::ports::{AttachmentSink, ChatMessage, Completion, ModelTier, SpeechSynth};

const SERVICE: &str = "OpenAI";
const UA: &str = "leetgen-backend/0.1";
/// audio.speech rejects inputs above 4096 characters.
const SPEECH_CHUNK_CHARS: usize = 4000;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
  pub tts_model: String,
  pub tts_voice: String,
}

impl OpenAI {
  /// Construct the client from the environment. OPENAI_API_KEY is required.
  pub fn from_env() -> AppResult<Self> {
    let api_key = std::env::var("OPENAI_API_KEY")
      .map_err(|_| AppError::Config("OPENAI_API_KEY is not set".into()))?;
    let var = |k: &str, d: &str| std::env::var(k).unwrap_or_else(|_| d.to_string());
    let timeout_secs: u64 = var("OPENAI_TIMEOUT_SECS", "120")
      .parse()
      .map_err(|e| AppError::Config(format!("OPENAI_TIMEOUT_SECS: {e}")))?;

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .build()
      .map_err(|e| AppError::Config(format!("HTTP client: {e}")))?;

    Ok(Self {
      client,
      api_key,
      base_url: var("OPENAI_BASE_URL", "https://api.openai.com/v1"),
      fast_model: var("OPENAI_FAST_MODEL", "gpt-4o-mini"),
      strong_model: var("OPENAI_STRONG_MODEL", "gpt-4o"),
      tts_model: var("OPENAI_TTS_MODEL", "tts-1"),
      tts_voice: var("OPENAI_TTS_VOICE", "alloy"),
    })
  }

  fn model(&self, tier: ModelTier) -> &str {
    match tier {
      ModelTier::Fast => &self.fast_model,
      ModelTier::Strong => &self.strong_model,
    }
  }

  /// Plain-text chat completion over a role-tagged message list.
  #[instrument(level = "info", skip(self, messages), fields(model = %model, n_messages = messages.len()))]
  async fn chat_plain(&self, model: &str, messages: &[ChatMessage], temperature: f32) -> AppResult<String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest { model, messages, temperature };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;
    let res = ensure_success(res).await?;

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| AppError::upstream(SERVICE, format!("unreadable completion: {e}")))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }

  #[instrument(level = "info", skip(self, text), fields(model = %self.tts_model, text_len = text.len()))]
  async fn speech_chunk(&self, text: &str) -> AppResult<Vec<u8>> {
    let url = format!("{}/audio/speech", self.base_url);
    let req = SpeechRequest {
      model: &self.tts_model,
      input: text,
      voice: &self.tts_voice,
      response_format: "mp3",
    };
    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;
    let res = ensure_success(res).await?;
    let bytes = res.bytes().await.map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;
    Ok(bytes.to_vec())
  }
}

#[async_trait]
impl Completion for OpenAI {
  async fn complete(&self, tier: ModelTier, messages: &[ChatMessage]) -> AppResult<String> {
    self.chat_plain(self.model(tier), messages, 0.7).await
  }
}

#[async_trait]
impl SpeechSynth for OpenAI {
  /// Long dialogues are synthesized in chunks; MP3 frames concatenate cleanly.
  async fn synthesize(&self, text: &str) -> AppResult<Vec<u8>> {
    let mut audio = Vec::new();
    for chunk in chunk_for_speech(text, SPEECH_CHUNK_CHARS) {
      audio.extend(self.speech_chunk(&chunk).await?);
    }
    info!(audio_bytes = audio.len(), "Speech synthesized");
    Ok(audio)
  }
}

#[async_trait]
impl AttachmentSink for OpenAI {
  #[instrument(level = "info", skip(self, bytes), fields(%file_name, size = bytes.len()))]
  async fn upload_attachment(&self, file_name: &str, bytes: Vec<u8>) -> AppResult<String> {
    #[derive(Deserialize)]
    struct Uploaded { id: String }

    let url = format!("{}/files", self.base_url);
    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
    let form = reqwest::multipart::Form::new()
      .text("purpose", "assistants")
      .part("file", part);

    let res = self.client.post(&url)
      .header(USER_AGENT, UA)
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .multipart(form).send().await
      .map_err(|e| AppError::upstream(SERVICE, e.to_string()))?;
    let res = ensure_success(res).await?;
    let up: Uploaded = res.json().await
      .map_err(|e| AppError::upstream(SERVICE, format!("unreadable upload response: {e}")))?;
    info!(file_id = %up.id, "Attachment uploaded");
    Ok(up.id)
  }
}

/// Turn a non-2xx response into an upstream error carrying the provider's message.
async fn ensure_success(res: reqwest::Response) -> AppResult<reqwest::Response> {
  if res.status().is_success() {
    return Ok(res);
  }
  let status = res.status();
  let body = res.text().await.unwrap_or_default();
  let msg = extract_openai_error(&body).unwrap_or(body);
  error!(%status, "OpenAI call failed");
  Err(AppError::upstream(SERVICE, format!("HTTP {}: {}", status, msg)))
}

/// Split text on line boundaries into pieces of at most `max` characters.
/// A single line longer than `max` is hard-split.
fn chunk_for_speech(text: &str, max: usize) -> Vec<String> {
  let mut chunks = Vec::new();
  let mut cur = String::new();
  let mut cur_chars = 0usize;
  for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
    let mut rest: Vec<char> = line.chars().collect();
    while !rest.is_empty() {
      let room = if cur_chars == 0 { max } else { max.saturating_sub(cur_chars + 1) };
      if rest.len() <= room {
        if cur_chars > 0 { cur.push('\n'); cur_chars += 1; }
        cur_chars += rest.len();
        cur.extend(rest.drain(..));
      } else if cur_chars > 0 {
        chunks.push(std::mem::take(&mut cur));
        cur_chars = 0;
      } else {
        let head: String = rest.drain(..max).collect();
        chunks.push(head);
      }
    }
  }
  if !cur.is_empty() {
    chunks.push(cur);
  }
  chunks
}

// --- DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: &'a [ChatMessage],
  temperature: f32,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
  model: &'a str,
  input: &'a str,
  voice: &'a str,
  response_format: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
