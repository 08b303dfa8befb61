//! Question-generation pipeline.
//!
//! description (+ attachment ids) → question text → metadata → HTML document + metadata record
//! → test-case script → reference solution → interview dialogue → audio.
//!
//! Stages run strictly in order; the first error aborts the run, except the metadata record
//! write, whose outcome is only reported. Nothing written by earlier stages is rolled back,
//! and every run allocates a fresh question id.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::config::Prompts;
use crate::document::{render_html, split_sections};
use crate::domain::{QuestionMetadata, QuestionRecord, QuestionSections};
use crate::error::{AppError, AppResult};
use crate::layout;
use crate::metadata::parse_metadata;
use crate::ports::{BlobStore, ChatMessage, Completion, ModelTier, RecordStore, SpeechSynth};
use crate::util::{fill_template, trunc_for_log, unwrap_code};

/// Input of one generation run.
#[derive(Clone, Debug, Serialize)]
pub struct GenerationRequest {
  pub description: String,
  /// Opaque file ids returned by the completion provider for user attachments.
  pub attachment_ids: Vec<String>,
}

/// Everything a successful run produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
  pub question_id: String,
  /// Raw question text as returned by the model.
  pub generated_question: String,
  pub document_url: String,
  pub metadata: QuestionMetadata,
  pub meta_data_stored: bool,
  pub test_case_script_url: String,
  pub tester_solution_url: String,
  pub audio_url: String,
}

/// The generation pipeline with its collaborators, constructed once per worker pool.
pub struct Generator {
  pub completion: Arc<dyn Completion>,
  pub speech: Arc<dyn SpeechSynth>,
  pub blobs: Arc<dyn BlobStore>,
  pub records: Arc<dyn RecordStore>,
  pub prompts: Prompts,
  pub bucket: String,
  pub uploaded_by: String,
  pub test_case_count: usize,
}

impl Generator {
  #[instrument(level = "info", skip(self, req), fields(description_len = req.description.len(), attachments = req.attachment_ids.len()))]
  pub async fn run(&self, req: &GenerationRequest) -> AppResult<GenerationReport> {
    if req.description.trim().is_empty() {
      return Err(AppError::InvalidInput("description must not be empty".into()));
    }

    let question = self.generate_question(&req.description, &req.attachment_ids).await?;
    let metadata_block = self.generate_metadata(&question).await?;
    let metadata = parse_metadata(&metadata_block);
    info!(target: "generation", title = %metadata.title, company = %metadata.company, difficulty = %metadata.difficulty, "Metadata parsed");

    let question_id = Uuid::new_v4().to_string();
    let sections = split_sections(&question);
    let html = render_html(&question_id, &sections);

    let document_url = self
      .blobs
      .put(&layout::document_key(&question_id), html.into_bytes(), "text/html")
      .await?;
    info!(target: "generation", %question_id, %document_url, "Question document stored");

    let meta_data_stored = match self
      .records
      .put(&QuestionRecord::new(&question_id, &metadata, &self.uploaded_by))
      .await
    {
      Ok(()) => {
        info!(target: "generation", %question_id, "Metadata record stored");
        true
      }
      Err(e) => {
        error!(target: "generation", %question_id, error = %e, "Metadata record not stored; continuing");
        false
      }
    };

    let script = self.generate_test_case_script(&question_id, &sections).await?;
    let test_case_script_url = self
      .blobs
      .put(&layout::test_case_script_key(&question_id), script.into_bytes(), "text/x-python")
      .await?;

    let solution = self.generate_solution(&question).await?;
    let tester_solution_url = self
      .blobs
      .put(&layout::tester_solution_key(&question_id), solution.into_bytes(), "text/x-python")
      .await?;
    info!(target: "generation", %question_id, "Test-case script and reference solution stored");

    let dialogue = self.generate_interview(&question).await?;
    let audio = self.speech.synthesize(&dialogue).await?;
    let audio_url = self
      .blobs
      .put(&layout::audio_key(&question_id), audio, "audio/mpeg")
      .await?;
    info!(target: "generation", %question_id, %audio_url, "Interview audio stored");

    Ok(GenerationReport {
      question_id,
      generated_question: question,
      document_url,
      metadata,
      meta_data_stored,
      test_case_script_url,
      tester_solution_url,
      audio_url,
    })
  }

  async fn ask(&self, tier: ModelTier, system: &str, user: String) -> AppResult<String> {
    let messages = [ChatMessage::system(system), ChatMessage::user(user)];
    self.completion.complete(tier, &messages).await
  }

  async fn generate_question(&self, description: &str, attachment_ids: &[String]) -> AppResult<String> {
    let attachments = if attachment_ids.is_empty() {
      String::new()
    } else {
      let file_lines: String = attachment_ids.iter().map(|id| format!("File ID: {}\n", id)).collect();
      fill_template(&self.prompts.attachments_template, &[("file_lines", file_lines.as_str())])
    };
    let user = fill_template(
      &self.prompts.question_user_template,
      &[("description", description), ("attachments", attachments.as_str())],
    );
    let question = self.ask(ModelTier::Strong, &self.prompts.question_system, user).await?;
    info!(target: "generation", question_len = question.len(), preview = %trunc_for_log(&question, 80), "Question text generated");
    Ok(question)
  }

  async fn generate_metadata(&self, question: &str) -> AppResult<String> {
    let user = fill_template(&self.prompts.metadata_user_template, &[("question", question)]);
    self.ask(ModelTier::Strong, &self.prompts.metadata_system, user).await
  }

  async fn generate_test_case_script(&self, question_id: &str, sections: &QuestionSections) -> AppResult<String> {
    let count = self.test_case_count.to_string();
    let prefix = layout::input_prefix(question_id);
    let user = fill_template(
      &self.prompts.test_case_script_user_template,
      &[
        ("count", count.as_str()),
        ("input_format", sections.input_format.as_str()),
        ("constraints", sections.constraints.as_str()),
        ("question_id", question_id),
        ("bucket", self.bucket.as_str()),
        ("input_prefix", prefix.as_str()),
      ],
    );
    let raw = self.ask(ModelTier::Fast, &self.prompts.test_case_script_system, user).await?;
    Ok(unwrap_code(&raw))
  }

  async fn generate_solution(&self, question: &str) -> AppResult<String> {
    let user = fill_template(&self.prompts.solution_user_template, &[("question", question)]);
    let raw = self.ask(ModelTier::Fast, &self.prompts.solution_system, user).await?;
    Ok(unwrap_code(&raw))
  }

  async fn generate_interview(&self, question: &str) -> AppResult<String> {
    let user = fill_template(&self.prompts.interview_user_template, &[("question", question)]);
    let dialogue = self.ask(ModelTier::Strong, &self.prompts.interview_system, user).await?;
    info!(target: "generation", dialogue_len = dialogue.len(), "Interview dialogue generated");
    Ok(dialogue)
  }
}
