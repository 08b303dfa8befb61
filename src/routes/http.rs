//! HTTP endpoint handlers. These are thin wrappers that forward to the catalog, grader and queue.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
  body::Bytes,
  extract::{Multipart, Path, Query, State},
  http::{header, HeaderValue, StatusCode},
  response::{IntoResponse, Response},
  Json,
};
use tracing::{info, instrument, warn};

use crate::catalog::{AudioPage, QuestionDetail, UploaderListing};
use crate::domain::Language;
use crate::error::{AppError, AppResult};
use crate::pipeline::GenerationRequest;
use crate::protocol::*;
use crate::state::AppState;

/// Where the browser lands after submitting the creation form.
pub const AFTER_CREATE: &str = "/problems_ui/user_problems";

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state))]
pub async fn http_get_problem(
  State(state): State<Arc<AppState>>,
  Path(question_id): Path<String>,
) -> AppResult<Json<QuestionDetail>> {
  let detail = state.catalog.detail(&question_id).await?;
  info!(target: "leetgen", %question_id, has_html = detail.html_content.is_some(), "HTTP problem detail served");
  Ok(Json(detail))
}

#[instrument(level = "info", skip(state, body), fields(body_len = body.len()))]
pub async fn http_post_run_code(
  State(state): State<Arc<AppState>>,
  Path(question_id): Path<String>,
  body: Bytes,
) -> AppResult<Json<RunCodeOut>> {
  let req: RunCodeIn = serde_json::from_slice(&body).map_err(|e| {
    warn!(target: "grading", %question_id, error = %e, "Unparseable run_code body");
    AppError::InvalidInput("Invalid request body".into())
  })?;
  let language = Language::from_tag(req.language.as_deref());
  let test_case_results = state.grader.grade(&question_id, &req.source_code, language).await?;
  info!(target: "grading", %question_id, ?language, cases = test_case_results.len(), "HTTP run_code graded");
  Ok(Json(RunCodeOut { test_case_results }))
}

/// Accepts the creation form, uploads attachments, queues generation and redirects.
#[instrument(level = "info", skip(state, form))]
pub async fn http_post_create_question(
  State(state): State<Arc<AppState>>,
  mut form: Multipart,
) -> AppResult<Response> {
  let mut description = String::new();
  let mut attachment_ids = Vec::new();

  while let Some(field) = form.next_field().await.map_err(|e| AppError::InvalidInput(format!("Invalid form: {}", e)))? {
    match field.name() {
      Some("description") => {
        description = field.text().await.map_err(|e| AppError::InvalidInput(format!("Invalid description: {}", e)))?;
      }
      Some("attachments") => {
        let file_name = field.file_name().unwrap_or("attachment").to_string();
        let bytes = field.bytes().await.map_err(|e| AppError::InvalidInput(format!("Invalid attachment: {}", e)))?;
        if bytes.is_empty() {
          continue;
        }
        let id = state.attachments.upload_attachment(&file_name, bytes.to_vec()).await?;
        info!(target: "generation", %file_name, %id, "Attachment uploaded");
        attachment_ids.push(id);
      }
      other => {
        warn!(target: "leetgen", field = ?other, "Ignoring unknown form field");
      }
    }
  }

  if description.trim().is_empty() {
    return Err(AppError::InvalidInput("Problem description is required".into()));
  }

  let job_id = state.jobs.enqueue(GenerationRequest { description, attachment_ids }).await?;
  let status_url = format!("/questions/jobs/{}", job_id);
  let job_header = HeaderValue::from_str(&job_id).map_err(|e| AppError::Queue(e.to_string()))?;

  let mut resp = (
    StatusCode::SEE_OTHER,
    [(header::LOCATION, HeaderValue::from_static(AFTER_CREATE))],
    Json(CreateOut { job_id, status_url }),
  )
    .into_response();
  resp.headers_mut().insert("x-job-id", job_header);
  Ok(resp)
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_job(
  State(state): State<Arc<AppState>>,
  Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
  match state.jobs.status(&job_id).await {
    Some(status) => Ok(Json(status)),
    None => Err(AppError::NotFound(format!("Job {}", job_id))),
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_all_problems(State(state): State<Arc<AppState>>) -> AppResult<Json<ProblemsOut>> {
  let problems = state.catalog.list_all().await?;
  info!(target: "leetgen", count = problems.len(), "HTTP all problems served");
  Ok(Json(ProblemsOut { problems }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_user_problems(
  State(state): State<Arc<AppState>>,
  Query(q): Query<UploaderQuery>,
) -> AppResult<Json<UploaderListing>> {
  let uploader = q.uploaded_by.unwrap_or_else(|| state.settings.uploaded_by.clone());
  let listing = state.catalog.list_uploaded_by(&uploader).await?;
  info!(target: "leetgen", %uploader, count = listing.problems.len(), processing = listing.processing_problems.len(), "HTTP user problems served");
  Ok(Json(listing))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_audio(State(state): State<Arc<AppState>>) -> AppResult<Json<AudioPage>> {
  Ok(Json(state.catalog.random_audio().await?))
}
