//! LeetCode AI · question generation and grading server
//!
//! - Axum HTTP API
//! - OpenAI for question text, scripts, solutions, dialogue and speech
//! - S3 for artifacts, DynamoDB for question metadata, Judge0 for grading
//! - Static frontend fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                     : u16 (default 3000)
//!   OPENAI_API_KEY           : required
//!   OPENAI_BASE_URL          : default "https://api.openai.com/v1"
//!   AWS_REGION               : default "us-east-1"
//!   AWS_STORAGE_BUCKET_NAME  : default "leetcode-ai-problems"
//!   QUESTIONS_TABLE          : default "leetcode-ai-questions"
//!   RAPIDAPI_KEY             : Judge0 RapidAPI key
//!   TEST_CASE_COUNT          : default 10
//!   JOB_RETENTION_SECS       : how long finished jobs stay queryable (default 3600)
//!   PROMPTS_CONFIG_PATH      : path to TOML prompt overrides
//!   LOG_LEVEL                : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT               : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use leetgen::config::{load_prompts_from_env, Settings};
use leetgen::jobs::JobQueue;
use leetgen::judge::Judge0;
use leetgen::openai::OpenAI;
use leetgen::pipeline::Generator;
use leetgen::ports::{BlobStore, RecordStore};
use leetgen::records::DynamoRecords;
use leetgen::routes::build_router;
use leetgen::state::AppState;
use leetgen::storage::S3Storage;
use leetgen::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  dotenvy::dotenv().ok();
  telemetry::init_tracing();

  let settings = Settings::from_env()?;
  let prompts = load_prompts_from_env();

  let openai = Arc::new(OpenAI::from_env()?);
  info!(target: "leetgen", base_url = %openai.base_url, fast_model = %openai.fast_model, strong_model = %openai.strong_model, "OpenAI enabled.");

  let blobs: Arc<dyn BlobStore> = Arc::new(S3Storage::new(&settings).await);
  let records: Arc<dyn RecordStore> = Arc::new(DynamoRecords::new(&settings).await);
  if settings.rapidapi_key.is_none() {
    warn!(target: "leetgen", "RAPIDAPI_KEY not set; Judge0 calls will likely be rejected");
  }
  let judge = Arc::new(Judge0::new(&settings)?);

  let generator = Generator {
    completion: openai.clone(),
    speech: openai.clone(),
    blobs: blobs.clone(),
    records: records.clone(),
    prompts,
    bucket: settings.bucket.clone(),
    uploaded_by: settings.uploaded_by.clone(),
    test_case_count: settings.test_case_count,
  };
  let jobs = JobQueue::start(
    Arc::new(generator),
    settings.generation_workers,
    settings.generation_queue_capacity,
    chrono::Duration::seconds(settings.job_retention_secs as i64),
  );

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let state = Arc::new(AppState::new(settings, blobs, records, judge, openai, jobs));
  let app = build_router(state);

  let listener = TcpListener::bind(addr).await?;
  info!(target: "leetgen", %addr, "HTTP server listening");
  axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "leetgen", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "leetgen", "Shutdown signal received");
}
