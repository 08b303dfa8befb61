//! Object-store notification handler.
//!
//! Reads one S3 event (JSON) from the file named by the first argument, or from stdin, runs
//! the job the uploaded key triggers and prints a `{statusCode, body}` reply on stdout.
//! Exits non-zero when the reply is not 200.

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::{error, info};

use leetgen::batch::{parse_event, BatchJobs, ProcessRunner};
use leetgen::config::Settings;
use leetgen::storage::S3Storage;
use leetgen::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let settings = Settings::from_env()?;
    let raw = match std::env::args().nth(1) {
        Some(path) => tokio::fs::read_to_string(&path).await?,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            buf
        }
    };
    let event: serde_json::Value = serde_json::from_str(&raw)?;

    // Objects are read from and written to the bucket that sent the notification.
    let storage = S3Storage::new(&settings).await;
    let storage = match parse_event(&event) {
        Ok(object) => storage.with_bucket(&object.bucket),
        Err(_) => storage,
    };

    let jobs = BatchJobs {
        blobs: Arc::new(storage),
        runner: Arc::new(ProcessRunner { interpreter: settings.script_interpreter.clone() }),
        test_case_count: settings.test_case_count,
    };
    let reply = jobs.handle(&event).await;
    println!("{}", serde_json::to_string(&reply)?);

    if reply.status_code == 200 {
        info!(target: "batch", "Batch run finished");
        Ok(())
    } else {
        error!(target: "batch", status = reply.status_code, body = %reply.body, "Batch run failed");
        std::process::exit(1);
    }
}
