//! Offline jobs fed by object-store "new object" notifications.
//!
//! An uploaded test-case script is executed (it uploads its own inputs); once the last input
//! lands, the stored reference solution is run on every input to produce the expected outputs.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{error, info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::layout;
use crate::ports::{BlobStore, ScriptOutput, ScriptRunner};
use crate::util::trunc_for_log;

/// Bucket and key of the object that triggered the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEvent {
    pub bucket: String,
    pub key: String,
}

/// Lambda-style reply printed by the batch binary.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct BatchReply {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl BatchReply {
    fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self { status_code, body: body.into() }
    }
}

/// Which job a key triggers.
#[derive(Debug, PartialEq, Eq)]
pub enum Trigger {
    GenerateTestCases(String),
    GenerateExpectedOutputs(String),
    Ignore,
}

/// Pull bucket and key out of the first record of an S3 event.
pub fn parse_event(event: &Value) -> AppResult<ObjectEvent> {
    let s3 = &event["Records"][0]["s3"];
    let bucket = s3["bucket"]["name"].as_str();
    let key = s3["object"]["key"].as_str();
    match (bucket, key) {
        (Some(bucket), Some(key)) if !key.is_empty() => {
            Ok(ObjectEvent { bucket: bucket.to_string(), key: key.to_string() })
        }
        _ => Err(AppError::InvalidInput("Failed to process event.".into())),
    }
}

pub fn classify(key: &str, test_case_count: usize) -> Trigger {
    let Some(question_id) = layout::question_id_of(key) else {
        return Trigger::Ignore;
    };
    if key == layout::test_case_script_key(question_id) {
        Trigger::GenerateTestCases(question_id.to_string())
    } else if key == layout::input_key(question_id, test_case_count) {
        Trigger::GenerateExpectedOutputs(question_id.to_string())
    } else {
        Trigger::Ignore
    }
}

pub struct BatchJobs {
    pub blobs: Arc<dyn BlobStore>,
    pub runner: Arc<dyn ScriptRunner>,
    pub test_case_count: usize,
}

impl BatchJobs {
    /// Route one notification to its job and summarize the result.
    pub async fn handle(&self, event: &Value) -> BatchReply {
        let object = match parse_event(event) {
            Ok(o) => o,
            Err(e) => {
                warn!(target: "batch", error = %e, "Malformed object event");
                return BatchReply::new(400, "Failed to process event.");
            }
        };
        info!(target: "batch", bucket = %object.bucket, key = %object.key, "Object event received");

        let outcome = match classify(&object.key, self.test_case_count) {
            Trigger::GenerateTestCases(id) => self
                .generate_test_cases(&id)
                .await
                .map(|_| "Test cases generated and uploaded to S3 successfully!".to_string()),
            Trigger::GenerateExpectedOutputs(id) => self.generate_expected_outputs(&id).await.map(|n| {
                format!("All {} test cases executed successfully and outputs saved to S3.", n)
            }),
            Trigger::Ignore => {
                info!(target: "batch", key = %object.key, "Key does not trigger a job");
                Ok(format!("Ignored {}", object.key))
            }
        };

        match outcome {
            Ok(body) => BatchReply::new(200, body),
            Err(e) => BatchReply::new(e.status_code().as_u16(), e.to_string()),
        }
    }

    /// Download and execute the question's test-case generating script.
    #[instrument(level = "info", skip(self))]
    pub async fn generate_test_cases(&self, question_id: &str) -> AppResult<()> {
        let workdir = tempfile::tempdir()?;
        let script = workdir.path().join(layout::TEST_CASE_SCRIPT);
        self.download(&layout::test_case_script_key(question_id), &script).await?;

        let out = self.runner.run(&script, None).await?;
        info!(target: "batch", %question_id, stdout = %trunc_for_log(&out.stdout, 400), "Test-case script finished");
        Ok(())
    }

    /// Run the reference solution on every stored input and upload the outputs.
    /// Returns the number of outputs written.
    #[instrument(level = "info", skip(self))]
    pub async fn generate_expected_outputs(&self, question_id: &str) -> AppResult<usize> {
        let workdir = tempfile::tempdir()?;
        let script = workdir.path().join(layout::TESTER_SOLUTION);
        self.download(&layout::tester_solution_key(question_id), &script).await?;

        for i in 1..=self.test_case_count {
            let input = self.blobs.get(&layout::input_key(question_id, i)).await.map_err(|e| match e {
                AppError::NotFound(_) => AppError::MissingTestCase(i),
                other => other,
            })?;
            let input = String::from_utf8_lossy(&input);

            let out = self.runner.run(&script, Some(&input)).await.map_err(|e| {
                error!(target: "batch", %question_id, test_case = i, error = %e, "Solution run failed");
                AppError::Script(format!("Error running solution for test case {}: {}", i, e))
            })?;
            self.blobs
                .put(&layout::output_key(question_id, i), out.stdout.trim().as_bytes().to_vec(), "text/plain")
                .await?;
            info!(target: "batch", %question_id, test_case = i, "Expected output stored");
        }
        Ok(self.test_case_count)
    }

    async fn download(&self, key: &str, dest: &Path) -> AppResult<()> {
        let body = self.blobs.get(key).await?;
        tokio::fs::write(dest, body).await?;
        info!(target: "batch", %key, dest = %dest.display(), "Downloaded script");
        Ok(())
    }
}

/// Runs scripts as child processes of the configured interpreter, inside the script's directory.
pub struct ProcessRunner {
    pub interpreter: String,
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn run(&self, script: &Path, stdin: Option<&str>) -> AppResult<ScriptOutput> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(script)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = script.parent() {
            cmd.current_dir(dir);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| AppError::Script(format!("failed to start {}: {}", self.interpreter, e)))?;
        // Stdin is fed while stdout/stderr drain; writing it all first deadlocks once the
        // script fills its output pipe.
        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                match pipe.write_all(input.as_bytes()).await {
                    // The script may exit without reading all of its input.
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => other?,
                }
                // Dropping the pipe closes stdin so the script sees EOF.
            }
            Ok::<(), std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(AppError::Script(if stderr.trim().is_empty() {
                format!("{} exited with {}", script.display(), output.status)
            } else {
                stderr
            }));
        }
        Ok(ScriptOutput { stdout, stderr })
    }
}
