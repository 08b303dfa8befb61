//! Grading pipeline: run a submission against a question's stored test cases, one at a time.
//!
//! Any missing test case or judge failure aborts the whole request; results collected for
//! earlier cases are discarded.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::domain::{Language, Outcome, TestCaseResult};
use crate::error::{AppError, AppResult};
use crate::layout;
use crate::ports::{BlobStore, Judge, RecordStore};

/// Reported as the actual output when the run produced no stdout.
pub const NO_OUTPUT: &str = "No output or Runtime Error";
/// Editor placeholder removed from the start of submissions.
const PLACEHOLDER: &str = "# Write your code here";

pub struct Grader {
  pub judge: Arc<dyn Judge>,
  pub blobs: Arc<dyn BlobStore>,
  pub records: Arc<dyn RecordStore>,
  pub test_case_count: usize,
}

impl Grader {
  #[instrument(level = "info", skip(self, source_code), fields(code_len = source_code.len()))]
  pub async fn grade(&self, question_id: &str, source_code: &str, language: Language) -> AppResult<Vec<TestCaseResult>> {
    let source = strip_placeholder(source_code);
    let language_id = language.judge_id();
    let mut results = Vec::with_capacity(self.test_case_count);

    for i in 1..=self.test_case_count {
      let input = self.blobs.fetch_text(&layout::input_key(question_id, i)).await;
      let expected = self.blobs.fetch_text(&layout::output_key(question_id, i)).await;
      let (Some(input), Some(expected)) = (input, expected) else {
        error!(target: "grading", %question_id, test_case = i, "Test case missing in S3");
        return Err(AppError::MissingTestCase(i));
      };

      let token = self.judge.submit(&source, language_id, &input).await?;
      let verdict = self.judge.fetch(&token).await?;

      // Only a missing or empty stream is "no output"; whitespace-only output trims to "".
      let actual = match verdict.stdout.as_deref() {
        Some(out) if !out.is_empty() => out.trim().to_string(),
        _ => {
          warn!(target: "grading", %question_id, test_case = i, "No stdout from run");
          NO_OUTPUT.to_string()
        }
      };
      let expected = expected.trim().to_string();
      let result = if actual == expected { Outcome::Passed } else { Outcome::Failed };

      results.push(TestCaseResult {
        test_case: i,
        input,
        expected,
        actual,
        status: verdict.status.unwrap_or_else(|| "Unknown".into()),
        stderr: verdict.stderr.or(verdict.compile_output).unwrap_or_default(),
        result,
      });
    }

    let all_passed = results.iter().all(|r| r.result == Outcome::Passed);
    info!(target: "grading", %question_id, passed = results.iter().filter(|r| r.result == Outcome::Passed).count(), total = results.len(), "All test cases processed");

    if let Err(e) = self.records.record_submission(question_id, all_passed).await {
      error!(target: "grading", %question_id, error = %e, "Failed to update submission counters");
    }
    Ok(results)
  }
}

fn strip_placeholder(source: &str) -> String {
  let source = source.trim();
  match source.strip_prefix(PLACEHOLDER) {
    Some(rest) => rest.trim().to_string(),
    None => source.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::QuestionRecord;
  use crate::fakes::{FakeJudge, MemoryBlobs, MemoryRecords};

  fn stored_cases(id: &str, n: usize) -> Vec<(String, &'static str)> {
    let mut v = Vec::new();
    for i in 1..=n {
      v.push((layout::input_key(id, i), "3 4\n"));
      v.push((layout::output_key(id, i), "7\n"));
    }
    v
  }

  fn adder(stdin: &str) -> Option<String> {
    let sum: i64 = stdin.split_whitespace().filter_map(|t| t.parse::<i64>().ok()).sum();
    Some(format!("{}\n", sum))
  }

  fn grader(judge: FakeJudge, blobs: MemoryBlobs, records: Arc<MemoryRecords>, n: usize) -> Grader {
    Grader { judge: Arc::new(judge), blobs: Arc::new(blobs), records, test_case_count: n }
  }

  fn record(id: &str) -> QuestionRecord {
    QuestionRecord { question_id: id.into(), uploaded_by: "sid".into(), ..Default::default() }
  }

  #[tokio::test]
  async fn matching_output_passes_every_case() {
    let records = Arc::new(MemoryRecords::with(vec![record("q")]));
    let g = grader(FakeJudge::new(adder), MemoryBlobs::with_text(&stored_cases("q", 10)), records.clone(), 10);

    let results = g.grade("q", "print(sum(...))", Language::Python).await.unwrap();
    assert_eq!(results.len(), 10);
    assert!(results.iter().all(|r| r.result == Outcome::Passed));
    assert_eq!(results[0].test_case, 1);
    assert_eq!(results[9].test_case, 10);
    assert_eq!(results[0].actual, "7");
    assert_eq!(results[0].expected, "7");
    assert_eq!(results[0].input, "3 4\n");
    assert_eq!(results[0].status, "Accepted");

    let row = records.row("q").unwrap();
    assert_eq!((row.num_submissions, row.successful_submissions), (1, 1));
  }

  #[tokio::test]
  async fn mismatch_fails_and_keeps_both_outputs() {
    fn wrong(_: &str) -> Option<String> { Some("8\n".into()) }
    let records = Arc::new(MemoryRecords::with(vec![record("q")]));
    let g = grader(FakeJudge::new(wrong), MemoryBlobs::with_text(&stored_cases("q", 2)), records.clone(), 2);

    let results = g.grade("q", "print(8)", Language::Python).await.unwrap();
    assert!(results.iter().all(|r| r.result == Outcome::Failed));
    assert_eq!(results[1].actual, "8");
    assert_eq!(results[1].expected, "7");

    let row = records.row("q").unwrap();
    assert_eq!((row.num_submissions, row.successful_submissions), (1, 0));
  }

  #[tokio::test]
  async fn missing_stdout_reports_sentinel_and_stderr() {
    fn crash(_: &str) -> Option<String> { None }
    let g = grader(FakeJudge::new(crash), MemoryBlobs::with_text(&stored_cases("q", 1)), Arc::new(MemoryRecords::default()), 1);

    let results = g.grade("q", "raise", Language::Python).await.unwrap();
    assert_eq!(results[0].actual, NO_OUTPUT);
    assert_eq!(results[0].result, Outcome::Failed);
    assert_eq!(results[0].stderr, "Traceback: boom\n");
    assert_eq!(results[0].status, "Runtime Error (NZEC)");
  }

  #[tokio::test]
  async fn whitespace_only_output_matches_empty_expected() {
    fn newline(_: &str) -> Option<String> { Some("\n".into()) }
    let blobs = MemoryBlobs::with_text(&[(layout::input_key("q", 1), "0"), (layout::output_key("q", 1), "")]);
    let g = grader(FakeJudge::new(newline), blobs, Arc::new(MemoryRecords::default()), 1);

    let results = g.grade("q", "print()", Language::Python).await.unwrap();
    assert_eq!(results[0].actual, "");
    assert_eq!(results[0].expected, "");
    assert_eq!(results[0].result, Outcome::Passed);
  }

  #[tokio::test]
  async fn empty_stdout_reports_sentinel() {
    fn silent(_: &str) -> Option<String> { Some(String::new()) }
    let g = grader(FakeJudge::new(silent), MemoryBlobs::with_text(&stored_cases("q", 1)), Arc::new(MemoryRecords::default()), 1);
    let results = g.grade("q", "pass", Language::Python).await.unwrap();
    assert_eq!(results[0].actual, NO_OUTPUT);
  }

  #[tokio::test]
  async fn missing_case_aborts_before_returning_anything() {
    let mut cases = stored_cases("q", 10);
    let missing = layout::output_key("q", 7);
    cases.retain(|(k, _)| *k != missing);
    let judge = FakeJudge::new(adder);
    let g = grader(judge, MemoryBlobs::with_text(&cases), Arc::new(MemoryRecords::default()), 10);

    let err = g.grade("q", "x", Language::Python).await.unwrap_err();
    assert!(matches!(err, AppError::MissingTestCase(7)));
    assert_eq!(err.to_string(), "Test case 7 missing in S3");
  }

  #[tokio::test]
  async fn judge_failure_discards_earlier_results() {
    let mut judge = FakeJudge::new(adder);
    judge.fail_submit_at = Some(3);
    let records = Arc::new(MemoryRecords::with(vec![record("q")]));
    let g = grader(judge, MemoryBlobs::with_text(&stored_cases("q", 5)), records.clone(), 5);

    let err = g.grade("q", "x", Language::Python).await.unwrap_err();
    assert!(matches!(err, AppError::Upstream { service: "Judge0", .. }));
    assert_eq!(records.row("q").unwrap().num_submissions, 0);
  }

  #[tokio::test]
  async fn fetch_failure_aborts() {
    let mut judge = FakeJudge::new(adder);
    judge.fail_fetch = true;
    let g = grader(judge, MemoryBlobs::with_text(&stored_cases("q", 2)), Arc::new(MemoryRecords::default()), 2);
    assert!(g.grade("q", "x", Language::Python).await.is_err());
  }

  #[tokio::test]
  async fn counter_failure_does_not_change_response() {
    let records = Arc::new(MemoryRecords { fail_counters: true, ..Default::default() });
    let g = grader(FakeJudge::new(adder), MemoryBlobs::with_text(&stored_cases("q", 3)), records, 3);
    assert_eq!(g.grade("q", "x", Language::Java).await.unwrap().len(), 3);
  }

  #[test]
  fn placeholder_is_stripped() {
    assert_eq!(strip_placeholder("# Write your code here\nprint(1)\n"), "print(1)");
    assert_eq!(strip_placeholder("  print(2)  "), "print(2)");
    assert_eq!(strip_placeholder("print(3) # Write your code here"), "print(3) # Write your code here");
  }
}
