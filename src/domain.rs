//! Domain models: question record, parsed metadata and sections, languages, grading results.

use serde::{Deserialize, Serialize};

/// Metadata row stored in the questions table, keyed by `question_id`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
  pub question_id: String,
  pub title: String,
  pub company: String,
  pub difficulty: String,
  pub num_submissions: u64,
  pub successful_submissions: u64,
  pub uploaded_by: String,
}

impl QuestionRecord {
  /// Fresh record with zeroed counters.
  pub fn new(question_id: &str, metadata: &QuestionMetadata, uploaded_by: &str) -> Self {
    Self {
      question_id: question_id.to_string(),
      title: metadata.title.clone(),
      company: metadata.company.clone(),
      difficulty: metadata.difficulty.clone(),
      num_submissions: 0,
      successful_submissions: 0,
      uploaded_by: uploaded_by.to_string(),
    }
  }
}

/// Fields extracted from the model's tagged metadata block. Absent tags stay empty.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionMetadata {
  pub title: String,
  pub company: String,
  pub difficulty: String,
}

/// The six parts of a generated question, each trimmed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuestionSections {
  pub statement: String,
  pub example_1: String,
  pub example_2: String,
  pub input_format: String,
  pub output_format: String,
  pub constraints: String,
}

/// Languages accepted by the grader, with their Judge0 language ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Language {
  Python,
  JavaScript,
  Cpp,
  C,
  Java,
}

impl Language {
  /// Resolve a request tag. Unknown or missing tags fall back to Python.
  pub fn from_tag(tag: Option<&str>) -> Self {
    match tag.map(str::trim) {
      Some("python") => Language::Python,
      Some("javascript") => Language::JavaScript,
      Some("cpp") => Language::Cpp,
      Some("c") => Language::C,
      Some("java") => Language::Java,
      _ => Language::Python,
    }
  }

  pub fn judge_id(self) -> u32 {
    match self {
      Language::Python => 71,
      Language::JavaScript => 63,
      Language::Cpp => 54,
      Language::C => 50,
      Language::Java => 62,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
  Passed,
  Failed,
}

/// Per-test-case grading result; transient, returned to the caller and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseResult {
  pub test_case: usize,
  pub input: String,
  pub expected: String,
  pub actual: String,
  pub status: String,
  pub stderr: String,
  pub result: Outcome,
}
