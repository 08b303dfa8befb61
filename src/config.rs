//! Runtime settings (environment) and model prompts (TOML overridable).
//!
//! Settings are read once at startup; an unparsable value is a startup error.
//! Prompts fall back to built-in defaults when no config file is given or it fails to load.

use std::str::FromStr;

use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub aws_region: String,
  pub bucket: String,
  pub s3_endpoint: Option<String>,
  pub questions_table: String,
  pub dynamodb_endpoint: Option<String>,
  pub judge_url: String,
  pub rapidapi_host: String,
  pub rapidapi_key: Option<String>,
  /// Test cases per question: generated, given expected outputs, and graded.
  pub test_case_count: usize,
  pub uploaded_by: String,
  pub generation_workers: usize,
  pub generation_queue_capacity: usize,
  /// Seconds a finished generation job stays queryable.
  pub job_retention_secs: u64,
  pub script_interpreter: String,
}

impl Settings {
  pub fn from_env() -> AppResult<Self> {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build settings from any key lookup (env in production, a map in tests).
  pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let text = |k: &str, default: &str| lookup(k).filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string());
    let opt = |k: &str| lookup(k).filter(|v| !v.is_empty());

    let settings = Self {
      port: parsed(&lookup, "PORT", 3000)?,
      aws_region: text("AWS_REGION", "us-east-1"),
      bucket: text("AWS_STORAGE_BUCKET_NAME", "leetcode-ai-problems"),
      s3_endpoint: opt("S3_ENDPOINT_URL"),
      questions_table: text("QUESTIONS_TABLE", "leetcode-ai-questions"),
      dynamodb_endpoint: opt("DYNAMODB_ENDPOINT_URL"),
      judge_url: text("JUDGE0_API_URL", "https://judge0-ce.p.rapidapi.com"),
      rapidapi_host: text("RAPIDAPI_HOST", "judge0-ce.p.rapidapi.com"),
      rapidapi_key: opt("RAPIDAPI_KEY"),
      test_case_count: parsed(&lookup, "TEST_CASE_COUNT", 10)?,
      uploaded_by: text("UPLOADED_BY", "sid"),
      generation_workers: parsed(&lookup, "GENERATION_WORKERS", 2)?,
      generation_queue_capacity: parsed(&lookup, "GENERATION_QUEUE_CAPACITY", 64)?,
      job_retention_secs: parsed(&lookup, "JOB_RETENTION_SECS", 3600)?,
      script_interpreter: text("SCRIPT_INTERPRETER", "python3"),
    };

    if settings.test_case_count == 0 {
      return Err(AppError::Config("TEST_CASE_COUNT must be at least 1".into()));
    }
    if settings.generation_workers == 0 || settings.generation_queue_capacity == 0 {
      return Err(AppError::Config("GENERATION_WORKERS and GENERATION_QUEUE_CAPACITY must be at least 1".into()));
    }
    Ok(settings)
  }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
  F: Fn(&str) -> Option<String>,
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match lookup(key).filter(|v| !v.is_empty()) {
    Some(raw) => raw
      .trim()
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
    None => Ok(default),
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompts sent to the completion service. Any field can be overridden in TOML;
/// placeholders in `{braces}` are filled by the pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub question_system: String,
  pub question_user_template: String,
  pub attachments_template: String,
  pub metadata_system: String,
  pub metadata_user_template: String,
  pub test_case_script_system: String,
  pub test_case_script_user_template: String,
  pub solution_system: String,
  pub solution_user_template: String,
  pub interview_system: String,
  pub interview_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      question_system: "You are an AI that generates LeetCode-style coding problems.".into(),
      question_user_template: r#"Create a LeetCode-style question based on the following problem description:

{description}
{attachments}
Your output should include the following sections, each introduced by its exact header name on its own line:

1. Question Statement
2. Example 1 (with detailed explanation)
3. Example 2 (with detailed explanation)
4. Input Format: Describe input format details (line-separated, space-separated, etc.)
5. Output Format: Describe output format details
6. Constraints: Limit constraints to 10^3"#.into(),
      attachments_template: "\nPlease take the following files into consideration for this task:\n{file_lines}".into(),
      metadata_system: "You are an AI that generates metadata for coding problems.".into(),
      metadata_user_template: r#"Based on the following LeetCode-style question, generate metadata for the question in the following format:

<title> Title of the Question </title>
<company> Company most likely to ask the question </company>
<difficulty> Difficulty level (Easy, Medium, or Hard) </difficulty>

Question content:
{question}"#.into(),
      test_case_script_system: "You are an AI that generates Python scripts for generating test cases.".into(),
      test_case_script_user_template: r#"Create a robust Python script that generates {count} test cases based on the following input format
and constraints. The generated test cases should be saved to the provided S3 bucket path.

Input Format:
{input_format}

Constraints:
{constraints}

The script should take the following parameters:
- question_id: {question_id} - The unique ID for the question.
- bucket_name: {bucket} - The S3 bucket name where the test cases will be stored.
- test_cases_path: {bucket}/{input_prefix}/testcaseX.txt - The path in the S3 bucket where test case files should be saved.

The script should:
1. Generate {count} test cases following the input format and constraints.
2. Handle edge cases, such as maximum and minimum input lengths.
3. Save each test case in a text file (testcase1.txt, testcase2.txt, ..., testcase{count}.txt).
4. Upload each test case to the S3 path: "{bucket}/{input_prefix}/testcaseX.txt".
5. Ensure that temporary files (in the /tmp directory) are cleaned up after uploading to S3.
6. Implement proper exception handling for S3 uploads and file creation.
7. Log useful information, such as test case generation and upload success/failure.

Additional Requirements:
- Use the Python `boto3` library for uploading files to S3.
- Write the test cases to the /tmp directory.
- Keep the script modular with small reusable functions.
- Avoid unnecessary comments and explanations.

Output Generation Format (no explanation before or after the code, only the code enclosed in code tags):
"<code>python_code</code>""#.into(),
      solution_system: "You are an AI that generates Python solutions for competitive DSA coding problems.".into(),
      solution_user_template: r#"Create an optimal and correct Python solution to the following problem statement, considering the constraints for time and space complexity.

Complete Problem, examples, and constraints:
{question}

The solution must:
1. Take input according to the input format.
2. Return output in the correct format.
3. Handle the input/output inside the `__main__` function where:
   - The input is read from `sys.stdin.read()`, which contains all the input lines.
   - The solution logic is placed in a function that receives the input parameters and must return the result in all possible execution paths.
   - If no valid return value is found, return a default value at the end (e.g., `-1`, `None`, or an empty list, depending on the expected output format).
   - The returned result is printed in the output format of the problem.
   - The final output is written to `sys.stdout`.
4. The solution should be optimal based on the constraints:
   - If n > 10^9, the time complexity should be O(1).
   - If n == 10^9 or 10^8, the time complexity should be O(n).
   - If n == 10^5 or 10^6, the time complexity should be O(n log n).
   - If n <= 10^4, the time complexity should be O(n^2).
   - If n <= 10^3, the time complexity can be O(n^3).
   - If n < 16, the time complexity can be O(2^n).

The code should follow this structure:
1. Function(s) with the business logic that must return the result to main in all possible paths.
2. A `main()` function that reads input from `sys.stdin`, calls the function, and writes the output to `sys.stdout`.

Do not include explanations, comments, or print statements outside the solution itself.

Output Format (no explanation before or after the code, only the code enclosed in code tags):
"<code>python_solution</code>""#.into(),
      interview_system: "You write realistic technical interview transcripts.".into(),
      interview_user_template: r#"Write a short mock interview conversation between an Interviewer and a Candidate about the following coding problem.
The interviewer presents the problem and answers clarifying questions; the candidate talks through a brute-force idea, then an optimal approach and its complexity.
Write plain spoken sentences only, prefixed by "Interviewer:" or "Candidate:". No markdown, no code blocks.

Problem:
{question}"#.into(),
    }
  }
}

/// Load prompts from PROMPTS_CONFIG_PATH. On any IO/parse error, log and use defaults.
pub fn load_prompts_from_env() -> Prompts {
  let Ok(path) = std::env::var("PROMPTS_CONFIG_PATH") else {
    return Prompts::default();
  };
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<PromptsConfig>(&s) {
      Ok(cfg) => {
        info!(target: "leetgen", %path, "Loaded prompts config (TOML)");
        cfg.prompts
      }
      Err(e) => {
        error!(target: "leetgen", %path, error = %e, "Failed to parse TOML prompts; using defaults");
        Prompts::default()
      }
    },
    Err(e) => {
      error!(target: "leetgen", %path, error = %e, "Failed to read TOML prompts file; using defaults");
      Prompts::default()
    }
  }
}
