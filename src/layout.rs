//! Object-store key convention. Every artifact of a question lives under `{question_id}/`.

pub const TEST_CASE_SCRIPT: &str = "generate_test_cases.py";
pub const TESTER_SOLUTION: &str = "tester_solution.py";
pub const INTERVIEW_AUDIO: &str = "interview_audio.mp3";

pub fn document_key(question_id: &str) -> String {
    format!("{}/{}.html", question_id, question_id)
}

/// Key of the `index`-th (1-based) test case input.
pub fn input_key(question_id: &str, index: usize) -> String {
    format!("{}/input/testcase{}.txt", question_id, index)
}

/// Key of the `index`-th (1-based) expected output.
pub fn output_key(question_id: &str, index: usize) -> String {
    format!("{}/output/testcase{}.txt", question_id, index)
}

pub fn input_prefix(question_id: &str) -> String {
    format!("{}/input", question_id)
}

pub fn test_case_script_key(question_id: &str) -> String {
    format!("{}/{}", question_id, TEST_CASE_SCRIPT)
}

pub fn tester_solution_key(question_id: &str) -> String {
    format!("{}/{}", question_id, TESTER_SOLUTION)
}

pub fn audio_key(question_id: &str) -> String {
    format!("{}/{}", question_id, INTERVIEW_AUDIO)
}

/// First path segment of a key, which is the owning question id.
pub fn question_id_of(key: &str) -> Option<&str> {
    key.split('/').next().filter(|s| !s.is_empty())
}

/// Public URL of a stored object.
///
/// With a custom endpoint (MinIO, localstack) the path-style form is used.
pub fn public_url(bucket: &str, region: &str, endpoint: Option<&str>, key: &str) -> String {
    match endpoint {
        Some(ep) => format!("{}/{}/{}", ep.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}
