//! Section splitting of generated question text and the HTML document built from it.

use crate::domain::QuestionSections;
use crate::util::escape_html;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Section {
  Statement,
  Example1,
  Example2,
  InputFormat,
  OutputFormat,
  Constraints,
}

/// Header substrings, checked in this order on every line.
const HEADERS: [(&str, Section); 6] = [
  ("Question Statement", Section::Statement),
  ("Example 1", Section::Example1),
  ("Example 2", Section::Example2),
  ("Input Format", Section::InputFormat),
  ("Output Format", Section::OutputFormat),
  ("Constraints", Section::Constraints),
];

/// Split question text into its six sections.
///
/// A line containing a header substring switches the active section and is itself dropped.
/// Other lines go to the active section; lines before the first header are discarded.
pub fn split_sections(text: &str) -> QuestionSections {
  let mut buffers: [String; 6] = Default::default();
  let mut current: Option<Section> = None;

  for line in text.lines() {
    if let Some((_, s)) = HEADERS.iter().find(|(h, _)| line.contains(h)) {
      current = Some(*s);
      continue;
    }
    if let Some(s) = current {
      let buf = &mut buffers[s as usize];
      buf.push_str(line);
      buf.push('\n');
    }
  }

  let [statement, example_1, example_2, input_format, output_format, constraints] =
    buffers.map(|b| b.trim().to_string());
  QuestionSections { statement, example_1, example_2, input_format, output_format, constraints }
}

/// Render the fixed question page.
pub fn render_html(question_id: &str, s: &QuestionSections) -> String {
  let part = |h: &str, tag: &str, body: &str| {
    format!("    <{tag}>{h}</{tag}>\n    <p>{}</p>\n", escape_html(body))
  };
  let mut html = String::new();
  html.push_str("<html>\n<head>\n");
  html.push_str(&format!("    <title>LeetCode AI Problem {}</title>\n", escape_html(question_id)));
  html.push_str("</head>\n<body>\n");
  html.push_str(&part("Question Statement", "h1", &s.statement));
  html.push_str(&part("Example 1", "h2", &s.example_1));
  html.push_str(&part("Example 2", "h2", &s.example_2));
  html.push_str(&part("Input Format", "h2", &s.input_format));
  html.push_str(&part("Output Format", "h2", &s.output_format));
  html.push_str(&part("Constraints", "h2", &s.constraints));
  html.push_str("</body>\n</html>\n");
  html
}

#[cfg(test)]
mod tests {
  use super::*;

  const FULL: &str = "\
Here is your problem.
### 1. Question Statement
Given an array, find the pair.
Return indices.
### 2. Example 1
Input: 1 2
Output: 0 1
### 3. Example 2
Input: 3 3
Output: 0 1
### 4. Input Format
Two integers.
### 5. Output Format
Two indices.
### 6. Constraints
1 <= n <= 10^3
";

  #[test]
  fn all_headers_present_assigns_every_line() {
    let s = split_sections(FULL);
    assert_eq!(s.statement, "Given an array, find the pair.\nReturn indices.");
    assert_eq!(s.example_1, "Input: 1 2\nOutput: 0 1");
    assert_eq!(s.example_2, "Input: 3 3\nOutput: 0 1");
    assert_eq!(s.input_format, "Two integers.");
    assert_eq!(s.output_format, "Two indices.");
    assert_eq!(s.constraints, "1 <= n <= 10^3");
  }

  #[test]
  fn missing_header_folds_lines_into_previous_section() {
    let text = "Question Statement\nDo the thing.\nExample 1\nin: 1\nInput Format\none int\nOutput Format\none int\nConstraints\nn < 5\n";
    let s = split_sections(text);
    assert_eq!(s.example_1, "in: 1");
    assert_eq!(s.example_2, "");
    assert_eq!(s.input_format, "one int");
  }

  #[test]
  fn mislabeled_header_keeps_lines_in_active_section() {
    let text = "Question Statement\nstatement\nSample Two\nin: 2\n";
    let s = split_sections(text);
    assert_eq!(s.statement, "statement\nSample Two\nin: 2");
    assert_eq!(s.example_2, "");
  }

  #[test]
  fn lines_before_first_header_are_discarded() {
    let s = split_sections("preamble\nmore preamble\nConstraints\nn <= 10\n");
    assert_eq!(s.statement, "");
    assert_eq!(s.constraints, "n <= 10");
  }

  #[test]
  fn html_contains_every_section_escaped() {
    let s = split_sections(FULL);
    let html = render_html("q-42", &s);
    assert!(html.contains("<title>LeetCode AI Problem q-42</title>"));
    assert!(html.contains("<h1>Question Statement</h1>"));
    assert!(html.contains("<h2>Constraints</h2>\n    <p>1 &lt;= n &lt;= 10^3</p>"));
    assert!(html.contains("<p>Two integers.</p>"));
  }
}
