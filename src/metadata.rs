//! Parser for the tagged metadata block the model emits:
//!
//! ```text
//! <title> Two Sum </title>
//! <company> Google </company>
//! <difficulty> Easy </difficulty>
//! ```
//!
//! A tag that is missing (or whose closing marker is missing) yields an empty field.

use crate::domain::QuestionMetadata;

pub fn parse_metadata(block: &str) -> QuestionMetadata {
  QuestionMetadata {
    title: tagged_field(block, "title"),
    company: tagged_field(block, "company"),
    difficulty: tagged_field(block, "difficulty"),
  }
}

/// Text between the first `<tag>` and the next `</tag>` after it, trimmed.
pub fn tagged_field(block: &str, tag: &str) -> String {
  let open = format!("<{}>", tag);
  let close = format!("</{}>", tag);
  let Some(start) = block.find(&open).map(|i| i + open.len()) else {
    return String::new();
  };
  match block[start..].find(&close) {
    Some(len) => block[start..start + len].trim().to_string(),
    None => String::new(),
  }
}
