//! Small string helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Strip the code-delimiter conventions the model wraps scripts in
/// (markdown fences and `<code>` tags) and trim the result.
pub fn unwrap_code(raw: &str) -> String {
  raw
    .replace("```python", "")
    .replace("```", "")
    .trim()
    .replace("<code>", "")
    .replace("</code>", "")
    .trim()
    .to_string()
}

/// Escape the characters that would otherwise be parsed as markup.
pub fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      _ => out.push(ch),
    }
  }
  out
}

/// Log-safe truncation for large strings (never splits a UTF-8 sequence).
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
