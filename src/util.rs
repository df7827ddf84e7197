//! Small utility helpers used across modules.

use std::collections::BTreeSet;

/// Names of every `{placeholder}` in a template.
/// A placeholder is a brace pair around a non-empty run of `[A-Za-z0-9_]`.
pub fn placeholders(tpl: &str) -> BTreeSet<String> {
  let mut out = BTreeSet::new();
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    let after = &rest[open + 1..];
    let name_len = after
      .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
      .unwrap_or(after.len());
    if name_len > 0 && after[name_len..].starts_with('}') {
      out.insert(after[..name_len].to_string());
    }
    rest = after;
  }
  out
}

/// Very small and safe string templating: replaces `{key}` with the paired value.
///
/// Refuses templates that reference a placeholder not present in `pairs` and
/// returns the sorted missing names instead.
pub fn fill_template_strict(tpl: &str, pairs: &[(&str, &str)]) -> Result<String, Vec<String>> {
  let missing: Vec<String> = placeholders(tpl)
    .into_iter()
    .filter(|name| !pairs.iter().any(|(k, _)| *k == name.as_str()))
    .collect();
  if !missing.is_empty() {
    return Err(missing);
  }
  // Single left-to-right pass: substituted values (the schema template has braces)
  // are never rescanned.
  let mut out = String::with_capacity(tpl.len());
  let mut rest = tpl;
  while let Some(open) = rest.find('{') {
    out.push_str(&rest[..open]);
    let after = &rest[open + 1..];
    let hit = pairs.iter().find(|(k, _)| {
      after.starts_with(k) && after[k.len()..].starts_with('}')
    });
    match hit {
      Some((k, v)) => {
        out.push_str(v);
        rest = &after[k.len() + 1..];
      }
      None => {
        out.push('{');
        rest = after;
      }
    }
  }
  out.push_str(rest);
  Ok(out)
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  let total = s.chars().count();
  if total <= max {
    s.to_string()
  } else {
    let head: String = s.chars().take(max).collect();
    format!("{}… ({} chars total)", head, total)
  }
}
