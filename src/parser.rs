//! Quiz response parser: turns the model's free-form quiz text into question records.
//!
//! Recovery ladder, each step a fallback for the previous one:
//!   1. strip a markdown fence (```json first, then any ```)
//!   2. slice from the first `{` to the last `}`
//!   3. strict JSON, then the lenient literal decoder
//!   4. normalize every mapping-valued entry with case-insensitive alias lookup
//!
//! The parser never invents a question that is not in the decoded structure and never
//! reports success with zero records.

use serde_json::{json, Map, Value};
use tracing::{debug, instrument, warn};

use crate::domain::QuestionRecord;
use crate::error::QuizError;
use crate::literal::parse_literal;
use crate::util::trunc_for_log;

const QUESTION_KEYS: &[&str] = &["mcq", "question"];
const OPTIONS_KEYS: &[&str] = &["options", "choices"];
const CORRECT_KEYS: &[&str] = &["correct", "correct_answer", "correct answer", "answer"];
const HINT_KEYS: &[&str] = &["hint", "hints", "clue"];
const EXPLANATION_KEYS: &[&str] = &["explanation", "explanations", "rationale", "reason"];
const OPTION_SLOTS: [[&str; 3]; 4] = [
  ["a", "option_a", "option a"],
  ["b", "option_b", "option b"],
  ["c", "option_c", "option c"],
  ["d", "option_d", "option d"],
];

/// Default size of the raw-text preview carried by parse errors.
pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Parse with the default preview size.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuestionRecord>, QuizError> {
  parse_quiz_with_preview(raw, DEFAULT_PREVIEW_CHARS)
}

#[instrument(level = "debug", skip(raw), fields(raw_len = raw.len()))]
pub fn parse_quiz_with_preview(raw: &str, preview_chars: usize) -> Result<Vec<QuestionRecord>, QuizError> {
  let fail = |reason: String, keys: Vec<String>| QuizError::Parse {
    reason,
    preview: trunc_for_log(raw.trim(), preview_chars),
    keys,
  };

  let body = brace_span(strip_fence(raw));
  let decoded = match serde_json::from_str::<Value>(body) {
    Ok(v) => v,
    Err(strict) => match parse_literal(body) {
      Ok(v) => {
        debug!(error = %strict, "strict JSON failed; lenient literal decode succeeded");
        v
      }
      Err(lenient) => {
        warn!(strict = %strict, lenient = %lenient, "quiz text is neither JSON nor a structural literal");
        return Err(fail(format!("not decodable as JSON ({}) or literal ({})", strict, lenient), Vec::new()));
      }
    },
  };

  let top = match decoded {
    Value::Object(top) => top,
    other => {
      return Err(fail(format!("expected a mapping of questions, found {}", type_name(&other)), Vec::new()));
    }
  };

  let records: Vec<QuestionRecord> = top
    .values()
    .filter_map(Value::as_object)
    .map(normalize_entry)
    .collect();

  if records.is_empty() {
    let keys = top.keys().cloned().collect();
    return Err(fail("no mapping-valued question entries".into(), keys));
  }

  debug!(entries = top.len(), records = records.len(), "quiz parsed");
  Ok(records)
}

/// Content of the first ```json fence, else the first generic fence, else the input.
/// An unclosed fence runs to the end of the text.
pub fn strip_fence(raw: &str) -> &str {
  const JSON_FENCE: &str = "```json";
  const FENCE: &str = "```";
  let start = if let Some(i) = raw.find(JSON_FENCE) {
    i + JSON_FENCE.len()
  } else if let Some(i) = raw.find(FENCE) {
    i + FENCE.len()
  } else {
    return raw;
  };
  let inner = &raw[start..];
  match inner.find(FENCE) {
    Some(end) => &inner[..end],
    None => inner,
  }
}

/// Slice from the first `{` through the last `}`; the input unchanged if no such span.
pub fn brace_span(s: &str) -> &str {
  match (s.find('{'), s.rfind('}')) {
    (Some(start), Some(end)) if end > start => &s[start..=end],
    _ => s,
  }
}

/// First value whose key matches one of `aliases` case-insensitively.
/// Aliases are tried in order, so earlier names win over later ones.
pub fn lookup<'m>(map: &'m Map<String, Value>, aliases: &[&str]) -> Option<&'m Value> {
  aliases.iter().find_map(|alias| {
    map.iter()
      .find(|(k, _)| k.trim().to_lowercase() == alias.to_lowercase())
      .map(|(_, v)| v)
  })
}

fn normalize_entry(entry: &Map<String, Value>) -> QuestionRecord {
  let text = |aliases: &[&str]| lookup(entry, aliases).map(scalar_text).unwrap_or_default();

  let [option_a, option_b, option_c, option_d] = match lookup(entry, OPTIONS_KEYS) {
    Some(Value::Object(options)) => {
      OPTION_SLOTS.map(|slot| lookup(options, &slot).map(scalar_text).unwrap_or_default())
    }
    _ => Default::default(),
  };

  QuestionRecord {
    question: text(QUESTION_KEYS),
    option_a,
    option_b,
    option_c,
    option_d,
    correct: text(CORRECT_KEYS),
    hint: text(HINT_KEYS),
    explanation: text(EXPLANATION_KEYS),
  }
}

/// Scalars render as text; null and containers become empty.
fn scalar_text(v: &Value) -> String {
  match v {
    Value::String(s) => s.trim().to_string(),
    Value::Number(n) => n.to_string(),
    Value::Bool(b) => b.to_string(),
    Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
  }
}

fn type_name(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "a list",
    Value::Object(_) => "a mapping",
  }
}

/// Rebuild the canonical schema-shaped mapping (`"1"`, `"2"`, …) from records.
pub fn to_schema_value(records: &[QuestionRecord]) -> Value {
  let mut map = Map::new();
  for (i, r) in records.iter().enumerate() {
    map.insert(
      (i + 1).to_string(),
      json!({
        "mcq": r.question,
        "options": { "a": r.option_a, "b": r.option_b, "c": r.option_c, "d": r.option_d },
        "correct": r.correct,
        "hint": r.hint,
        "explanation": r.explanation,
      }),
    );
  }
  Value::Object(map)
}
