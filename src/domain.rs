//! Domain models: document kinds, the generation request, question records and the
//! accumulating pipeline result.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::QuizError;

/// Declared kind of an uploaded document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
  Pdf,
  PlainText,
}

impl DocumentKind {
  /// Derive the kind from a file name's extension (case-insensitive).
  pub fn from_file_name(name: &str) -> Result<Self, QuizError> {
    let ext = std::path::Path::new(name)
      .extension()
      .and_then(|e| e.to_str())
      .unwrap_or_default();
    match ext.to_ascii_lowercase().as_str() {
      "pdf" => Ok(DocumentKind::Pdf),
      "txt" => Ok(DocumentKind::PlainText),
      _ => Err(QuizError::unsupported(ext)),
    }
  }
}

/// Structural example embedded in the quiz prompt to steer the model's output shape.
/// Advisory only; the parser does not enforce it.
#[derive(Clone, Debug, PartialEq)]
pub struct SchemaTemplate(Value);

impl SchemaTemplate {
  pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(s).map(Self)
  }

  pub fn value(&self) -> &Value { &self.0 }

  /// Serialized form substituted for `{response_json}`.
  pub fn to_prompt_string(&self) -> String {
    serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
  }
}

impl Default for SchemaTemplate {
  fn default() -> Self {
    let slot = |n: &str| serde_json::json!({
      "mcq": "multiple choice question",
      "options": {
        "a": "choice here",
        "b": "choice here",
        "c": "choice here",
        "d": "choice here",
      },
      "correct": format!("correct answer for question {n}"),
    });
    let mut map = serde_json::Map::new();
    for n in ["1", "2", "3"] {
      map.insert(n.to_string(), slot(n));
    }
    Self(Value::Object(map))
  }
}

/// Validated, immutable input to the pipeline.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
  source_text: String,
  question_count: u32,
  subject: String,
  tone: String,
  schema: Arc<SchemaTemplate>,
}

impl GenerationRequest {
  /// Build a request, rejecting empty fields and counts outside `1..=max_questions`.
  pub fn new(
    source_text: impl Into<String>,
    question_count: u32,
    subject: impl Into<String>,
    tone: impl Into<String>,
    schema: Arc<SchemaTemplate>,
    max_questions: u32,
  ) -> Result<Self, QuizError> {
    let source_text = source_text.into();
    let subject = subject.into().trim().to_string();
    let tone = tone.into().trim().to_string();

    if source_text.trim().is_empty() {
      return Err(QuizError::InvalidRequest("source text is empty".into()));
    }
    if question_count == 0 || question_count > max_questions {
      return Err(QuizError::InvalidRequest(format!(
        "question count must be between 1 and {}, got {}",
        max_questions, question_count
      )));
    }
    if subject.is_empty() {
      return Err(QuizError::InvalidRequest("subject is empty".into()));
    }
    if tone.is_empty() {
      return Err(QuizError::InvalidRequest("tone is empty".into()));
    }

    Ok(Self { source_text, question_count, subject, tone, schema })
  }

  pub fn source_text(&self) -> &str { &self.source_text }
  pub fn question_count(&self) -> u32 { self.question_count }
  pub fn subject(&self) -> &str { &self.subject }
  pub fn tone(&self) -> &str { &self.tone }
  pub fn schema(&self) -> &SchemaTemplate { &self.schema }
}

/// One normalized question. Absent fields are empty strings, never null.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
  pub question: String,
  pub option_a: String,
  pub option_b: String,
  pub option_c: String,
  pub option_d: String,
  pub correct: String,
  #[serde(default)]
  pub hint: String,
  #[serde(default)]
  pub explanation: String,
}

impl QuestionRecord {
  pub fn options(&self) -> [(char, &str); 4] {
    [
      ('a', self.option_a.as_str()),
      ('b', self.option_b.as_str()),
      ('c', self.option_c.as_str()),
      ('d', self.option_d.as_str()),
    ]
  }

  /// Resolve the correct-answer token to an option letter.
  ///
  /// The exact text of one of the options wins. Otherwise a bare letter (`"b"`, `"B"`),
  /// a decorated letter (`"b)"`, `"(b)"`, `"b. 4"`) or `"Option B"` is accepted.
  pub fn answer_letter(&self) -> Option<char> {
    self.letter_for(&self.correct)
  }

  /// Whether `choice` (a letter, or an option's text) is the correct answer.
  pub fn is_correct(&self, choice: &str) -> bool {
    match self.answer_letter() {
      Some(expected) => self.letter_for(choice) == Some(expected),
      None => false,
    }
  }

  fn letter_for(&self, token: &str) -> Option<char> {
    let wanted = token.trim();
    if wanted.is_empty() {
      return None;
    }
    // "A sparrow" as option text must not read as the letter a.
    self.options()
      .into_iter()
      .find(|(_, text)| text.trim().eq_ignore_ascii_case(wanted))
      .map(|(letter, _)| letter)
      .or_else(|| letter_of(wanted))
  }
}

fn letter_of(token: &str) -> Option<char> {
  let t = token.trim().to_ascii_lowercase();
  let t = t.strip_prefix("option").map(str::trim_start).unwrap_or(&t);
  let t = t.trim_start_matches('(');
  let mut chars = t.chars();
  let first = chars.next()?;
  if !('a'..='d').contains(&first) {
    return None;
  }
  match chars.next() {
    None => Some(first),
    Some(c) if matches!(c, ')' | '.' | ':' | ' ' | '-') => Some(first),
    _ => None,
  }
}

/// State threaded through the generation chain. Each stage only adds to it.
#[derive(Clone, Debug)]
pub struct PipelineResult {
  pub id: Uuid,
  pub request: GenerationRequest,
  pub raw_quiz: String,
  pub questions: Vec<QuestionRecord>,
  pub review: String,
}

impl PipelineResult {
  pub fn start(request: GenerationRequest) -> Self {
    Self {
      id: Uuid::new_v4(),
      request,
      raw_quiz: String::new(),
      questions: Vec::new(),
      review: String::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn schema() -> Arc<SchemaTemplate> { Arc::new(SchemaTemplate::default()) }

  #[test]
  fn kind_from_extension() {
    assert_eq!(DocumentKind::from_file_name("notes.PDF").unwrap(), DocumentKind::Pdf);
    assert_eq!(DocumentKind::from_file_name("a.b.txt").unwrap(), DocumentKind::PlainText);
    let err = DocumentKind::from_file_name("essay.docx").unwrap_err();
    assert!(err.to_string().contains(".docx"));
    assert!(matches!(DocumentKind::from_file_name("README"), Err(QuizError::UnsupportedFormat { .. })));
  }

  #[test]
  fn request_rejects_out_of_range_counts() {
    assert!(GenerationRequest::new("text", 0, "bio", "easy", schema(), 50).is_err());
    assert!(GenerationRequest::new("text", 51, "bio", "easy", schema(), 50).is_err());
    assert!(GenerationRequest::new("text", 50, "bio", "easy", schema(), 50).is_ok());
  }

  #[test]
  fn request_rejects_blank_fields() {
    assert!(matches!(
      GenerationRequest::new("  \n", 5, "bio", "easy", schema(), 50),
      Err(QuizError::InvalidRequest(_))
    ));
    assert!(GenerationRequest::new("text", 5, " ", "easy", schema(), 50).is_err());
    assert!(GenerationRequest::new("text", 5, "bio", "", schema(), 50).is_err());
  }

  #[test]
  fn default_schema_mentions_every_field() {
    let s = SchemaTemplate::default().to_prompt_string();
    for key in ["\"mcq\"", "\"options\"", "\"correct\"", "\"d\""] {
      assert!(s.contains(key), "{key} missing from {s}");
    }
  }

  #[test]
  fn answer_letter_accepts_common_spellings() {
    let mut q = QuestionRecord {
      question: "2+2?".into(),
      option_a: "3".into(),
      option_b: "4".into(),
      option_c: "5".into(),
      option_d: "6".into(),
      ..Default::default()
    };
    for token in ["b", "B", " b) ", "(b)", "Option B", "b. 4", "4"] {
      q.correct = token.into();
      assert_eq!(q.answer_letter(), Some('b'), "token {token:?}");
    }
    q.correct = "because".into();
    assert_eq!(q.answer_letter(), None);
  }

  #[test]
  fn option_text_beats_letter_shaped_prefix() {
    let q = QuestionRecord {
      question: "Which one is a bird?".into(),
      option_a: "Dog".into(),
      option_b: "C. elegans".into(),
      option_c: "A sparrow".into(),
      option_d: "Trout".into(),
      correct: "A sparrow".into(),
      ..Default::default()
    };
    assert_eq!(q.answer_letter(), Some('c'));
    assert!(q.is_correct("c"));
    assert!(q.is_correct("a sparrow"));
    assert!(!q.is_correct("a"));
    assert!(!q.is_correct("C. elegans"));
  }

  #[test]
  fn is_correct_matches_letter_or_text() {
    let q = QuestionRecord {
      question: "2+2?".into(),
      option_a: "3".into(),
      option_b: "4".into(),
      correct: "B".into(),
      ..Default::default()
    };
    assert!(q.is_correct("b"));
    assert!(q.is_correct("4"));
    assert!(!q.is_correct("a"));
    assert!(!q.is_correct(""));
  }
}
