//! Loading quiz configuration (prompts, schema template, limits) from TOML.
//!
//! See `QuizConfig`, `Prompts` and `GenerationSettings` for the expected schema.
//! Every section is optional; missing values fall back to the defaults below.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{error, info};

use crate::domain::SchemaTemplate;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QuizConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub generation: GenerationSettings,
  /// JSON file holding the schema template; relative paths resolve against the
  /// config file's directory.
  #[serde(default)]
  pub schema_template_path: Option<PathBuf>,
}

/// Prompt templates. Placeholders: `{number}`, `{subject}`, `{tone}`,
/// `{response_json}`, `{text}` for the quiz stage; `{subject}`, `{quiz}` for review.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub quiz_system_template: String,
  pub quiz_user_template: String,
  pub review_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      quiz_system_template: "You are an expert MCQ maker. \
It is your job to create a quiz of {number} multiple choice questions for {subject} students in {tone} tone.\n\
Make sure the questions are not repeated and check all the questions to be conforming the text as well.\n\
Make sure to format your response like the RESPONSE_JSON below and use it as a guide. \
Ensure to make {number} MCQs.\n\n\
### RESPONSE_JSON\n{response_json}".into(),
      quiz_user_template: "Text: {text}".into(),
      review_template: "You are an expert english grammarian and writer. \
Given a Multiple Choice Quiz for {subject} students.\n\
You need to evaluate the complexity of the question and give a complete analysis of the quiz.\n\n\
Quiz_MCQs:\n{quiz}\n\n\
Check from an expert English Writer of the above quiz:".into(),
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub temperature: f32,
  pub max_questions: u32,
  pub max_upload_bytes: usize,
  /// Characters of raw model output kept in parse-error previews.
  pub preview_chars: usize,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      temperature: 0.5,
      max_questions: 50,
      max_upload_bytes: 10 * 1024 * 1024,
      preview_chars: crate::parser::DEFAULT_PREVIEW_CHARS,
    }
  }
}

impl QuizConfig {
  /// Resolve the schema template: the configured JSON file, or the built-in default.
  /// `base` is the directory relative paths are resolved against.
  pub fn load_schema_template(&self, base: Option<&Path>) -> SchemaTemplate {
    let Some(path) = &self.schema_template_path else {
      return SchemaTemplate::default();
    };
    let path = match base {
      Some(dir) if path.is_relative() => dir.join(path),
      _ => path.clone(),
    };
    match std::fs::read_to_string(&path).map(|s| SchemaTemplate::from_json_str(&s)) {
      Ok(Ok(schema)) => {
        info!(target: "mcqgen", path = %path.display(), "Loaded schema template");
        schema
      }
      Ok(Err(e)) => {
        error!(target: "mcqgen", path = %path.display(), error = %e, "Schema template is not valid JSON; using built-in default");
        SchemaTemplate::default()
      }
      Err(e) => {
        error!(target: "mcqgen", path = %path.display(), error = %e, "Failed to read schema template; using built-in default");
        SchemaTemplate::default()
      }
    }
  }
}

/// Parse a TOML document into a `QuizConfig`.
pub fn parse_config(s: &str) -> Result<QuizConfig, toml::de::Error> {
  toml::from_str::<QuizConfig>(s)
}

/// Attempt to load `QuizConfig` from QUIZ_CONFIG_PATH. On any parsing/IO error, returns None.
/// The second element is the config file's directory, for resolving relative paths.
pub fn load_quiz_config_from_env() -> Option<(QuizConfig, Option<PathBuf>)> {
  let path = std::env::var("QUIZ_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_config(&s) {
      Ok(cfg) => {
        info!(target: "mcqgen", %path, "Loaded quiz config (TOML)");
        let dir = Path::new(&path).parent().map(Path::to_path_buf);
        Some((cfg, dir))
      }
      Err(e) => {
        error!(target: "mcqgen", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "mcqgen", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
