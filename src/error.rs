//! Error taxonomy for the quiz pipeline and its HTTP mapping.
//!
//! Every stage fails fast and whole: callers get a complete result or one of these.
//! The HTTP layer renders `{ "kind", "message" }` and never a backtrace.

use axum::{
  extract::{multipart::MultipartRejection, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde::Serialize;
use thiserror::Error;

/// Which generation stage a service failure came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
  Quiz,
  Review,
}

impl std::fmt::Display for Stage {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Stage::Quiz => f.write_str("quiz synthesis"),
      Stage::Review => f.write_str("quiz review"),
    }
  }
}

/// Failures at the text-generation service boundary.
#[derive(Error, Debug)]
pub enum GenerationError {
  #[error("generation service not configured (set OPENAI_API_KEY)")]
  NotConfigured,

  #[error("prompt template references unknown variable(s): {}", .0.join(", "))]
  MissingVariable(Vec<String>),

  #[error("request to generation service failed: {0}")]
  Transport(#[source] reqwest::Error),

  #[error("generation service timed out: {0}")]
  Timeout(#[source] reqwest::Error),

  #[error("generation service rate limited the request: {0}")]
  RateLimited(String),

  #[error("generation service returned HTTP {status}: {message}")]
  Http { status: u16, message: String },

  #[error("generation service returned no completion text")]
  EmptyCompletion,
}

impl From<reqwest::Error> for GenerationError {
  fn from(e: reqwest::Error) -> Self {
    if e.is_timeout() { GenerationError::Timeout(e) } else { GenerationError::Transport(e) }
  }
}

#[derive(Error, Debug)]
pub enum QuizError {
  #[error("unsupported document format: {}", display_extension(.extension))]
  UnsupportedFormat { extension: String, detail: Option<String> },

  #[error("document is not valid UTF-8 text: {0}")]
  Decoding(#[from] std::str::Utf8Error),

  #[error("invalid request: {0}")]
  InvalidRequest(String),

  #[error("{stage} failed: {source}")]
  GenerationService {
    stage: Stage,
    #[source]
    source: GenerationError,
  },

  #[error("could not parse quiz ({reason}); top-level keys: [{}]; raw preview: {preview:?}", .keys.join(", "))]
  Parse {
    reason: String,
    preview: String,
    keys: Vec<String>,
  },
}

fn display_extension(ext: &str) -> String {
  if ext.is_empty() { "(no extension)".to_string() } else { format!(".{}", ext) }
}

impl QuizError {
  pub fn unsupported(extension: impl Into<String>) -> Self {
    QuizError::UnsupportedFormat { extension: extension.into(), detail: None }
  }

  pub fn generation(stage: Stage, source: GenerationError) -> Self {
    QuizError::GenerationService { stage, source }
  }

  /// Stable machine-readable kind shown to clients.
  pub fn kind(&self) -> &'static str {
    match self {
      QuizError::UnsupportedFormat { .. } => "unsupported_format",
      QuizError::Decoding(_) => "decoding_error",
      QuizError::InvalidRequest(_) => "invalid_request",
      QuizError::GenerationService { .. } => "generation_service_error",
      QuizError::Parse { .. } => "parse_error",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      QuizError::UnsupportedFormat { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      QuizError::Decoding(_) | QuizError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
      QuizError::GenerationService { source, .. } => match source {
        GenerationError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        GenerationError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        GenerationError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        GenerationError::MissingVariable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_GATEWAY,
      },
      QuizError::Parse { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
  }
}

impl From<JsonRejection> for QuizError {
  fn from(rejection: JsonRejection) -> Self {
    QuizError::InvalidRequest(format!("malformed JSON body: {}", rejection.body_text()))
  }
}

impl From<MultipartRejection> for QuizError {
  fn from(rejection: MultipartRejection) -> Self {
    QuizError::InvalidRequest(format!("malformed upload form: {}", rejection.body_text()))
  }
}

#[derive(Serialize)]
struct ErrorOut {
  kind: &'static str,
  message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  detail: Option<String>,
}

impl IntoResponse for QuizError {
  fn into_response(self) -> Response {
    let detail = match &self {
      QuizError::UnsupportedFormat { detail, .. } => detail.clone(),
      _ => None,
    };
    let body = ErrorOut { kind: self.kind(), message: self.to_string(), detail };
    (self.status(), Json(body)).into_response()
  }
}
