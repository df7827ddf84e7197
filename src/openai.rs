//! Minimal OpenAI-compatible chat.completions client.
//!
//! Works against any provider exposing `/chat/completions` (OpenAI, Groq, local
//! gateways). Calls are instrumented and log model names, latencies and response
//! sizes, never contents or the API key.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::chain::{Prompt, TextGenerator};
use crate::error::{GenerationError, Stage};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub quiz_model: String,
  pub review_model: String,
}

impl std::fmt::Debug for OpenAI {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OpenAI")
      .field("base_url", &self.base_url)
      .field("quiz_model", &self.quiz_model)
      .field("review_model", &self.review_model)
      .finish_non_exhaustive()
  }
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  ///
  /// No request timeout is set unless OPENAI_TIMEOUT_SECS is given; callers that want
  /// bounded latency impose it at their own boundary.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let quiz_model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let review_model = std::env::var("OPENAI_REVIEW_MODEL").unwrap_or_else(|_| quiz_model.clone());
    let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .map(Duration::from_secs);

    let mut builder = reqwest::Client::builder();
    if let Some(t) = timeout {
      builder = builder.timeout(t);
    }
    let client = match builder.build() {
      Ok(c) => c,
      Err(e) => {
        warn!(target: "mcqgen", error = %e, "Failed to build HTTP client; generation disabled");
        return None;
      }
    };

    Some(Self::new(client, api_key, base_url, quiz_model, review_model))
  }

  pub fn new(
    client: reqwest::Client,
    api_key: impl Into<String>,
    base_url: impl Into<String>,
    quiz_model: impl Into<String>,
    review_model: impl Into<String>,
  ) -> Self {
    Self {
      client,
      api_key: api_key.into(),
      base_url: base_url.into().trim_end_matches('/').to_string(),
      quiz_model: quiz_model.into(),
      review_model: review_model.into(),
    }
  }

  fn model_for(&self, stage: Stage) -> &str {
    match stage {
      Stage::Quiz => &self.quiz_model,
      Stage::Review => &self.review_model,
    }
  }

  /// Plain-text chat completion.
  #[instrument(level = "info", skip(self, prompt), fields(model = %model, user_len = prompt.user.len()))]
  async fn chat_plain(&self, model: &str, prompt: &Prompt, temperature: f32) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &prompt.system {
      messages.push(ChatMessageReq { role: "system", content: system });
    }
    messages.push(ChatMessageReq { role: "user", content: &prompt.user });
    let req = ChatCompletionRequest { model, messages, temperature };

    let res = self.client.post(&url)
      .header(USER_AGENT, concat!("mcqgen-backend/", env!("CARGO_PKG_VERSION")))
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(GenerationError::RateLimited(message));
      }
      return Err(GenerationError::Http { status: status.as_u16(), message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    completion_text(body)
  }
}

impl TextGenerator for OpenAI {
  async fn complete(&self, stage: Stage, prompt: &Prompt, temperature: f32) -> Result<String, GenerationError> {
    self.chat_plain(self.model_for(stage), prompt, temperature).await
  }
}

/// First choice's content, verbatim. Whitespace-only output counts as empty.
fn completion_text(body: ChatCompletionResponse) -> Result<String, GenerationError> {
  body.choices
    .into_iter()
    .next()
    .and_then(|c| c.message.content)
    .filter(|s| !s.trim().is_empty())
    .ok_or(GenerationError::EmptyCompletion)
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'static str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn error_body_message_is_extracted() {
    let body = r#"{"error": {"message": "Rate limit reached", "type": "requests"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("Rate limit reached"));
    assert_eq!(extract_openai_error("<html>bad gateway</html>"), None);
  }

  #[test]
  fn completion_text_takes_first_choice_verbatim() {
    let body: ChatCompletionResponse = serde_json::from_str(
      r#"{"choices": [{"message": {"content": "  ```json\n{}\n```  "}}, {"message": {"content": "second"}}]}"#,
    ).unwrap();
    assert_eq!(completion_text(body).unwrap(), "  ```json\n{}\n```  ");
  }

  #[test]
  fn empty_or_missing_content_is_an_error() {
    for raw in [r#"{"choices": []}"#, r#"{"choices": [{"message": {"content": null}}]}"#, r#"{"choices": [{"message": {"content": "  "}}]}"#] {
      let body: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
      assert!(matches!(completion_text(body), Err(GenerationError::EmptyCompletion)));
    }
  }

  #[test]
  fn request_omits_system_message_when_absent() {
    let prompt = Prompt { system: None, user: "hi".into() };
    let req = ChatCompletionRequest {
      model: "m",
      messages: vec![ChatMessageReq { role: "user", content: &prompt.user }],
      temperature: 0.5,
    };
    let v = serde_json::to_value(&req).unwrap();
    assert_eq!(v["messages"].as_array().unwrap().len(), 1);
    assert_eq!(v["messages"][0]["role"], "user");
  }

  #[test]
  fn base_url_trailing_slash_is_trimmed() {
    let oa = OpenAI::new(reqwest::Client::new(), "k", "https://api.groq.com/openai/v1/", "m", "m");
    assert_eq!(oa.base_url, "https://api.groq.com/openai/v1");
    assert_eq!(oa.model_for(Stage::Review), "m");
  }
}
