//! Generation chain: quiz synthesis, parsing, then review of the synthesized quiz.
//!
//! Each stage takes the accumulated `PipelineResult` and returns it with one more
//! field filled. Stages run strictly in sequence (the review prompt embeds the raw quiz
//! text) and any failure aborts the whole invocation.

use std::future::Future;
use std::time::Instant;

use tracing::{error, info, instrument};

use crate::config::{GenerationSettings, Prompts};
use crate::domain::{GenerationRequest, PipelineResult};
use crate::error::{GenerationError, QuizError, Stage};
use crate::parser::parse_quiz_with_preview;
use crate::util::{fill_template_strict, trunc_for_log};

/// A fully substituted prompt: optional system message plus the user message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prompt {
  pub system: Option<String>,
  pub user: String,
}

/// Text-in/text-out boundary to the generation service.
pub trait TextGenerator {
  fn complete(
    &self,
    stage: Stage,
    prompt: &Prompt,
    temperature: f32,
  ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}

/// Build the quiz-synthesis prompt.
pub fn quiz_prompt(prompts: &Prompts, req: &GenerationRequest) -> Result<Prompt, GenerationError> {
  let number = req.question_count().to_string();
  let schema = req.schema().to_prompt_string();
  let vars: [(&str, &str); 5] = [
    ("number", &number),
    ("subject", req.subject()),
    ("tone", req.tone()),
    ("response_json", &schema),
    ("text", req.source_text()),
  ];
  let system = fill_template_strict(&prompts.quiz_system_template, &vars)
    .map_err(GenerationError::MissingVariable)?;
  let user = fill_template_strict(&prompts.quiz_user_template, &vars)
    .map_err(GenerationError::MissingVariable)?;
  Ok(Prompt { system: Some(system).filter(|s| !s.trim().is_empty()), user })
}

/// Build the review prompt from the subject and the raw (unparsed) quiz text.
pub fn review_prompt(prompts: &Prompts, subject: &str, raw_quiz: &str) -> Result<Prompt, GenerationError> {
  let user = fill_template_strict(&prompts.review_template, &[("subject", subject), ("quiz", raw_quiz)])
    .map_err(GenerationError::MissingVariable)?;
  Ok(Prompt { system: None, user })
}

/// Stage 1: ask for the quiz and keep the response verbatim.
#[instrument(level = "info", skip_all, fields(quiz_id = %state.id, number = state.request.question_count()))]
pub async fn synthesize_quiz<G: TextGenerator>(
  gen: &G,
  prompts: &Prompts,
  settings: &GenerationSettings,
  mut state: PipelineResult,
) -> Result<PipelineResult, QuizError> {
  let prompt = quiz_prompt(prompts, &state.request).map_err(|e| QuizError::generation(Stage::Quiz, e))?;
  let start = Instant::now();
  match gen.complete(Stage::Quiz, &prompt, settings.temperature).await {
    Ok(raw) => {
      info!(elapsed = ?start.elapsed(), raw_len = raw.len(), "Quiz text received");
      state.raw_quiz = raw;
      Ok(state)
    }
    Err(e) => {
      error!(elapsed = ?start.elapsed(), error = %e, "Quiz synthesis failed");
      Err(QuizError::generation(Stage::Quiz, e))
    }
  }
}

/// Normalize the raw quiz text into question records.
#[instrument(level = "info", skip_all, fields(quiz_id = %state.id))]
pub fn parse_stage(settings: &GenerationSettings, mut state: PipelineResult) -> Result<PipelineResult, QuizError> {
  match parse_quiz_with_preview(&state.raw_quiz, settings.preview_chars) {
    Ok(questions) => {
      if questions.len() != state.request.question_count() as usize {
        info!(requested = state.request.question_count(), parsed = questions.len(), "Model returned a different number of questions");
      }
      state.questions = questions;
      Ok(state)
    }
    Err(e) => {
      error!(error = %e, raw_preview = %trunc_for_log(&state.raw_quiz, 120), "Quiz text could not be parsed");
      Err(e)
    }
  }
}

/// Stage 2: ask for a free-text review of the raw quiz.
#[instrument(level = "info", skip_all, fields(quiz_id = %state.id))]
pub async fn review_quiz<G: TextGenerator>(
  gen: &G,
  prompts: &Prompts,
  settings: &GenerationSettings,
  mut state: PipelineResult,
) -> Result<PipelineResult, QuizError> {
  let prompt = review_prompt(prompts, state.request.subject(), &state.raw_quiz)
    .map_err(|e| QuizError::generation(Stage::Review, e))?;
  let start = Instant::now();
  match gen.complete(Stage::Review, &prompt, settings.temperature).await {
    Ok(review) => {
      info!(elapsed = ?start.elapsed(), review_len = review.len(), "Review received");
      state.review = review;
      Ok(state)
    }
    Err(e) => {
      error!(elapsed = ?start.elapsed(), error = %e, "Quiz review failed");
      Err(QuizError::generation(Stage::Review, e))
    }
  }
}

/// Run the whole chain: synthesize → parse → review.
#[instrument(level = "info", skip_all, fields(subject = %request.subject(), number = request.question_count(), text_len = request.source_text().len()))]
pub async fn generate<G: TextGenerator>(
  gen: &G,
  prompts: &Prompts,
  settings: &GenerationSettings,
  request: GenerationRequest,
) -> Result<PipelineResult, QuizError> {
  let state = PipelineResult::start(request);
  let state = synthesize_quiz(gen, prompts, settings, state).await?;
  let state = parse_stage(settings, state)?;
  let state = review_quiz(gen, prompts, settings, state).await?;
  info!(quiz_id = %state.id, questions = state.questions.len(), "Quiz pipeline complete");
  Ok(state)
}
