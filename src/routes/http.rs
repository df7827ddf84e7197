//! HTTP endpoint handlers. These are thin wrappers that forward to the pipeline.
//! Each handler is instrumented and logs parameters and basic result info.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    response::IntoResponse,
    Json,
};
use tracing::{info, instrument};

use crate::error::QuizError;
use crate::loader::load_named;
use crate::parser::parse_quiz_with_preview;
use crate::protocol::*;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthOut { ok: true, generation_enabled: state.openai.is_some() })
}

/// Fields collected from the multipart upload form.
#[derive(Default)]
struct QuizForm {
    file_name: Option<String>,
    file: Option<Vec<u8>>,
    number: Option<u32>,
    subject: Option<String>,
    tone: Option<String>,
}

fn malformed(e: impl std::fmt::Display) -> QuizError {
    QuizError::InvalidRequest(format!("malformed upload form: {}", e))
}

async fn field_text(field: Field<'_>) -> Result<String, QuizError> {
    field.text().await.map_err(malformed)
}

async fn read_quiz_form(multipart: &mut Multipart) -> Result<QuizForm, QuizError> {
    let mut form = QuizForm::default();
    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.file = Some(field.bytes().await.map_err(malformed)?.to_vec());
            }
            "number" => {
                let raw = field_text(field).await?;
                let n = raw.trim().parse::<u32>().map_err(|_| {
                    QuizError::InvalidRequest(format!("`number` must be a positive integer, got {:?}", raw))
                })?;
                form.number = Some(n);
            }
            "subject" => form.subject = Some(field_text(field).await?),
            "tone" => form.tone = Some(field_text(field).await?),
            _ => {}
        }
    }
    Ok(form)
}

fn required<T>(value: Option<T>, name: &str) -> Result<T, QuizError> {
    value.ok_or_else(|| QuizError::InvalidRequest(format!("missing `{}` field", name)))
}

/// Multipart upload: `file` (.pdf or .txt), `number`, `subject`, `tone`.
#[instrument(level = "info", skip(state, multipart))]
pub async fn http_post_quiz(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<QuizOut>, QuizError> {
    let mut multipart = multipart?;
    let form = read_quiz_form(&mut multipart).await?;
    let bytes = required(form.file, "file")?;
    let file_name = required(form.file_name, "file name")?;
    let number = required(form.number, "number")?;
    let subject = required(form.subject, "subject")?;
    let tone = required(form.tone, "tone")?;
    info!(target: "quiz", %file_name, bytes = bytes.len(), number, %subject, %tone, "Quiz upload received");

    // PDF extraction is CPU-bound; keep it off the async workers.
    let name = file_name.clone();
    let text = tokio::task::spawn_blocking(move || load_named(&name, &bytes))
        .await
        .map_err(|e| QuizError::UnsupportedFormat {
            extension: extension_of(&file_name),
            detail: Some(format!("document loader aborted: {}", e)),
        })??;

    let request = state.build_request(text, number, &subject, &tone)?;
    let result = state.generate(request).await?;
    info!(target: "quiz", id = %result.id, questions = result.questions.len(), "Quiz served");
    Ok(Json(QuizOut::from(result)))
}

fn extension_of(file_name: &str) -> String {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_string()
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_quiz_text(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuizTextIn>, JsonRejection>,
) -> Result<Json<QuizOut>, QuizError> {
    let Json(body) = payload?;
    info!(target: "quiz", text_len = body.text.len(), number = body.number, subject = %body.subject, "Quiz text received");
    let request = state.build_request(body.text, body.number, &body.subject, &body.tone)?;
    let result = state.generate(request).await?;
    info!(target: "quiz", id = %result.id, questions = result.questions.len(), "Quiz served");
    Ok(Json(QuizOut::from(result)))
}

#[instrument(level = "info", skip(state, payload))]
pub async fn http_post_parse(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ParseIn>, JsonRejection>,
) -> Result<Json<ParseOut>, QuizError> {
    let Json(body) = payload?;
    let questions = parse_quiz_with_preview(&body.raw, state.settings.preview_chars)?;
    info!(target: "quiz", raw_len = body.raw.len(), questions = questions.len(), "Raw quiz parsed");
    Ok(Json(ParseOut { questions }))
}

#[instrument(level = "info", skip(payload))]
pub async fn http_post_check(payload: Result<Json<CheckIn>, JsonRejection>) -> Result<Json<CheckOut>, QuizError> {
    let Json(body) = payload?;
    let correct = body.question.is_correct(&body.choice);
    info!(target: "quiz", choice = %body.choice, correct, "Answer checked");
    Ok(Json(CheckOut { correct, expected: body.question.answer_letter() }))
}
