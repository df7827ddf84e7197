//! Public protocol structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{PipelineResult, QuestionRecord};

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
    pub generation_enabled: bool,
}

/// JSON variant of the quiz request for clients that already hold the text.
#[derive(Debug, Deserialize)]
pub struct QuizTextIn {
    pub text: String,
    pub number: u32,
    pub subject: String,
    pub tone: String,
}

#[derive(Debug, Serialize)]
pub struct QuizOut {
    pub id: Uuid,
    pub subject: String,
    pub questions: Vec<QuestionRecord>,
    pub review: String,
    pub raw_quiz: String,
}

impl From<PipelineResult> for QuizOut {
    fn from(r: PipelineResult) -> Self {
        Self {
            id: r.id,
            subject: r.request.subject().to_string(),
            questions: r.questions,
            review: r.review,
            raw_quiz: r.raw_quiz,
        }
    }
}

#[derive(Deserialize)]
pub struct ParseIn {
    pub raw: String,
}
#[derive(Serialize)]
pub struct ParseOut {
    pub questions: Vec<QuestionRecord>,
}

#[derive(Deserialize)]
pub struct CheckIn {
    pub question: QuestionRecord,
    pub choice: String,
}
#[derive(Serialize)]
pub struct CheckOut {
    pub correct: bool,
    /// Resolved correct letter, if the answer token could be resolved.
    pub expected: Option<char>,
}
