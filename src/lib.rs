//! MCQ generator backend.
//!
//! Turns a document (PDF or plain text) into a multiple-choice quiz using an
//! OpenAI-compatible model, then asks the same service for a review of that quiz.
//!
//! Pipeline: `loader` (document → text) → `chain` (quiz synthesis → `parser` → review).
//! The `routes` module exposes it over HTTP; rendering is left to the front-end.

pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod literal;
pub mod loader;
pub mod openai;
pub mod parser;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod util;

pub use chain::{generate, Prompt, TextGenerator};
pub use domain::{DocumentKind, GenerationRequest, PipelineResult, QuestionRecord, SchemaTemplate};
pub use error::{GenerationError, QuizError, Stage};
pub use parser::parse_quiz;
