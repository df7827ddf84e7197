//! Application state: prompts, generation limits, the schema template and the
//! optional OpenAI client.
//!
//! Everything here is read-only after startup. Each pipeline invocation owns its own
//! request/result, so no locking is needed.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::chain;
use crate::config::{load_quiz_config_from_env, GenerationSettings, Prompts, QuizConfig};
use crate::domain::{GenerationRequest, PipelineResult, SchemaTemplate};
use crate::error::{GenerationError, QuizError, Stage};
use crate::openai::OpenAI;

#[derive(Clone, Debug)]
pub struct AppState {
    pub prompts: Prompts,
    pub settings: GenerationSettings,
    pub schema: Arc<SchemaTemplate>,
    pub openai: Option<OpenAI>,
}

impl AppState {
    /// Build state from env: load TOML config and schema template, init OpenAI.
    #[instrument(level = "info", skip_all)]
    pub fn new() -> Self {
        let (cfg, base_dir) = load_quiz_config_from_env().unwrap_or_default();
        let schema = cfg.load_schema_template(base_dir.as_deref());

        let openai = OpenAI::from_env();
        if let Some(oa) = &openai {
            info!(target: "mcqgen", base_url = %oa.base_url, quiz_model = %oa.quiz_model, review_model = %oa.review_model, "OpenAI enabled.");
        } else {
            info!(target: "mcqgen", "OpenAI disabled (no OPENAI_API_KEY). Quiz generation will be refused; parsing endpoints still work.");
        }

        Self::from_parts(cfg, schema, openai)
    }

    pub fn from_parts(cfg: QuizConfig, schema: SchemaTemplate, openai: Option<OpenAI>) -> Self {
        info!(
            target: "mcqgen",
            max_questions = cfg.generation.max_questions,
            max_upload_bytes = cfg.generation.max_upload_bytes,
            temperature = cfg.generation.temperature,
            "Generation settings"
        );
        Self {
            prompts: cfg.prompts,
            settings: cfg.generation,
            schema: Arc::new(schema),
            openai,
        }
    }

    /// Validate inputs into an immutable `GenerationRequest` using the configured limits.
    pub fn build_request(
        &self,
        source_text: String,
        number: u32,
        subject: &str,
        tone: &str,
    ) -> Result<GenerationRequest, QuizError> {
        GenerationRequest::new(
            source_text,
            number,
            subject,
            tone,
            self.schema.clone(),
            self.settings.max_questions,
        )
    }

    /// Run the full pipeline against the configured generation service.
    pub async fn generate(&self, request: GenerationRequest) -> Result<PipelineResult, QuizError> {
        let oa = self
            .openai
            .as_ref()
            .ok_or_else(|| QuizError::generation(Stage::Quiz, GenerationError::NotConfigured))?;
        chain::generate(oa, &self.prompts, &self.settings, request).await
    }
}
