//! Tracing setup for the quiz backend.
//!
//! - LOG_LEVEL: an `EnvFilter` directive string. Unset means the pipeline defaults
//!   below: parser and chain decisions at debug, everything else at info.
//! - LOG_FORMAT: "json" for one JSON object per event, anything else for the
//!   human-readable formatter.

use tracing_subscriber::EnvFilter;

/// Parser fallbacks, prompt sizes and model latency are logged at debug in these
/// modules; request traffic (`quiz` target, `tower_http`) stays at info.
const DEFAULT_DIRECTIVES: &str =
    "info,mcqgen::parser=debug,mcqgen::chain=debug,mcqgen::openai=debug,quiz=info,tower_http=info";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

pub fn init_tracing() {
    let format = LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(true)
        .with_line_number(true);

    match format {
        LogFormat::Json => builder.json().with_current_span(true).init(),
        LogFormat::Pretty => builder.init(),
    }
}
