//! MCQ Generator · Quiz Backend
//!
//! - Axum HTTP API: document upload → generated quiz + review
//! - OpenAI-compatible generation service (via environment variables)
//! - Static front-end fallback (./static/index.html)
//!
//! Important env variables (a `.env` file is read if present):
//!   PORT                 : u16 (default 3000)
//!   OPENAI_API_KEY       : enables quiz generation if present
//!   OPENAI_BASE_URL      : default "https://api.openai.com/v1"
//!   OPENAI_MODEL         : default "gpt-4o-mini"
//!   OPENAI_REVIEW_MODEL  : default OPENAI_MODEL
//!   OPENAI_TIMEOUT_SECS  : optional client-side request timeout
//!   QUIZ_CONFIG_PATH     : path to TOML config (prompts, limits, schema template)
//!   LOG_LEVEL            : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT           : "pretty" (default) or "json"

use std::{net::SocketAddr, sync::Arc};

use tokio::net::TcpListener;
use tracing::info;

use mcqgen::routes::build_router;
use mcqgen::state::AppState;
use mcqgen::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Missing .env is normal in production.
  let dotenv_path = dotenv::dotenv().ok();
  telemetry::init_tracing();
  if let Some(path) = dotenv_path {
    info!(target: "mcqgen", path = %path.display(), "Loaded environment from .env");
  }

  let state = Arc::new(AppState::new());
  let app = build_router(state);

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "mcqgen", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(target: "mcqgen", error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
  info!(target: "mcqgen", "Shutdown signal received");
}
