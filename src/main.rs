//! SkillPilot · AI Learning Backend
//!
//! - Axum HTTP API for plans, infinite challenges, and code evaluation
//! - Optional Groq integration (via environment variables)
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   GROQ_API_KEY      : enables Groq integration if present
//!   GROQ_BASE_URL     : default "https://api.groq.com/openai/v1"
//!   GROQ_PRIMARY_MODEL  : default "llama-3.3-70b-versatile"
//!   GROQ_FALLBACK_MODEL : default "llama-3.1-8b-instant"
//!   AGENT_CONFIG_PATH : path to TOML config (prompts + optional fallback bank)
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod progression;
mod cache;
mod fallback;
mod state;
mod protocol;
mod challenge;
mod plan;
mod groq;
mod store;
mod stats;
mod url_validator;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Build shared application state (stores, cache, Groq client, prompts).
  let state = Arc::new(AppState::from_env());

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  // Read port from env or default to 3000.
  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "skillpilot_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}

async fn shutdown_signal() {
  if tokio::signal::ctrl_c().await.is_ok() {
    info!(target: "skillpilot_backend", "Shutdown signal received");
  }
}
