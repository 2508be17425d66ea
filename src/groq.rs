//! Minimal Groq client (OpenAI-compatible chat completions).
//!
//! We only call chat.completions in JSON mode: a system instruction plus a
//! JSON-serialized user-context object. Calls are instrumented and log model
//! names, latencies, and token usage (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::Prompts;
use crate::domain::{Challenge, Difficulty};
use crate::util::trunc_for_log;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
  #[error("Groq HTTP {status}: {message}")]
  Api { status: u16, message: String },
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("JSON parse error: {0}")]
  Parse(String),
}

impl AiError {
  /// Rate limiting gets special treatment: callers skip the secondary
  /// model and go straight to the static fallback.
  pub fn is_rate_limit(&self) -> bool {
    match self {
      AiError::Api { status, message } => *status == 429 || message.contains("rate_limit"),
      _ => false,
    }
  }
}

#[derive(Clone)]
pub struct Groq {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub primary_model: String,
  pub fallback_model: String,
}

/// Context forwarded to the model for challenge generation. The prior
/// challenges bias it away from repeating earlier material.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
  pub goal: String,
  pub level: Difficulty,
  pub language: String,
  pub target_difficulty: Difficulty,
  pub challenge_number: u32,
  pub previous_challenges: Vec<PriorChallenge>,
  pub instructions: String,
}

#[derive(Debug, Serialize)]
pub struct PriorChallenge {
  pub title: String,
  pub concepts: Vec<String>,
}

// --- Raw response shapes (everything optional; normalized by callers) ---

#[derive(Debug, Default, Deserialize)]
pub struct RawGenWrapper {
  #[serde(default)] pub challenge: Option<RawChallenge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChallenge {
  #[serde(default)] pub id: Option<String>,
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub language: Option<String>,
  #[serde(default)] pub difficulty: Option<String>,
  #[serde(default)] pub acceptance_criteria: Option<Vec<String>>,
  #[serde(default)] pub hints: Option<Vec<String>>,
  #[serde(default)] pub example_input: Option<String>,
  #[serde(default)] pub example_output: Option<String>,
  #[serde(default)] pub concepts: Option<Vec<String>>,
  #[serde(default)] pub estimated_time_minutes: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawEvaluation {
  #[serde(default)] pub success: Option<bool>,
  #[serde(default)] pub score: Option<f64>,
  #[serde(default)] pub feedback: Option<String>,
  #[serde(default)] pub suggestions: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlan {
  #[serde(default)] pub goal: Option<String>,
  #[serde(default)] pub level: Option<String>,
  #[serde(default)] pub rationale: Option<String>,
  #[serde(default)] pub modules: Option<Vec<RawModule>>,
  #[serde(default)] pub total_estimated_hours: Option<f64>,
  #[serde(default)] pub starting_challenge: Option<RawStartingChallenge>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawModule {
  #[serde(default)] pub id: Option<String>,
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub resource: Option<RawResource>,
  #[serde(default)] pub outcomes: Option<Vec<String>>,
  #[serde(default)] pub estimated_time_hours: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RawResource {
  #[serde(default, rename = "type")] pub kind: Option<String>,
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStartingChallenge {
  #[serde(default)] pub title: Option<String>,
  #[serde(default)] pub description: Option<String>,
  #[serde(default)] pub language: Option<String>,
  #[serde(default)] pub acceptance_criteria: Option<Vec<String>>,
}

impl Groq {
  /// Construct the client if we find GROQ_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GROQ_API_KEY").ok()?;
    let base_url =
      std::env::var("GROQ_BASE_URL").unwrap_or_else(|_| "https://api.groq.com/openai/v1".into());
    let primary_model =
      std::env::var("GROQ_PRIMARY_MODEL").unwrap_or_else(|_| "llama-3.3-70b-versatile".into());
    let fallback_model =
      std::env::var("GROQ_FALLBACK_MODEL").unwrap_or_else(|_| "llama-3.1-8b-instant".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, primary_model, fallback_model })
  }

  /// JSON-object chat completion. The user context is serialized as the
  /// user message; the target type is parsed leniently from the reply.
  #[instrument(level = "info", skip(self, system, user), fields(model = %model))]
  async fn ask_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    system: &str,
    user: &impl Serialize,
    temperature: f32,
  ) -> Result<T, AiError> {
    let url = format!("{}/chat/completions", self.base_url);
    let user_content = serde_json::to_string(user).map_err(|e| AiError::Parse(e.to_string()))?;
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user_content },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "skillpilot-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_groq_error(&body).unwrap_or(body);
      return Err(AiError::Api { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Groq usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();

    parse_json_lenient(&text)
  }

  // --- High-level helpers (domain-specialized) ---

  /// Generate one challenge. Tries the primary model; any failure other
  /// than rate limiting retries once on the cheaper secondary model.
  /// Returns the raw challenge plus the model that produced it.
  #[instrument(
    level = "info",
    skip(self, prompts, request),
    fields(number = request.challenge_number, target = %request.target_difficulty, model = %self.primary_model)
  )]
  pub async fn generate_challenge(
    &self,
    prompts: &Prompts,
    request: &GenerationRequest,
  ) -> Result<(RawChallenge, String), AiError> {
    let start = std::time::Instant::now();
    match self.generate_with_model(&self.primary_model, prompts, request).await {
      Ok(raw) => {
        info!(elapsed = ?start.elapsed(), "Model response received successfully");
        Ok((raw, self.primary_model.clone()))
      }
      Err(e) if e.is_rate_limit() => {
        error!(elapsed = ?start.elapsed(), error = %e, "Primary model rate limited; not retrying");
        Err(e)
      }
      Err(e) => {
        warn!(error = %e, retry_model = %self.fallback_model, "Primary model failed; retrying on secondary");
        let raw = self.generate_with_model(&self.fallback_model, prompts, request).await?;
        info!(elapsed = ?start.elapsed(), "Secondary model response received");
        Ok((raw, self.fallback_model.clone()))
      }
    }
  }

  async fn generate_with_model(
    &self,
    model: &str,
    prompts: &Prompts,
    request: &GenerationRequest,
  ) -> Result<RawChallenge, AiError> {
    let wrapper: RawGenWrapper =
      self.ask_json(model, &prompts.challenge_system, request, 0.3).await?;
    wrapper
      .challenge
      .ok_or_else(|| AiError::Parse("response lacks a 'challenge' field".into()))
  }

  /// Evaluate submitted code against a challenge. Only the fields the
  /// rubric needs are forwarded. Runs on the cheap model.
  #[instrument(level = "info", skip(self, prompts, challenge, code),
               fields(challenge_id = %challenge.id, code_len = code.len(), model = %self.fallback_model))]
  pub async fn evaluate_code(
    &self,
    prompts: &Prompts,
    challenge: &Challenge,
    code: &str,
  ) -> Result<RawEvaluation, AiError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct EvalChallenge<'a> {
      title: &'a str,
      description: &'a str,
      language: &'a str,
      acceptance_criteria: &'a [String],
    }
    #[derive(Serialize)]
    struct EvalRequest<'a> {
      challenge: EvalChallenge<'a>,
      code: &'a str,
    }

    let user = EvalRequest {
      challenge: EvalChallenge {
        title: &challenge.title,
        description: &challenge.description,
        language: &challenge.language,
        acceptance_criteria: &challenge.acceptance_criteria,
      },
      code,
    };
    self.ask_json(&self.fallback_model, &prompts.evaluation_system, &user, 0.3).await
  }

  /// Generate a learning-plan outline from a goal and free-text experience.
  #[instrument(level = "info", skip(self, prompts, goal, experience),
               fields(goal_len = goal.len(), model = %self.primary_model))]
  pub async fn generate_plan(
    &self,
    prompts: &Prompts,
    goal: &str,
    experience: &str,
  ) -> Result<RawPlan, AiError> {
    #[derive(Serialize)]
    struct PlanRequest<'a> {
      goal: &'a str,
      experience: &'a str,
    }
    self.ask_json(&self.primary_model, &prompts.plan_system, &PlanRequest { goal, experience }, 0.3).await
  }
}

/// Parse a model reply that should be a JSON object, salvaging the
/// outermost `{...}` block if the model wrapped it in prose.
fn parse_json_lenient<T: for<'a> Deserialize<'a>>(content: &str) -> Result<T, AiError> {
  match serde_json::from_str::<T>(content) {
    Ok(v) => Ok(v),
    Err(first) => {
      if let (Some(start), Some(end)) = (content.find('{'), content.rfind('}')) {
        if start < end {
          if let Ok(v) = serde_json::from_str::<T>(&content[start..=end]) {
            return Ok(v);
          }
        }
      }
      warn!(target: "skillpilot_backend", preview = %trunc_for_log(content, 120), "Unparseable model reply");
      Err(AiError::Parse(first.to_string()))
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

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

/// Try to extract a clean error message from a Groq error body.
fn extract_groq_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lenient_parse_accepts_clean_json() {
    let raw: RawEvaluation = parse_json_lenient(r#"{"success": true, "score": 85}"#).unwrap();
    assert_eq!(raw.success, Some(true));
    assert_eq!(raw.score, Some(85.0));
  }

  #[test]
  fn lenient_parse_salvages_prose_wrapped_json() {
    let reply = r#"Sure! Here is the evaluation:
{"success": false, "score": 40, "feedback": "needs work"}
Hope that helps."#;
    let raw: RawEvaluation = parse_json_lenient(reply).unwrap();
    assert_eq!(raw.success, Some(false));
    assert_eq!(raw.feedback.as_deref(), Some("needs work"));
  }

  #[test]
  fn lenient_parse_reports_hopeless_input() {
    assert!(parse_json_lenient::<RawEvaluation>("no json here").is_err());
  }

  #[test]
  fn rate_limit_detection() {
    let e = AiError::Api { status: 429, message: "too many requests".into() };
    assert!(e.is_rate_limit());
    let e = AiError::Api { status: 500, message: "rate_limit_exceeded".into() };
    assert!(e.is_rate_limit());
    let e = AiError::Api { status: 500, message: "boom".into() };
    assert!(!e.is_rate_limit());
  }
}
